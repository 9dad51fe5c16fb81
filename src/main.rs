// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! forge-internal CLI - control a running forge through its internal API
//!
//! Configuration comes from `FORGE_*` environment variables, see
//! [`forge_internal::config::vars`].

use std::env;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use forge_internal::{CallContext, InternalConfig, PrivateClient};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("forge_internal=info".parse().expect("static directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "--help" | "-h" | "help" => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        "--version" | "-v" | "version" => {
            println!("forge-internal {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    match run(&args[1..]).await {
        Ok(message) => {
            println!("{}", message);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(args: &[String]) -> anyhow::Result<String> {
    let config = InternalConfig::from_env().context("loading configuration")?;
    let client = PrivateClient::new(config);

    let ctx = CallContext::background();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let result = match args[0].as_str() {
        "shutdown" => client.shutdown(&ctx).await,
        "restart" => client.restart(&ctx).await,
        "flush-queues" => {
            let (timeout, non_blocking) = parse_flush_args(&args[1..])?;
            client.flush_queues(&ctx, timeout, non_blocking).await
        }
        "logging" => match args.get(1).map(String::as_str) {
            Some("pause") => client.pause_logging(&ctx).await,
            Some("resume") => client.resume_logging(&ctx).await,
            Some("release-and-reopen") => client.release_reopen_logging(&ctx).await,
            _ => bail!("Usage: forge-internal logging <pause|resume|release-and-reopen>"),
        },
        cmd => {
            print_usage();
            bail!("Unknown command: {}", cmd);
        }
    };

    result.context("Unable to contact the forge internal API")
}

fn parse_flush_args(args: &[String]) -> anyhow::Result<(Duration, bool)> {
    let mut timeout = Duration::from_secs(60);
    let mut non_blocking = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--non-blocking" => non_blocking = true,
            "--timeout" => {
                let secs = iter
                    .next()
                    .context("--timeout needs a value in seconds")?
                    .parse::<u64>()
                    .context("--timeout must be a whole number of seconds")?;
                timeout = Duration::from_secs(secs);
            }
            other => bail!("Unknown flush-queues option: {}", other),
        }
    }

    Ok((timeout, non_blocking))
}

fn print_usage() {
    println!(
        r#"forge-internal - Control a running forge through its internal API

USAGE:
    forge-internal <COMMAND> [OPTIONS]

COMMANDS:
    shutdown                          Gracefully shut down the server
    restart                           Gracefully restart the server
    flush-queues [--timeout <secs>]   Flush all queues (default timeout 60s)
                 [--non-blocking]
    logging <pause|resume|release-and-reopen>
                                      Control server logging
    help                              Show this help message
    version                           Show version information

ENVIRONMENT:
    FORGE_INTERNAL_TOKEN      Internal API bearer token
    FORGE_INTERNAL_TOKEN_URI  Load the token from file:/path instead
    FORGE_DOMAIN              Domain presented as TLS server name
    FORGE_PROTOCOL            http, https or unix
    FORGE_HTTP_ADDR           Bind address, or socket path for unix
    FORGE_HTTP_PORT           Bind port
    FORGE_LOCAL_ROOT_URL      Override the base URL for internal calls
"#
    );
}
