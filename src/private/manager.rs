// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Manager operations: control a running forge through the internal API

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::PrivateClient;
use crate::context::CallContext;
use crate::error::Result;

/// Extra time granted on top of a blocking flush timeout
const FLUSH_GRACE: Duration = Duration::from_secs(10);

/// Body of the flush-queues call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushOptions {
    /// How long the server may spend flushing, in nanoseconds
    #[serde(rename = "Timeout")]
    pub timeout_nanos: i64,
    /// Return immediately instead of waiting for the flush
    #[serde(rename = "NonBlocking")]
    pub non_blocking: bool,
}

impl FlushOptions {
    pub fn new(timeout: Duration, non_blocking: bool) -> Self {
        Self {
            timeout_nanos: i64::try_from(timeout.as_nanos()).unwrap_or(i64::MAX),
            non_blocking,
        }
    }
}

impl PrivateClient {
    /// Ask the server to shut down gracefully
    pub async fn shutdown(&self, ctx: &CallContext) -> Result<String> {
        self.manager_post(ctx, "shutdown", "Shutting down").await
    }

    /// Ask the server to restart gracefully
    pub async fn restart(&self, ctx: &CallContext) -> Result<String> {
        self.manager_post(ctx, "restart", "Restarting").await
    }

    /// Flush all queues. When blocking with a positive timeout the call waits
    /// up to `timeout` plus a grace period for the server to answer.
    pub async fn flush_queues(
        &self,
        ctx: &CallContext,
        timeout: Duration,
        non_blocking: bool,
    ) -> Result<String> {
        let url = self.internal_url("manager/flush-queues");
        let mut req = self
            .new_internal_request(ctx, &url, "POST")?
            .json(&FlushOptions::new(timeout, non_blocking))?;
        if !timeout.is_zero() && !non_blocking {
            req = req.timeout(timeout.saturating_add(FLUSH_GRACE));
        }

        self.call(req).await.map_err(|e| {
            warn!(error = %e, "flush-queues failed");
            e
        })?;
        info!(non_blocking, "queues flushed");
        Ok("Flushed".to_string())
    }

    /// Pause logging on the server
    pub async fn pause_logging(&self, ctx: &CallContext) -> Result<String> {
        self.manager_post(ctx, "pause-logging", "Logging Paused").await
    }

    /// Resume logging on the server
    pub async fn resume_logging(&self, ctx: &CallContext) -> Result<String> {
        self.manager_post(ctx, "resume-logging", "Logging Restarted").await
    }

    /// Have the server release and reopen its log files
    pub async fn release_reopen_logging(&self, ctx: &CallContext) -> Result<String> {
        self.manager_post(ctx, "release-and-reopen-logging", "Logging Restarted")
            .await
    }

    async fn manager_post(&self, ctx: &CallContext, op: &str, success: &str) -> Result<String> {
        let url = self.internal_url(&format!("manager/{}", op));
        let req = self.new_internal_request(ctx, &url, "POST")?;

        match self.call(req).await {
            Ok(_) => {
                info!(op, "manager call succeeded");
                Ok(success.to_string())
            }
            Err(e) => {
                warn!(op, error = %e, "manager call failed");
                Err(e)
            }
        }
    }
}
