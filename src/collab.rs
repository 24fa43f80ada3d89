// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External collaborator traits (§6). Implementations are not specified
//! here — the wire codec, process supervisor, track gateway, persistence
//! store, penalty service, and broadcast fan-out are injected.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::event::BroadcastMessage;
use crate::model::{CarId, DriverGuid, RaceControlSnapshot};

/// Information returned by `GetSessionInfo`, or a termination signal.
#[derive(Debug, Clone)]
pub enum SessionInfoPoll {
    Info(crate::event::SessionInfoPayload),
    /// The process has no open connection; terminate the poller.
    NoOpenConnection,
    /// The process has finished; disconnect everyone and terminate.
    Done,
}

/// The simulation process supervisor collaborator. Owns the child process
/// and exposes send/done capabilities; the UDP wire format is out of scope.
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    async fn get_session_info(&self) -> Result<SessionInfoPoll, CoreError>;
    async fn send_chat(&self, slot: CarId, text: &str) -> Result<(), CoreError>;
    async fn kick(&self, slot: CarId) -> Result<(), CoreError>;
    async fn server_config(&self) -> crate::config::ServerConfig;
}

/// Track/metadata lookup service.
#[async_trait]
pub trait TrackGateway: Send + Sync {
    async fn track_info(&self, track: &str, layout: &str) -> anyhow::Result<serde_json::Value>;
    async fn track_map(&self, track: &str, layout: &str) -> anyhow::Result<serde_json::Value>;
}

/// Best-effort latest-snapshot persistence store.
#[async_trait]
pub trait LiveTimingStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<RaceControlSnapshot>>;
    async fn upsert(&self, snapshot: &RaceControlSnapshot) -> anyhow::Result<()>;
}

/// Penalty application service.
#[async_trait]
pub trait PenaltyService: Send + Sync {
    async fn apply_penalty(
        &self,
        result_filename: &str,
        identity: &DriverGuid,
        car_model: &str,
        seconds: f64,
        is_driver_swap: bool,
    ) -> anyhow::Result<()>;
}

/// Broadcast fan-out channel collaborator.
#[async_trait]
pub trait Broadcast: Send + Sync {
    async fn send(&self, message: BroadcastMessage);
}
