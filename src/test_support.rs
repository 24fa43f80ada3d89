// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory fakes for the external collaborators (§6), shared by unit and
//! integration tests.

use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::collab::{Broadcast, LiveTimingStore, PenaltyService, ProcessHandle, SessionInfoPoll, TrackGateway};
use crate::config::ServerConfig;
use crate::error::CoreError;
use crate::event::BroadcastMessage;
use crate::model::{CarId, DriverGuid, RaceControlSnapshot};

/// A process collaborator that records every outbound call and yields a
/// scripted sequence of `GetSessionInfo` responses.
#[derive(Default)]
pub struct FakeProcess {
    pub config: ServerConfig,
    pub sent_chats: Mutex<Vec<(CarId, String)>>,
    pub kicks: Mutex<Vec<CarId>>,
    pub session_info_responses: Mutex<Vec<SessionInfoPoll>>,
}

impl FakeProcess {
    pub fn new(config: ServerConfig) -> Self {
        Self { config, ..Default::default() }
    }
}

#[async_trait]
impl ProcessHandle for FakeProcess {
    async fn get_session_info(&self) -> Result<SessionInfoPoll, CoreError> {
        let mut responses = self.session_info_responses.lock().await;
        Ok(responses.pop().unwrap_or(SessionInfoPoll::NoOpenConnection))
    }

    async fn send_chat(&self, slot: CarId, text: &str) -> Result<(), CoreError> {
        self.sent_chats.lock().await.push((slot, text.to_owned()));
        Ok(())
    }

    async fn kick(&self, slot: CarId) -> Result<(), CoreError> {
        self.kicks.lock().await.push(slot);
        Ok(())
    }

    async fn server_config(&self) -> ServerConfig {
        self.config.clone()
    }
}

/// A track gateway that always succeeds with empty payloads.
#[derive(Default)]
pub struct FakeTrackGateway {
    pub fail_track_info: bool,
    pub fail_track_map: bool,
}

#[async_trait]
impl TrackGateway for FakeTrackGateway {
    async fn track_info(&self, _track: &str, _layout: &str) -> anyhow::Result<serde_json::Value> {
        if self.fail_track_info {
            anyhow::bail!("track-info unavailable");
        }
        Ok(serde_json::json!({}))
    }

    async fn track_map(&self, _track: &str, _layout: &str) -> anyhow::Result<serde_json::Value> {
        if self.fail_track_map {
            anyhow::bail!("track-map unavailable");
        }
        Ok(serde_json::json!({}))
    }
}

/// An in-memory store holding the latest upserted snapshot.
#[derive(Default)]
pub struct FakeStore {
    pub snapshot: StdMutex<Option<RaceControlSnapshot>>,
}

#[async_trait]
impl LiveTimingStore for FakeStore {
    async fn load(&self) -> anyhow::Result<Option<RaceControlSnapshot>> {
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn upsert(&self, snapshot: &RaceControlSnapshot) -> anyhow::Result<()> {
        *self.snapshot.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }
}

/// A penalty service that records every application.
#[derive(Default)]
pub struct FakePenaltyService {
    pub applied: Mutex<Vec<(String, DriverGuid, String, f64, bool)>>,
}

#[async_trait]
impl PenaltyService for FakePenaltyService {
    async fn apply_penalty(
        &self,
        result_filename: &str,
        identity: &DriverGuid,
        car_model: &str,
        seconds: f64,
        is_driver_swap: bool,
    ) -> anyhow::Result<()> {
        self.applied.lock().await.push((
            result_filename.to_owned(),
            identity.clone(),
            car_model.to_owned(),
            seconds,
            is_driver_swap,
        ));
        Ok(())
    }
}

/// A broadcast collaborator that records every message sent.
#[derive(Default)]
pub struct FakeBroadcast {
    pub messages: Mutex<Vec<BroadcastMessage>>,
}

#[async_trait]
impl Broadcast for FakeBroadcast {
    async fn send(&self, message: BroadcastMessage) {
        self.messages.lock().await.push(message);
    }
}

impl FakeBroadcast {
    pub async fn snapshot_count(&self) -> usize {
        self.messages.lock().await.iter().filter(|m| matches!(m, BroadcastMessage::Snapshot(_))).count()
    }
}
