// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

/// Server configuration as read from the process collaborator (§6).
#[derive(Debug, Clone, Parser)]
#[command(name = "race-control", about = "Race control core configuration")]
pub struct ServerConfig {
    /// Whether driver-swap supervision is enabled.
    #[arg(long, env = "RC_DRIVER_SWAP_ENABLED", default_value = "false")]
    pub driver_swap_enabled: bool,

    /// Minimum pit time before a swapped-in driver may leave, in seconds.
    #[arg(long, env = "RC_DRIVER_SWAP_MIN_TIME", default_value = "120")]
    pub driver_swap_min_time_secs: u64,

    /// Countdown threshold below which leaving pits risks disqualification.
    #[arg(long, env = "RC_DRIVER_SWAP_DISQUALIFY_TIME", default_value = "60")]
    pub driver_swap_disqualify_time_secs: u64,

    /// Countdown threshold below which leaving pits draws a time penalty.
    #[arg(long, env = "RC_DRIVER_SWAP_PENALTY_TIME", default_value = "20")]
    pub driver_swap_penalty_time_secs: u64,

    /// Server display name, used in the welcome chat.
    #[arg(long, env = "RC_SERVER_NAME", default_value = "")]
    pub server_name: String,

    /// Configured join message appended to the welcome chat.
    #[arg(long, env = "RC_JOIN_MESSAGE", default_value = "")]
    pub join_message: String,

    /// Whether to append the "Sol" weather-mod advisory to the welcome chat.
    #[arg(long, env = "RC_SOL_ENABLED", default_value = "false")]
    pub sol_enabled: bool,

    /// Optional live-timing URL appended to the welcome chat.
    #[arg(long, env = "RC_LIVE_TIMING_URL")]
    pub live_timing_url: Option<String>,
}

impl ServerConfig {
    pub fn driver_swap_min_time(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.driver_swap_min_time_secs)
    }

    pub fn driver_swap_disqualify_time(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.driver_swap_disqualify_time_secs)
    }

    pub fn driver_swap_penalty_time(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.driver_swap_penalty_time_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            driver_swap_enabled: false,
            driver_swap_min_time_secs: 120,
            driver_swap_disqualify_time_secs: 60,
            driver_swap_penalty_time_secs: 20,
            server_name: String::new(),
            join_message: String::new(),
            sol_enabled: false,
            live_timing_url: None,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
