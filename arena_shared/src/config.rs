//! Configuration system.
//!
//! Loads engine configuration from JSON strings (file IO left to app).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fastest tick rate the server accepts.
pub const MAX_TICK_HZ: u32 = 1000;

/// Root configuration shared by client/server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Server listen address, e.g. `127.0.0.1:4433`.
    pub server_addr: String,
    /// Fixed simulation tick rate.
    pub tick_hz: u32,
    /// Movement speed in world units per second.
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    /// Upper bound on concurrently registered sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Per-session outbound queue depth before messages are dropped.
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
}

fn default_move_speed() -> f32 {
    200.0
}

fn default_max_sessions() -> usize {
    64
}

fn default_outbound_capacity() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:4433".to_string(),
            tick_hz: 20,
            move_speed: default_move_speed(),
            max_sessions: default_max_sessions(),
            outbound_capacity: default_outbound_capacity(),
        }
    }
}

impl EngineConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Wall-clock period between two ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }

    /// Rejects values the server cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.tick_hz > 0, "tick_hz must be positive");
        anyhow::ensure!(
            self.tick_hz <= MAX_TICK_HZ,
            "tick_hz must be at most {MAX_TICK_HZ}, got {}",
            self.tick_hz
        );
        anyhow::ensure!(
            self.move_speed.is_finite() && self.move_speed >= 0.0,
            "move_speed must be a finite non-negative number"
        );
        anyhow::ensure!(self.max_sessions > 0, "max_sessions must be positive");
        anyhow::ensure!(
            self.outbound_capacity > 0,
            "outbound_capacity must be positive"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fills_defaults() {
        let cfg =
            EngineConfig::from_json_str(r#"{"server_addr":"0.0.0.0:9000","tick_hz":10}"#).unwrap();
        assert_eq!(cfg.server_addr, "0.0.0.0:9000");
        assert_eq!(cfg.tick_interval(), Duration::from_millis(100));
        assert_eq!(cfg.move_speed, 200.0);
        assert_eq!(cfg.max_sessions, 64);
        cfg.validate().unwrap();
    }

    #[test]
    fn zero_tick_rate_is_rejected() {
        let cfg = EngineConfig {
            tick_hz: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn tick_rate_above_limit_is_rejected() {
        let at_limit = EngineConfig {
            tick_hz: MAX_TICK_HZ,
            ..Default::default()
        };
        at_limit.validate().unwrap();
        assert!(!at_limit.tick_interval().is_zero());

        for tick_hz in [MAX_TICK_HZ + 1, u32::MAX] {
            let cfg = EngineConfig {
                tick_hz,
                ..Default::default()
            };
            assert!(cfg.validate().is_err(), "tick_hz {tick_hz} accepted");
        }
    }
}
