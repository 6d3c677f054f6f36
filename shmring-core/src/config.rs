// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! Describes named channels and the poll policy callers use around the
//! non-blocking read/write operations. Any invalid field results in a
//! HardValidationError.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{HardValidationError, ShmRingError, ShmRingResult};
use crate::types::{Capacity, ChannelName};

/// Raw channel entry as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawChannelConfig {
    name: String,
    capacity: u64,
}

/// Raw poll policy.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPollConfig {
    #[serde(default = "default_interval_us")]
    interval_us: u64,
    #[serde(default)]
    timeout_ms: u64,
}

fn default_interval_us() -> u64 {
    1000 // 1ms, the usual busy-poll sleep
}

impl Default for RawPollConfig {
    fn default() -> Self {
        Self {
            interval_us: default_interval_us(),
            timeout_ms: 0,
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    poll: RawPollConfig,
    channels: Vec<RawChannelConfig>,
}

/// Validated channel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub name: ChannelName,
    pub capacity: Capacity,
}

/// Validated poll policy for caller-side wait loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Sleep between attempts.
    pub interval: Duration,
    /// Give up after this long. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_micros(default_interval_us()),
            timeout: None,
        }
    }
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub poll: PollConfig,
    pub channels: Vec<ChannelConfig>,
}

impl Config {
    /// Look up a channel by name.
    pub fn channel(&self, name: &ChannelName) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| &c.name == name)
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> ShmRingResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ShmRingError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ShmRingError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> ShmRingResult<Config> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| ShmRingError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Self::validate(raw)
    }

    /// Validate raw configuration and convert to validated types.
    fn validate(raw: RawConfig) -> ShmRingResult<Config> {
        let poll = Self::validate_poll(raw.poll)?;

        let mut channels = Vec::with_capacity(raw.channels.len());
        let mut seen_names = HashSet::new();

        for raw_channel in raw.channels {
            let channel = Self::validate_channel(raw_channel)?;

            if !seen_names.insert(channel.name.clone()) {
                return Err(HardValidationError::DuplicateChannel {
                    name: channel.name.to_string(),
                }
                .into());
            }

            channels.push(channel);
        }

        if channels.is_empty() {
            return Err(HardValidationError::SchemaValidation {
                message: "At least one channel must be defined".to_string(),
            }
            .into());
        }

        Ok(Config { poll, channels })
    }

    fn validate_poll(raw: RawPollConfig) -> ShmRingResult<PollConfig> {
        const MAX_INTERVAL_US: u64 = 1_000_000;

        if raw.interval_us == 0 || raw.interval_us > MAX_INTERVAL_US {
            return Err(HardValidationError::InvalidFieldValue {
                field: "interval_us",
                value: raw.interval_us.to_string(),
                reason: format!("Must be between 1 and {} microseconds", MAX_INTERVAL_US),
            }
            .into());
        }

        let timeout = match raw.timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        Ok(PollConfig {
            interval: Duration::from_micros(raw.interval_us),
            timeout,
        })
    }

    fn validate_channel(raw: RawChannelConfig) -> ShmRingResult<ChannelConfig> {
        let name = ChannelName::new(raw.name)?;
        let capacity = Capacity::new(raw.capacity)?;

        if capacity.bytes() as u64 != raw.capacity {
            tracing::debug!(
                name = %name,
                requested = raw.capacity,
                capacity = capacity.bytes(),
                "Rounded channel capacity down to a power of two"
            );
        }

        Ok(ChannelConfig { name, capacity })
    }
}
