// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

pub mod consume;
pub mod inspect;
pub mod produce;
pub mod remove;
pub mod validate;

use shmring_core::{ChannelConfig, ChannelName, ConfigLoader, PollConfig, ShmRingResult};
use thiserror::Error;

/// Failures specific to the CLI's blocking loops.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Timed out writing message {index} ({len} bytes, {free} bytes free)")]
    WriteTimeout { index: u64, len: usize, free: u32 },
}

/// Channel settings and poll policy resolved from the optional config file.
pub struct Resolved {
    pub name: ChannelName,
    pub channel: Option<ChannelConfig>,
    pub poll: PollConfig,
}

/// Validate `name` and look it up in the config file, if one was given.
pub fn resolve(config_path: Option<&str>, name: &str) -> ShmRingResult<Resolved> {
    let name = ChannelName::new(name)?;

    let Some(path) = config_path else {
        return Ok(Resolved {
            name,
            channel: None,
            poll: PollConfig::default(),
        });
    };

    let config = ConfigLoader::load_file(path)?;
    let channel = config.channel(&name).cloned();
    if channel.is_none() {
        tracing::warn!(name = %name, config = %path, "Channel not listed in config, using defaults");
    }

    Ok(Resolved {
        name,
        channel,
        poll: config.poll,
    })
}
