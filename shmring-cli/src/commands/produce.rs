// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmring produce` command - Write stdin lines into a channel.

use std::io::BufRead;

use shmring_core::{Capacity, Producer};

use crate::poll::poll_write;
use super::CommandError;

/// Data area used when neither the flag nor the config names one.
const DEFAULT_CAPACITY: u64 = 64 * 1024;

pub fn execute(
    config_path: Option<&str>,
    name: &str,
    capacity: Option<u64>,
    count: Option<u64>,
    destroy: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let resolved = super::resolve(config_path, name)?;

    let capacity = match (capacity, &resolved.channel) {
        (Some(bytes), _) => Capacity::new(bytes)?,
        (None, Some(channel)) => channel.capacity,
        (None, None) => Capacity::new(DEFAULT_CAPACITY)?,
    };

    let mut producer = Producer::create(&resolved.name, capacity)?;
    tracing::info!(name = %resolved.name, capacity = %capacity, "Channel created");

    let mut sent = 0u64;
    let mut outcome = Ok(());

    for line in std::io::stdin().lock().lines() {
        if count.is_some_and(|n| sent >= n) {
            break;
        }

        let line = line?;
        if line.is_empty() {
            tracing::debug!("Skipping empty line");
            continue;
        }

        if !poll_write(&mut producer, line.as_bytes(), &resolved.poll) {
            outcome = Err(CommandError::WriteTimeout {
                index: sent + 1,
                len: line.len(),
                free: producer.writeable_bytes(),
            });
            break;
        }
        sent += 1;
    }

    tracing::info!(name = %resolved.name, sent = sent, "Producer finished");

    if destroy {
        producer.destroy()?;
    } else {
        producer.close();
    }

    Ok(outcome?)
}
