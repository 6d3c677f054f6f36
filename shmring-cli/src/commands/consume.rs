// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmring consume` command - Print messages from a channel.

use std::io::Write;

use shmring_core::Consumer;

use crate::poll::{poll_read, wait_for};

pub fn execute(
    config_path: Option<&str>,
    name: &str,
    size: Option<usize>,
    count: Option<u64>,
    hex: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let resolved = super::resolve(config_path, name)?;

    let expected_size = size.or(resolved.channel.as_ref().map(|c| c.capacity.region_len()));

    let mut consumer = wait_for(
        || Consumer::open(&resolved.name, expected_size),
        &resolved.poll,
        resolved.name.as_str(),
    )?;
    tracing::info!(
        name = %resolved.name,
        capacity = consumer.capacity(),
        "Attached to channel"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut received = 0u64;

    while count.map_or(true, |n| received < n) {
        let Some(payload) = poll_read(&mut consumer, &resolved.poll) else {
            tracing::info!(received = received, "No message before timeout");
            break;
        };

        if hex {
            writeln!(out, "{}", to_hex(&payload))?;
        } else {
            writeln!(out, "{}", String::from_utf8_lossy(&payload))?;
        }
        received += 1;
    }

    out.flush()?;
    consumer.close();
    Ok(())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
