// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Sleep-and-retry loops around the non-blocking channel operations.
//!
//! The ring buffer never blocks. These helpers give the CLI blocking
//! semantics bounded by a [`PollConfig`].

use std::time::Instant;

use shmring_core::{Consumer, PollConfig, Producer};

/// Retry `attempt` until it yields a value or the policy's timeout expires.
pub fn poll_until<T, F>(mut attempt: F, policy: &PollConfig) -> Option<T>
where
    F: FnMut() -> Option<T>,
{
    let deadline = policy.timeout.map(|t| Instant::now() + t);

    loop {
        if let Some(value) = attempt() {
            return Some(value);
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return None;
            }
        }
        std::thread::sleep(policy.interval);
    }
}

/// Wait for the next message. `None` means the timeout expired.
pub fn poll_read(consumer: &mut Consumer, policy: &PollConfig) -> Option<Vec<u8>> {
    poll_until(|| consumer.read(), policy)
}

/// Wait for room and write one message. `false` means the timeout expired,
/// the message can never fit, or it is empty.
///
/// Empty messages are refused here: the ring would publish them as a zero
/// length frame that no reader ever delivers.
pub fn poll_write(producer: &mut Producer, payload: &[u8], policy: &PollConfig) -> bool {
    if payload.is_empty() {
        tracing::warn!("Refusing to publish an empty message");
        return false;
    }

    let frame = payload.len() as u64 + 4;
    if frame > producer.capacity() as u64 {
        tracing::warn!(
            len = payload.len(),
            capacity = producer.capacity(),
            "Message can never fit in channel"
        );
        return false;
    }

    poll_until(|| producer.write(payload).then_some(()), policy).is_some()
}

/// Retry a fallible open until it succeeds or the timeout expires.
///
/// Returns the last error on timeout.
pub fn wait_for<T, E, F>(mut connect: F, policy: &PollConfig, resource: &str) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    let deadline = policy.timeout.map(|t| Instant::now() + t);

    loop {
        match connect() {
            Ok(value) => {
                tracing::debug!("{} connected", resource);
                return Ok(value);
            }
            Err(e) => {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return Err(e);
                }
                tracing::debug!("Waiting for {} ({})", resource, e);
                std::thread::sleep(policy.interval);
            }
        }
    }
}
