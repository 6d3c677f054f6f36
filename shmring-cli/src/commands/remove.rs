// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmring remove` command - Unlink a channel.

use shmring_core::{shm, ChannelName};

pub fn execute(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let name = ChannelName::new(name)?;

    if shm::remove(&name)? {
        println!("✓ Removed {}", name.os_name());
    } else {
        println!("No channel named {}", name.os_name());
    }

    Ok(())
}
