// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmring inspect` command - Show a channel's header.

use shmring_core::{shm, ChannelName};

pub fn execute(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let name = ChannelName::new(name)?;
    let header = shm::inspect(&name)?;

    println!("Channel: {}", name.os_name());
    println!("  Head:      {}", header.head);
    println!("  Tail:      {}", header.tail);
    println!("  Capacity:  {} bytes", header.capacity);
    println!("  Used:      {} bytes", header.used());
    println!("  Free:      {} bytes", header.free());
    if header.reserved != 0 {
        println!("  Reserved:  {:#010x}", header.reserved);
    }

    Ok(())
}
