// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmring validate` command - Validate configuration file.

use shmring_core::ConfigLoader;

pub fn execute(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file, "Validating configuration");

    match ConfigLoader::load_file(file) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Poll Settings:");
            println!("  Interval: {}us", config.poll.interval.as_micros());
            match config.poll.timeout {
                Some(timeout) => println!("  Timeout:  {}ms", timeout.as_millis()),
                None => println!("  Timeout:  none"),
            }
            println!();
            println!("Channels ({}):", config.channels.len());
            for channel in &config.channels {
                println!(
                    "  - {} (capacity: {}, region: {} bytes)",
                    channel.name,
                    channel.capacity,
                    channel.capacity.region_len()
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
