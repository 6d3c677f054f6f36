// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! shmring CLI
//!
//! Command-line interface for shared memory ring buffer channels.

use clap::{Parser, Subcommand};

mod commands;
mod poll;

/// shmring - SPSC message channels over POSIX shared memory
#[derive(Parser)]
#[command(name = "shmring")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a channel and write each stdin line as one message
    Produce {
        /// Channel name
        name: String,

        /// Data area size in bytes (rounded down to a power of two)
        #[arg(long)]
        capacity: Option<u64>,

        /// Stop after this many messages
        #[arg(short = 'n', long)]
        count: Option<u64>,

        /// Unlink the channel on exit instead of leaving it for the consumer
        #[arg(long)]
        destroy: bool,
    },

    /// Attach to a channel and print each message on its own line
    Consume {
        /// Channel name
        name: String,

        /// Expected total region size in bytes (header included)
        #[arg(long)]
        size: Option<usize>,

        /// Stop after this many messages
        #[arg(short = 'n', long)]
        count: Option<u64>,

        /// Print payloads as hex instead of text
        #[arg(long)]
        hex: bool,
    },

    /// Show the header of an existing channel
    Inspect {
        /// Channel name
        name: String,
    },

    /// Unlink a channel by name
    Remove {
        /// Channel name
        name: String,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging. Logs go to stderr so stdout carries only payloads.
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();

    // Dispatch to command handlers
    match cli.command {
        Commands::Produce {
            name,
            capacity,
            count,
            destroy,
        } => commands::produce::execute(config, &name, capacity, count, destroy),
        Commands::Consume {
            name,
            size,
            count,
            hex,
        } => commands::consume::execute(config, &name, size, count, hex),
        Commands::Inspect { name } => commands::inspect::execute(&name),
        Commands::Remove { name } => commands::remove::execute(&name),
        Commands::Validate { file } => commands::validate::execute(&file),
    }
}
