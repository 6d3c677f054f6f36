//! shmring Core Library
//!
//! Single-producer/single-consumer byte ring buffer living in memory shared
//! between two processes, possibly written in different languages.
//! Provides the header layout, the ring buffer, named shared memory channels,
//! validated types and configuration parsing.

pub mod config;
pub mod error;
pub mod shm;
pub mod types;

// Re-export commonly used types
pub use config::{ChannelConfig, Config, ConfigLoader, PollConfig};
pub use error::{
    HardValidationError, LayoutError, SharedMemoryError, ShmRingError, ShmRingResult,
};
pub use shm::{Consumer, Producer, RingBuffer};
pub use types::{Capacity, ChannelName};
