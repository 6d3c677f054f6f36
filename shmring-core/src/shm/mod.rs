// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Shared Memory IPC module.
//!
//! Cross-language SPSC message channel over POSIX shared memory.
//! Provides the byte-exact ring header, the lock-free ring buffer, the regions
//! it binds to, and the named producer/consumer channel.

pub mod header;
mod channel;
mod region;
mod ring_buffer;

pub use channel::{inspect, remove, Consumer, Producer};
pub use header::{HeaderSnapshot, FRAME_HEADER_SIZE, HEADER_SIZE, MAX_CAPACITY, MIN_CAPACITY};
pub use region::{HeapRegion, Region, SharedMemoryRegion};
pub use ring_buffer::RingBuffer;
