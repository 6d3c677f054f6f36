// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Byte-exact control block at offset 0 of every ring region.
//!
//! ```text
//! [0..4)   head      u32 LE   producer only
//! [4..8)   tail      u32 LE   consumer only
//! [8..12)  capacity  u32 LE   producer, once at init
//! [12..16) reserved  u32 LE   zero
//! [16..16+capacity)  circular data area
//! ```
//!
//! Peers written in other languages read and write these words as plain
//! little-endian integers, so every field is converted with `to_le`/`from_le`
//! at the atomic boundary.

use std::mem::{align_of, offset_of, size_of};
use std::sync::atomic::{AtomicU32, Ordering};

/// Size of the control block in bytes.
pub const HEADER_SIZE: usize = 16;

/// Size of the length prefix in front of every frame.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Smallest data area a producer will initialize.
pub const MIN_CAPACITY: u32 = 8;

/// Largest data area; keeps `head - tail <= capacity` representable in a u32.
pub const MAX_CAPACITY: u32 = 1 << 31;

/// Byte offset of the producer's head cursor.
pub const HEAD_OFFSET: usize = 0;
/// Byte offset of the consumer's tail cursor.
pub const TAIL_OFFSET: usize = 4;
/// Byte offset of the data area capacity.
pub const CAPACITY_OFFSET: usize = 8;
/// Byte offset of the reserved word, always zero.
pub const RESERVED_OFFSET: usize = 12;

/// Ring header stored at the start of the region.
#[repr(C)]
pub(crate) struct RingHeader {
    head: AtomicU32,
    tail: AtomicU32,
    capacity: AtomicU32,
    reserved: AtomicU32,
}

const _: () = assert!(size_of::<RingHeader>() == HEADER_SIZE);
const _: () = assert!(align_of::<RingHeader>() == 4);
const _: () = assert!(offset_of!(RingHeader, head) == HEAD_OFFSET);
const _: () = assert!(offset_of!(RingHeader, tail) == TAIL_OFFSET);
const _: () = assert!(offset_of!(RingHeader, capacity) == CAPACITY_OFFSET);
const _: () = assert!(offset_of!(RingHeader, reserved) == RESERVED_OFFSET);

impl RingHeader {
    /// Reinterpret the start of a region as a header.
    ///
    /// # Safety
    /// `base` must be 4-byte aligned and valid for reads and writes of
    /// `HEADER_SIZE` bytes for the whole of `'a`.
    pub(crate) unsafe fn from_ptr<'a>(base: *mut u8) -> &'a RingHeader {
        &*(base as *const RingHeader)
    }

    /// Write-once producer initialization. Capacity is published last so a
    /// consumer that observes it also observes the zeroed cursors.
    pub(crate) fn initialize(&self, capacity: u32) {
        self.head.store(0, Ordering::Relaxed);
        self.tail.store(0, Ordering::Relaxed);
        self.reserved.store(0, Ordering::Relaxed);
        self.capacity.store(capacity.to_le(), Ordering::Release);
    }

    pub(crate) fn head(&self, order: Ordering) -> u32 {
        u32::from_le(self.head.load(order))
    }

    pub(crate) fn set_head(&self, value: u32, order: Ordering) {
        self.head.store(value.to_le(), order);
    }

    pub(crate) fn tail(&self, order: Ordering) -> u32 {
        u32::from_le(self.tail.load(order))
    }

    pub(crate) fn set_tail(&self, value: u32, order: Ordering) {
        self.tail.store(value.to_le(), order);
    }

    pub(crate) fn capacity(&self) -> u32 {
        u32::from_le(self.capacity.load(Ordering::Acquire))
    }

    pub(crate) fn snapshot(&self) -> HeaderSnapshot {
        HeaderSnapshot {
            capacity: self.capacity(),
            head: self.head(Ordering::Acquire),
            tail: self.tail(Ordering::Acquire),
            reserved: u32::from_le(self.reserved.load(Ordering::Relaxed)),
        }
    }
}

/// Point-in-time copy of the four header words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSnapshot {
    pub head: u32,
    pub tail: u32,
    pub capacity: u32,
    pub reserved: u32,
}

impl HeaderSnapshot {
    /// Bytes enqueued but not yet dequeued.
    pub fn used(&self) -> u32 {
        self.head.wrapping_sub(self.tail)
    }

    /// Bytes available to the producer.
    pub fn free(&self) -> u32 {
        self.capacity.wrapping_sub(self.used())
    }
}

/// Largest power of two that is `<= v`, or 0 when `v` is 0.
pub const fn round_down_pow2(v: u64) -> u64 {
    if v == 0 {
        0
    } else {
        1 << (63 - v.leading_zeros())
    }
}

/// Data area capacity a producer derives from a region of `region_len` bytes.
pub(crate) fn capacity_for_region(region_len: usize) -> u32 {
    let usable = region_len.saturating_sub(HEADER_SIZE) as u64;
    round_down_pow2(usable.min(MAX_CAPACITY as u64)) as u32
}
