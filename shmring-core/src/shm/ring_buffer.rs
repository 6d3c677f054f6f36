// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Lock-free circular byte ring buffer for IPC.
//!
//! Uses monotonically increasing 32-bit head/tail cursors for wait-free
//! single-producer single-consumer communication. Full and empty are told
//! apart by wrapping subtraction (`head - tail`), never by a flag.
//!
//! Each message is a frame `[u32 LE length][payload]`. Frames are contiguous in
//! cursor space and only split by the physical wrap of the data area.

use std::fmt;
use std::sync::atomic::Ordering;

use crate::error::LayoutError;
use crate::shm::header::{
    capacity_for_region, HeaderSnapshot, RingHeader, FRAME_HEADER_SIZE, HEADER_SIZE, MIN_CAPACITY,
};
use crate::shm::region::Region;

/// SPSC ring buffer bound to a region.
///
/// One instance plays one role. A producer calls [`RingBuffer::initialize`]
/// and only writes; a consumer calls [`RingBuffer::attach`] and only reads.
/// The two instances may live in different processes, or in different threads
/// sharing an `Arc` region.
pub struct RingBuffer<R: Region> {
    /// Underlying memory region.
    region: R,
    capacity: u32,
    mask: u32,
}

impl<R: Region> RingBuffer<R> {
    /// Bind to `region` as the producer and write a fresh header.
    ///
    /// Capacity is the largest power of two that fits after the header.
    pub fn initialize(region: R) -> Result<Self, LayoutError> {
        check_alignment(&region)?;

        let capacity = capacity_for_region(region.len());
        if capacity < MIN_CAPACITY {
            return Err(LayoutError::RegionTooSmall {
                len: region.len(),
                min: HEADER_SIZE + MIN_CAPACITY as usize,
            });
        }

        let buffer = Self {
            region,
            capacity,
            mask: capacity - 1,
        };
        buffer.header().initialize(capacity);

        tracing::debug!(capacity = capacity, "Initialized ring buffer");
        Ok(buffer)
    }

    /// Bind to a region a producer already initialized. Never writes the header.
    pub fn attach(region: R) -> Result<Self, LayoutError> {
        check_alignment(&region)?;

        if region.len() < HEADER_SIZE {
            return Err(LayoutError::RegionTooSmall {
                len: region.len(),
                min: HEADER_SIZE,
            });
        }

        // SAFETY: alignment and length were checked above
        let capacity = unsafe { RingHeader::from_ptr(region.as_ptr()) }.capacity();

        if capacity == 0 {
            return Err(LayoutError::ZeroCapacity);
        }
        if !capacity.is_power_of_two() {
            return Err(LayoutError::CapacityNotPowerOfTwo { capacity });
        }
        if HEADER_SIZE + capacity as usize > region.len() {
            return Err(LayoutError::CapacityExceedsRegion {
                capacity,
                region_len: region.len(),
            });
        }

        tracing::debug!(capacity = capacity, "Attached to ring buffer");
        Ok(Self {
            region,
            capacity,
            mask: capacity - 1,
        })
    }

    /// Data area capacity in bytes.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Calculate available space for writing.
    pub fn writeable_bytes(&self) -> u32 {
        let header = self.header();
        let head = header.head(Ordering::Relaxed);
        let tail = header.tail(Ordering::Acquire);
        self.capacity.wrapping_sub(head.wrapping_sub(tail))
    }

    /// Calculate amount of data ready to read.
    pub fn readable_bytes(&self) -> u32 {
        let header = self.header();
        let tail = header.tail(Ordering::Relaxed);
        let head = header.head(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    /// True when at least a length prefix is readable.
    pub fn has_data(&self) -> bool {
        self.readable_bytes() >= FRAME_HEADER_SIZE as u32
    }

    /// Append one frame. Returns `false` without touching the buffer when the
    /// frame does not fit in the free space.
    ///
    /// An empty payload is published as a bare zero length prefix. Readers
    /// cannot tell that apart from a frame still being written, so it is never
    /// delivered and blocks every frame behind it.
    pub fn write(&mut self, payload: &[u8]) -> bool {
        let Some((len, total)) = frame_size(payload.len()) else {
            return false;
        };
        if self.writeable_bytes() < total {
            return false;
        }

        let header = self.header();
        let head = header.head(Ordering::Relaxed);

        self.copy_in(head, &len.to_le_bytes());
        self.copy_in(head.wrapping_add(FRAME_HEADER_SIZE as u32), payload);

        // Publish only after the frame bytes are in place.
        header.set_head(head.wrapping_add(total), Ordering::Release);
        true
    }

    /// Length of the next complete frame, without consuming it.
    pub fn peek_len(&self) -> Option<u32> {
        let (_, msg_len) = self.next_frame()?;
        Some(msg_len)
    }

    /// Take the next complete frame.
    pub fn read(&mut self) -> Option<Vec<u8>> {
        let (tail, msg_len) = self.next_frame()?;

        let mut payload = vec![0u8; msg_len as usize];
        self.copy_out(tail.wrapping_add(FRAME_HEADER_SIZE as u32), &mut payload);
        self.advance_tail(tail, msg_len);

        Some(payload)
    }

    /// Copy the next complete frame into `out` and return its length.
    ///
    /// A frame longer than `out` is dropped: the tail moves past it and `None`
    /// is returned.
    pub fn read_into(&mut self, out: &mut [u8]) -> Option<usize> {
        let (tail, msg_len) = self.next_frame()?;
        let len = msg_len as usize;

        if len > out.len() {
            tracing::warn!(
                frame_len = len,
                buffer_len = out.len(),
                "Skipping frame larger than read buffer"
            );
            self.advance_tail(tail, msg_len);
            return None;
        }

        self.copy_out(tail.wrapping_add(FRAME_HEADER_SIZE as u32), &mut out[..len]);
        self.advance_tail(tail, msg_len);
        Some(len)
    }

    /// Copy of the current header words.
    pub fn header_snapshot(&self) -> HeaderSnapshot {
        self.header().snapshot()
    }

    /// The region this ring is bound to.
    pub fn region(&self) -> &R {
        &self.region
    }

    /// Release the ring and hand back the region.
    pub fn into_region(self) -> R {
        self.region
    }

    /// Tail cursor and payload length of the next frame, if it is fully published.
    fn next_frame(&self) -> Option<(u32, u32)> {
        let header = self.header();
        let tail = header.tail(Ordering::Relaxed);
        let head = header.head(Ordering::Acquire);

        let available = head.wrapping_sub(tail);
        if available < FRAME_HEADER_SIZE as u32 {
            return None;
        }

        let mut prefix = [0u8; FRAME_HEADER_SIZE];
        self.copy_out(tail, &mut prefix);
        let msg_len = u32::from_le_bytes(prefix);

        // Zero-length frames and frames not yet fully covered by head look the same.
        if msg_len == 0 || (available as u64) < msg_len as u64 + FRAME_HEADER_SIZE as u64 {
            return None;
        }

        Some((tail, msg_len))
    }

    fn advance_tail(&self, tail: u32, msg_len: u32) {
        let consumed = msg_len.wrapping_add(FRAME_HEADER_SIZE as u32);
        self.header()
            .set_tail(tail.wrapping_add(consumed), Ordering::Release);
    }

    fn header(&self) -> &RingHeader {
        // SAFETY: construction checked alignment and that the region covers the header
        unsafe { RingHeader::from_ptr(self.region.as_ptr()) }
    }

    /// Get pointer to the data area (after header).
    fn data_ptr(&self) -> *mut u8 {
        // SAFETY: HEADER_SIZE is within the region bounds
        unsafe { self.region.as_ptr().add(HEADER_SIZE) }
    }

    /// Copy `src` into the data area at cursor `pos`, wrapping at the physical end.
    fn copy_in(&self, pos: u32, src: &[u8]) {
        let offset = (pos & self.mask) as usize;
        let first = (self.capacity as usize - offset).min(src.len());

        // SAFETY: offset < capacity, first <= capacity - offset, and the remainder
        // is at most capacity; the producer owns [head, tail + capacity).
        unsafe {
            let data = self.data_ptr();
            std::ptr::copy_nonoverlapping(src.as_ptr(), data.add(offset), first);
            if first < src.len() {
                std::ptr::copy_nonoverlapping(src.as_ptr().add(first), data, src.len() - first);
            }
        }
    }

    /// Copy from the data area at cursor `pos` into `dst`, wrapping at the physical end.
    fn copy_out(&self, pos: u32, dst: &mut [u8]) {
        let offset = (pos & self.mask) as usize;
        let first = (self.capacity as usize - offset).min(dst.len());

        // SAFETY: same bounds as copy_in; the consumer owns [tail, head).
        unsafe {
            let data = self.data_ptr();
            std::ptr::copy_nonoverlapping(data.add(offset), dst.as_mut_ptr(), first);
            if first < dst.len() {
                std::ptr::copy_nonoverlapping(data, dst.as_mut_ptr().add(first), dst.len() - first);
            }
        }
    }
}

impl<R: Region> fmt::Debug for RingBuffer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.header_snapshot();
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("head", &header.head)
            .field("tail", &header.tail)
            .finish()
    }
}

fn check_alignment<R: Region>(region: &R) -> Result<(), LayoutError> {
    let align = std::mem::align_of::<RingHeader>();
    if region.as_ptr() as usize % align != 0 {
        return Err(LayoutError::MisalignedRegion { align });
    }
    Ok(())
}

/// Payload length and framed length as u32, if the frame is representable.
fn frame_size(payload_len: usize) -> Option<(u32, u32)> {
    let len = u32::try_from(payload_len).ok()?;
    let total = len.checked_add(FRAME_HEADER_SIZE as u32)?;
    Some((len, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shm::region::HeapRegion;
    use std::sync::Arc;

    fn ring(capacity: u32) -> RingBuffer<HeapRegion> {
        RingBuffer::initialize(HeapRegion::for_capacity(capacity).unwrap()).unwrap()
    }

    fn assert_conserved<R: Region>(ring: &RingBuffer<R>) {
        assert_eq!(
            ring.writeable_bytes() + ring.readable_bytes(),
            ring.capacity(),
            "writeable + readable must equal capacity"
        );
    }

    #[test]
    fn test_write_read_hello() {
        let mut ring = ring(64);
        assert_eq!(ring.capacity(), 64);
        assert_eq!(ring.readable_bytes(), 0);
        assert_eq!(ring.writeable_bytes(), 64);

        assert!(ring.write(b"hello"));
        assert_eq!(ring.writeable_bytes(), 64 - 9);
        assert_eq!(ring.readable_bytes(), 9);

        assert_eq!(ring.read().as_deref(), Some(&b"hello"[..]));
        assert_eq!(ring.readable_bytes(), 0);
        assert_conserved(&ring);
    }

    #[test]
    fn test_multiple_messages_fifo() {
        let mut ring = ring(64);
        let msgs: [&[u8]; 3] = [b"msg1", b"message_two", b"3"];
        for m in msgs {
            assert!(ring.write(m));
            assert_conserved(&ring);
        }
        for m in msgs {
            assert_eq!(ring.read().as_deref(), Some(m));
            assert_conserved(&ring);
        }
        assert!(ring.read().is_none());
    }

    #[test]
    fn test_full_buffer_rejection_leaves_state_unchanged() {
        let mut ring = ring(16);
        assert!(ring.write(&[b'X'; 12]));
        assert_eq!(ring.writeable_bytes(), 0);

        let before = ring.header_snapshot();
        assert!(!ring.write(b"Y"));
        assert_eq!(ring.header_snapshot(), before);

        assert_eq!(ring.read(), Some(vec![b'X'; 12]));
        assert!(ring.write(b"Y"));
    }

    #[test]
    fn test_partial_space_rejection() {
        let mut ring = ring(16);
        assert!(ring.write(&[1; 4]));
        // 8 bytes left, a 5-byte payload needs 9.
        assert!(!ring.write(&[2; 5]));
        assert!(ring.write(&[2; 4]));
        assert_eq!(ring.writeable_bytes(), 0);
    }

    #[test]
    fn test_wraparound_payload() {
        let mut ring = ring(32);
        assert!(ring.write(&[b'A'; 20]));
        assert_eq!(ring.read(), Some(vec![b'A'; 20]));

        // Starts at offset 24: prefix fits, payload wraps to the front.
        assert!(ring.write(&[b'B'; 20]));
        assert_eq!(ring.read(), Some(vec![b'B'; 20]));
        assert_conserved(&ring);
    }

    #[test]
    fn test_wraparound_length_prefix() {
        let mut ring = ring(16);
        assert!(ring.write(&[1; 10]));
        assert_eq!(ring.read(), Some(vec![1; 10]));

        // Cursor at 14: the length prefix itself is split 2 + 2.
        let payload = [9u8, 8, 7, 6, 5];
        assert!(ring.write(&payload));
        assert_eq!(ring.peek_len(), Some(5));
        assert_eq!(ring.read().as_deref(), Some(&payload[..]));
    }

    #[test]
    fn test_wraparound_matches_reference_sequence() {
        let mut ring = ring(64);
        let mut seed = 0x2545_F491_u32;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            seed
        };

        let mut expected = std::collections::VecDeque::new();
        let mut total_bytes = 0usize;
        for round in 0..500u32 {
            let len = (next() % 40 + 1) as usize;
            let payload: Vec<u8> = (0..len).map(|i| (round as usize + i) as u8).collect();

            if ring.write(&payload) {
                total_bytes += payload.len() + FRAME_HEADER_SIZE;
                expected.push_back(payload);
            } else {
                assert!(ring.writeable_bytes() < (len + FRAME_HEADER_SIZE) as u32);
            }
            assert_conserved(&ring);

            if next() % 3 == 0 {
                assert_eq!(ring.read(), expected.pop_front());
            }
        }
        while let Some(msg) = expected.pop_front() {
            assert_eq!(ring.read(), Some(msg));
        }
        assert!(ring.read().is_none());
        assert!(total_bytes > 64 * 10, "sequence must wrap many times");
    }

    #[test]
    fn test_empty_read_is_idempotent() {
        let mut ring = ring(32);
        for _ in 0..5 {
            assert!(ring.read().is_none());
            assert!(!ring.has_data());
            assert_eq!(ring.header_snapshot().tail, 0);
        }
    }

    #[test]
    fn test_empty_payload_publishes_zero_length_frame() {
        let mut ring = ring(32);
        assert!(ring.write(b""));
        assert_eq!(ring.readable_bytes(), 4);
        assert_eq!(ring.writeable_bytes(), 28);
        assert!(ring.has_data());

        // Stuck: the zero prefix reads as "not yet published".
        assert!(ring.read().is_none());
        assert_eq!(ring.peek_len(), None);
        assert_eq!(ring.header_snapshot().tail, 0);

        assert!(ring.write(b"behind"));
        assert!(ring.read().is_none());
        assert_conserved(&ring);
    }

    #[test]
    fn test_zero_length_frame_reads_as_not_ready() {
        let region = Arc::new(HeapRegion::for_capacity(32).unwrap());
        let producer = RingBuffer::initialize(Arc::clone(&region)).unwrap();
        // Simulate a foreign writer that published an empty frame.
        producer.header().set_head(4, Ordering::Release);

        let mut consumer = RingBuffer::attach(region).unwrap();
        assert!(consumer.has_data());
        assert!(consumer.read().is_none());
        assert!(consumer.read().is_none());
        assert_eq!(consumer.header_snapshot().tail, 0);
    }

    #[test]
    fn test_incomplete_frame_reads_as_not_ready() {
        let region = Arc::new(HeapRegion::for_capacity(32).unwrap());
        let mut producer = RingBuffer::initialize(Arc::clone(&region)).unwrap();
        assert!(producer.write(b"abcdef"));
        // Pull head back so only part of the payload is published.
        producer.header().set_head(7, Ordering::Release);

        let mut consumer = RingBuffer::attach(region).unwrap();
        assert_eq!(consumer.readable_bytes(), 7);
        assert_eq!(consumer.peek_len(), None);
        assert!(consumer.read().is_none());
    }

    #[test]
    fn test_cursors_wrap_past_u32_max() {
        let mut ring = ring(64);
        let start = u32::MAX - 10;
        ring.header().set_head(start, Ordering::Relaxed);
        ring.header().set_tail(start, Ordering::Relaxed);
        assert_eq!(ring.readable_bytes(), 0);
        assert_eq!(ring.writeable_bytes(), 64);

        for i in 0..20u8 {
            let payload = vec![i; (i as usize % 7) + 1];
            assert!(ring.write(&payload));
            assert_conserved(&ring);
            assert_eq!(ring.read(), Some(payload));
        }
        assert!(ring.header_snapshot().head < start, "head must have wrapped");
        assert_eq!(ring.readable_bytes(), 0);
    }

    #[test]
    fn test_read_into() {
        let mut ring = ring(64);
        assert!(ring.write(b"short"));
        assert!(ring.write(b"this one is too long"));
        assert!(ring.write(b"ok"));

        let mut buf = [0u8; 8];
        assert_eq!(ring.read_into(&mut buf), Some(5));
        assert_eq!(&buf[..5], b"short");

        // Oversized frame is skipped.
        assert_eq!(ring.read_into(&mut buf), None);
        assert_eq!(ring.read_into(&mut buf), Some(2));
        assert_eq!(&buf[..2], b"ok");
        assert_eq!(ring.readable_bytes(), 0);
    }

    #[test]
    fn test_initialize_rounds_down_capacity() {
        let ring = RingBuffer::initialize(HeapRegion::new(16 + 100).unwrap()).unwrap();
        assert_eq!(ring.capacity(), 64);
        assert_eq!(ring.header_snapshot().capacity, 64);
    }

    #[test]
    fn test_initialize_rejects_small_region() {
        let err = RingBuffer::initialize(HeapRegion::new(16 + 7).unwrap()).unwrap_err();
        assert_eq!(err, LayoutError::RegionTooSmall { len: 23, min: 24 });
    }

    #[test]
    fn test_attach_rejects_uninitialized_region() {
        let err = RingBuffer::attach(HeapRegion::for_capacity(64).unwrap()).unwrap_err();
        assert_eq!(err, LayoutError::ZeroCapacity);
    }

    #[test]
    fn test_attach_rejects_bad_capacity() {
        let region = Arc::new(HeapRegion::for_capacity(64).unwrap());
        let ring = RingBuffer::initialize(Arc::clone(&region)).unwrap();

        ring.header().initialize(48);
        assert_eq!(
            RingBuffer::attach(Arc::clone(&region)).unwrap_err(),
            LayoutError::CapacityNotPowerOfTwo { capacity: 48 }
        );

        ring.header().initialize(128);
        assert_eq!(
            RingBuffer::attach(Arc::clone(&region)).unwrap_err(),
            LayoutError::CapacityExceedsRegion {
                capacity: 128,
                region_len: 80
            }
        );
    }

    #[test]
    fn test_attach_sees_producer_state() {
        let region = Arc::new(HeapRegion::for_capacity(64).unwrap());
        let mut producer = RingBuffer::initialize(Arc::clone(&region)).unwrap();
        assert!(producer.write(b"cross-lang"));

        let mut consumer = RingBuffer::attach(region).unwrap();
        assert_eq!(consumer.capacity(), 64);
        assert!(consumer.has_data());
        assert_eq!(consumer.read().as_deref(), Some(&b"cross-lang"[..]));
        assert_eq!(producer.writeable_bytes(), 64);
    }

    #[test]
    fn test_cross_thread_spsc() {
        const MESSAGES: u32 = 20_000;

        let region = Arc::new(HeapRegion::for_capacity(256).unwrap());
        let mut producer = RingBuffer::initialize(Arc::clone(&region)).unwrap();
        let mut consumer = RingBuffer::attach(region).unwrap();

        let writer = std::thread::spawn(move || {
            for i in 0..MESSAGES {
                let payload = i.to_le_bytes().repeat((i % 5 + 1) as usize);
                while !producer.write(&payload) {
                    std::hint::spin_loop();
                }
            }
        });

        let mut received = 0;
        while received < MESSAGES {
            match consumer.read() {
                Some(payload) => {
                    let expected = received.to_le_bytes().repeat((received % 5 + 1) as usize);
                    assert_eq!(payload, expected);
                    received += 1;
                }
                None => std::hint::spin_loop(),
            }
        }

        writer.join().expect("producer thread panicked");
        assert!(consumer.read().is_none());
    }
}
