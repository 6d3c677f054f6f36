// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Named shared memory channels.
//!
//! A `Producer` creates the region and owns its deletion; a `Consumer` attaches
//! to it. Dropping either side unmaps its view. Only `Producer::destroy` (or
//! [`remove`]) unlinks the named object.

use crate::config::ChannelConfig;
use crate::error::ShmRingResult;
use crate::shm::header::HeaderSnapshot;
use crate::shm::region::SharedMemoryRegion;
use crate::shm::ring_buffer::RingBuffer;
use crate::types::{Capacity, ChannelName};

/// Writing end of a channel.
#[derive(Debug)]
pub struct Producer {
    ring: RingBuffer<SharedMemoryRegion>,
}

impl Producer {
    /// Create a fresh region of `capacity + 16` bytes named `name`, replacing any
    /// stale region with that name, and initialize the ring header.
    pub fn create(name: &ChannelName, capacity: Capacity) -> ShmRingResult<Self> {
        let region = SharedMemoryRegion::create(name, capacity.region_len())?;
        let ring = RingBuffer::initialize(region)?;

        tracing::debug!(name = %name, capacity = %capacity, "Producer ready");
        Ok(Self { ring })
    }

    /// Create the channel described by `config`.
    pub fn from_config(config: &ChannelConfig) -> ShmRingResult<Self> {
        Self::create(&config.name, config.capacity)
    }

    /// Append one message. `false` means not enough free space right now.
    pub fn write(&mut self, payload: &[u8]) -> bool {
        self.ring.write(payload)
    }

    pub fn writeable_bytes(&self) -> u32 {
        self.ring.writeable_bytes()
    }

    pub fn capacity(&self) -> u32 {
        self.ring.capacity()
    }

    pub fn name(&self) -> &ChannelName {
        self.ring.region().name()
    }

    pub fn header(&self) -> HeaderSnapshot {
        self.ring.header_snapshot()
    }

    /// Unmap the region and leave it in place for consumers.
    pub fn close(self) {
        tracing::debug!(name = %self.name(), "Closing producer");
    }

    /// Unmap the region and unlink it.
    pub fn destroy(self) -> ShmRingResult<()> {
        let region = self.ring.into_region();
        tracing::info!(name = %region.name(), "Destroying channel");
        region.destroy()?;
        Ok(())
    }
}

/// Reading end of a channel.
#[derive(Debug)]
pub struct Consumer {
    ring: RingBuffer<SharedMemoryRegion>,
}

impl Consumer {
    /// Attach to an existing channel.
    ///
    /// `expected_size` is the total region size (`capacity + 16`). Without it the
    /// whole object is mapped and the capacity is taken from the header.
    pub fn open(name: &ChannelName, expected_size: Option<usize>) -> ShmRingResult<Self> {
        let region = SharedMemoryRegion::open(name, expected_size)?;
        let ring = RingBuffer::attach(region)?;

        tracing::debug!(name = %name, capacity = ring.capacity(), "Consumer attached");
        Ok(Self { ring })
    }

    /// Attach to the channel described by `config`.
    pub fn from_config(config: &ChannelConfig) -> ShmRingResult<Self> {
        Self::open(&config.name, Some(config.capacity.region_len()))
    }

    /// Take the next complete message, if any.
    pub fn read(&mut self) -> Option<Vec<u8>> {
        self.ring.read()
    }

    /// Copy the next message into `out`. Messages longer than `out` are dropped.
    pub fn read_into(&mut self, out: &mut [u8]) -> Option<usize> {
        self.ring.read_into(out)
    }

    pub fn peek_len(&self) -> Option<u32> {
        self.ring.peek_len()
    }

    pub fn readable_bytes(&self) -> u32 {
        self.ring.readable_bytes()
    }

    pub fn has_data(&self) -> bool {
        self.ring.has_data()
    }

    pub fn capacity(&self) -> u32 {
        self.ring.capacity()
    }

    pub fn name(&self) -> &ChannelName {
        self.ring.region().name()
    }

    pub fn header(&self) -> HeaderSnapshot {
        self.ring.header_snapshot()
    }

    /// Unmap the region. The named object is left for its producer to destroy.
    pub fn close(self) {
        tracing::debug!(name = %self.name(), "Closing consumer");
    }
}

/// Unlink a channel by name without mapping it.
///
/// Returns `false` when no such channel existed.
pub fn remove(name: &ChannelName) -> ShmRingResult<bool> {
    Ok(SharedMemoryRegion::unlink(name)?)
}

/// Read the header of an existing channel without attaching as a consumer.
pub fn inspect(name: &ChannelName) -> ShmRingResult<HeaderSnapshot> {
    let region = SharedMemoryRegion::open(name, None)?;
    let ring = RingBuffer::attach(region)?;
    Ok(ring.header_snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LayoutError, ShmRingError};

    fn unique_name(tag: &str) -> ChannelName {
        ChannelName::new(format!("shmring-channel-{}-{}", tag, std::process::id())).unwrap()
    }

    #[test]
    fn test_producer_consumer_roundtrip() {
        let name = unique_name("roundtrip");
        let mut producer = Producer::create(&name, Capacity::new(64).unwrap()).unwrap();
        assert_eq!(producer.capacity(), 64);

        assert!(producer.write(b"hello"));
        assert_eq!(producer.writeable_bytes(), 55);

        let mut consumer = Consumer::open(&name, Some(80)).unwrap();
        assert_eq!(consumer.capacity(), 64);
        assert_eq!(consumer.readable_bytes(), 9);
        assert_eq!(consumer.read().as_deref(), Some(&b"hello"[..]));
        assert_eq!(consumer.readable_bytes(), 0);
        assert_eq!(producer.writeable_bytes(), 64);

        consumer.close();
        producer.destroy().unwrap();
    }

    #[test]
    fn test_consumer_auto_detects_size() {
        let name = unique_name("autosize");
        let mut producer = Producer::create(&name, Capacity::new(1000).unwrap()).unwrap();
        assert_eq!(producer.capacity(), 512);
        assert!(producer.write(b"sized"));

        let mut consumer = Consumer::open(&name, None).unwrap();
        assert_eq!(consumer.capacity(), 512);
        assert_eq!(consumer.read().as_deref(), Some(&b"sized"[..]));

        drop(consumer);
        producer.destroy().unwrap();
    }

    #[test]
    fn test_close_keeps_region_for_consumer() {
        let name = unique_name("close");
        let mut producer = Producer::create(&name, Capacity::new(128).unwrap()).unwrap();
        for msg in ["hello_from_producer", "message_2", "end"] {
            assert!(producer.write(msg.as_bytes()));
        }
        producer.close();

        let mut consumer = Consumer::open(&name, None).unwrap();
        for msg in ["hello_from_producer", "message_2", "end"] {
            assert_eq!(consumer.read().as_deref(), Some(msg.as_bytes()));
        }
        assert!(consumer.read().is_none());
        consumer.close();

        assert!(remove(&name).unwrap());
        assert!(!remove(&name).unwrap());
    }

    #[test]
    fn test_destroy_unlinks_region() {
        let name = unique_name("destroy");
        let producer = Producer::create(&name, Capacity::new(64).unwrap()).unwrap();
        producer.destroy().unwrap();

        let err = Consumer::open(&name, None).unwrap_err();
        assert!(matches!(err, ShmRingError::SharedMemory(_)));
    }

    #[test]
    fn test_inspect_reports_header() {
        let name = unique_name("inspect");
        let mut producer = Producer::create(&name, Capacity::new(64).unwrap()).unwrap();
        assert!(producer.write(b"abc"));

        let snapshot = inspect(&name).unwrap();
        assert_eq!(snapshot.capacity, 64);
        assert_eq!(snapshot.head, 7);
        assert_eq!(snapshot.tail, 0);
        assert_eq!(snapshot.used(), 7);
        assert_eq!(producer.header(), snapshot);

        producer.destroy().unwrap();
    }

    #[test]
    fn test_consumer_rejects_region_smaller_than_header_claims() {
        let name = unique_name("mismatch");
        let producer = Producer::create(&name, Capacity::new(4096).unwrap()).unwrap();

        // Mapping only part of the region: the header claims more than is mapped.
        let err = Consumer::open(&name, Some(80)).unwrap_err();
        assert!(matches!(
            err,
            ShmRingError::Layout(LayoutError::CapacityExceedsRegion { capacity: 4096, .. })
        ));

        producer.destroy().unwrap();
    }

    #[test]
    fn test_from_config() {
        let config = ChannelConfig {
            name: unique_name("config"),
            capacity: Capacity::new(256).unwrap(),
        };
        let mut producer = Producer::from_config(&config).unwrap();
        let mut consumer = Consumer::from_config(&config).unwrap();

        assert!(producer.write(b"configured"));
        assert_eq!(consumer.peek_len(), Some(10));
        let mut buf = [0u8; 32];
        assert_eq!(consumer.read_into(&mut buf), Some(10));
        assert_eq!(&buf[..10], b"configured");
        assert_eq!(consumer.name(), producer.name());

        drop(consumer);
        producer.destroy().unwrap();
    }
}
