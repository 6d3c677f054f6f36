// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! All types validate their invariants at creation time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;
use crate::shm::header::{round_down_pow2, HEADER_SIZE, MAX_CAPACITY, MIN_CAPACITY};

/// Longest channel name, excluding the leading '/' of the OS object name.
const MAX_NAME_LEN: usize = 63;

/// Validated shared memory channel name.
/// Must be 1-63 characters of `[A-Za-z0-9._-]`. A single leading '/' is stripped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelName(String);

impl ChannelName {
    /// Create a new ChannelName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, HardValidationError> {
        let raw = name.into();
        let name = raw.strip_prefix('/').unwrap_or(&raw);

        if name.is_empty() {
            return Err(HardValidationError::InvalidChannelName {
                name: raw,
                reason: "Channel name cannot be empty".to_string(),
            });
        }

        if name.len() > MAX_NAME_LEN {
            return Err(HardValidationError::InvalidChannelName {
                reason: format!(
                    "Channel name too long: {} chars (max {})",
                    name.len(),
                    MAX_NAME_LEN
                ),
                name: raw,
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(HardValidationError::InvalidChannelName {
                name: raw,
                reason: "Channel name must contain only ASCII alphanumerics, '.', '-' and '_'"
                    .to_string(),
            });
        }

        Ok(Self(name.to_string()))
    }

    /// Get the inner string value (without the leading '/').
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the POSIX shared memory object.
    pub fn os_name(&self) -> String {
        format!("/{}", self.0)
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ChannelName {
    type Err = HardValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ChannelName {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChannelName> for String {
    fn from(name: ChannelName) -> Self {
        name.0
    }
}

/// Validated ring data-area capacity in bytes.
///
/// Requested sizes are rounded down to a power of two and must land in
/// `MIN_CAPACITY..=MAX_CAPACITY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Capacity(u32);

impl Capacity {
    /// Round `requested` down to a power of two and validate the bounds.
    pub fn new(requested: u64) -> Result<Self, HardValidationError> {
        let rounded = round_down_pow2(requested);
        if rounded < MIN_CAPACITY as u64 || rounded > MAX_CAPACITY as u64 {
            return Err(HardValidationError::CapacityOutOfBounds {
                requested,
                min: MIN_CAPACITY as u64,
                max: MAX_CAPACITY as u64,
            });
        }
        Ok(Self(rounded as u32))
    }

    /// Data area size in bytes.
    pub fn bytes(&self) -> u32 {
        self.0
    }

    /// Total region length: header plus data area.
    pub fn region_len(&self) -> usize {
        HEADER_SIZE + self.0 as usize
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const KIB: u32 = 1024;
        const MIB: u32 = 1024 * 1024;
        match self.0 {
            b if b >= MIB => write!(f, "{}MiB", b / MIB),
            b if b >= KIB => write!(f, "{}KiB", b / KIB),
            b => write!(f, "{}B", b),
        }
    }
}

impl TryFrom<u64> for Capacity {
    type Error = HardValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Capacity> for u64 {
    fn from(capacity: Capacity) -> Self {
        capacity.0 as u64
    }
}
