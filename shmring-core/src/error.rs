// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for shmring.
//!
//! Backpressure and "no message yet" are not errors: the ring buffer reports
//! them as `false` / `None`. Everything in this module is a construction-time
//! or lifecycle failure and is strongly typed.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for shmring.
#[derive(Debug, Error)]
pub enum ShmRingError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Shared Memory Errors
    // =========================================================================
    #[error("Shared memory error: {0}")]
    SharedMemory(#[from] SharedMemoryError),

    #[error("Ring layout error: {0}")]
    Layout(#[from] LayoutError),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Validation errors for user-supplied names, sizes and configuration.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Capacity out of bounds: {requested} bytes (min: {min}, max: {max})")]
    CapacityOutOfBounds { requested: u64, min: u64, max: u64 },

    #[error("Invalid channel name '{name}': {reason}")]
    InvalidChannelName { name: String, reason: String },

    #[error("Duplicate channel name: {name}")]
    DuplicateChannel { name: String },

    #[error("Schema validation failed: {message}")]
    SchemaValidation { message: String },
}

/// Shared memory allocation and mapping errors.
#[derive(Debug, Error)]
pub enum SharedMemoryError {
    #[error("Failed to create shared memory region: {name} - {reason}")]
    CreateFailed { name: String, reason: String },

    #[error("Failed to open shared memory region: {name} - {reason}")]
    OpenFailed { name: String, reason: String },

    #[error("Failed to map shared memory: {reason}")]
    MapFailed { reason: String },

    #[error("Failed to unlink shared memory region: {name} - {reason}")]
    UnlinkFailed { name: String, reason: String },

    #[error("Shared memory region {name} is {actual} bytes, expected at least {expected}")]
    SizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Violations of the ring header layout, detected when binding a ring to a region.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Region too small: {len} bytes (need at least {min})")]
    RegionTooSmall { len: usize, min: usize },

    #[error("Region of {len} bytes cannot be allocated")]
    RegionTooLarge { len: usize },

    #[error("Region base address is not {align}-byte aligned")]
    MisalignedRegion { align: usize },

    #[error("Header declares zero capacity (region not initialized by a producer?)")]
    ZeroCapacity,

    #[error("Header capacity {capacity} is not a power of two")]
    CapacityNotPowerOfTwo { capacity: u32 },

    #[error("Header capacity {capacity} does not fit in a {region_len}-byte region")]
    CapacityExceedsRegion { capacity: u32, region_len: usize },
}

/// Result type alias using ShmRingError.
pub type ShmRingResult<T> = Result<T, ShmRingError>;
