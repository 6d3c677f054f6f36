// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Byte regions a ring buffer can be bound to.
//!
//! `SharedMemoryRegion` wraps POSIX `shm_open` + `mmap` for cross-process use.
//! `HeapRegion` is a zeroed, 8-byte aligned heap block for in-process use.
//! All unsafe operations are encapsulated with bounds checking.

use std::alloc::{self, Layout};
use std::ffi::CString;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::error::{LayoutError, SharedMemoryError};
use crate::shm::header::{HEADER_SIZE, MAX_CAPACITY, MIN_CAPACITY};
use crate::types::ChannelName;

/// A contiguous read/write byte region of fixed length.
///
/// # Safety
/// Implementors must guarantee that `as_ptr()` is valid for reads and writes of
/// `len()` bytes, never changes for the lifetime of the value, and may be
/// accessed from any thread.
pub unsafe trait Region: Send + Sync {
    /// Base address of the region.
    fn as_ptr(&self) -> *mut u8;

    /// Length of the region in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// SAFETY: the Arc keeps the inner region alive and at a fixed address.
unsafe impl<R: Region + ?Sized> Region for Arc<R> {
    fn as_ptr(&self) -> *mut u8 {
        (**self).as_ptr()
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Represents a mapped shared memory region.
///
/// Dropping the value unmaps the memory and closes the descriptor but never
/// unlinks the named object; that is an explicit [`SharedMemoryRegion::destroy`]
/// or [`SharedMemoryRegion::unlink`].
pub struct SharedMemoryRegion {
    /// Name of the shared memory object.
    name: ChannelName,
    /// Pointer to the mapped memory.
    ptr: NonNull<u8>,
    /// Size of the mapped region in bytes.
    size: usize,
    /// File descriptor for the shared memory object.
    fd: i32,
}

// SAFETY: SharedMemoryRegion owns its mapping; the pointer stays valid until drop.
unsafe impl Send for SharedMemoryRegion {}

// SAFETY: concurrent access to the bytes is coordinated by the ring buffer's atomics.
unsafe impl Sync for SharedMemoryRegion {}

// SAFETY: the mapping is PROT_READ | PROT_WRITE for `size` bytes until drop,
// and mmap returns page-aligned addresses.
unsafe impl Region for SharedMemoryRegion {
    fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    fn len(&self) -> usize {
        self.size
    }
}

impl SharedMemoryRegion {
    /// Minimum size for a ring region (header plus the smallest data area).
    pub const MIN_SIZE: usize = HEADER_SIZE + MIN_CAPACITY as usize;

    /// Maximum size for a ring region (header plus the largest data area).
    pub const MAX_SIZE: usize = HEADER_SIZE + MAX_CAPACITY as usize;

    /// Create a fresh shared memory region, replacing any stale object of the
    /// same name.
    ///
    /// The new region is zero-filled by the kernel.
    pub fn create(name: &ChannelName, size: usize) -> Result<Self, SharedMemoryError> {
        if !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&size) {
            return Err(SharedMemoryError::CreateFailed {
                name: name.to_string(),
                reason: format!(
                    "Size {} is outside [{}, {}]",
                    size,
                    Self::MIN_SIZE,
                    Self::MAX_SIZE
                ),
            });
        }

        let c_name = os_name(name).map_err(|reason| SharedMemoryError::CreateFailed {
            name: name.to_string(),
            reason,
        })?;

        // SAFETY: c_name is a valid CString
        if unsafe { libc::shm_unlink(c_name.as_ptr()) } == 0 {
            tracing::debug!(name = %name, "Removed stale shared memory region");
        }

        // SAFETY: c_name is a valid CString, flags are valid POSIX flags
        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_RDWR | libc::O_EXCL,
                0o600,
            )
        };

        if fd < 0 {
            return Err(SharedMemoryError::CreateFailed {
                name: name.to_string(),
                reason: format!("shm_open failed: {}", std::io::Error::last_os_error()),
            });
        }

        // SAFETY: fd is a valid file descriptor
        let result = unsafe { libc::ftruncate(fd, size as libc::off_t) };
        if result < 0 {
            let errno = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            unsafe { libc::shm_unlink(c_name.as_ptr()) };
            return Err(SharedMemoryError::CreateFailed {
                name: name.to_string(),
                reason: format!("ftruncate failed: {}", errno),
            });
        }

        let ptr = match map(fd, size) {
            Ok(ptr) => ptr,
            Err(e) => {
                unsafe { libc::close(fd) };
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
                return Err(e);
            }
        };

        tracing::debug!(name = %name, size = size, "Created shared memory region");

        Ok(Self {
            name: name.clone(),
            ptr,
            size,
            fd,
        })
    }

    /// Open an existing shared memory region.
    ///
    /// With `expected_size` the mapping covers exactly that many bytes and the
    /// object must be at least that large. Without it the whole object is mapped.
    pub fn open(name: &ChannelName, expected_size: Option<usize>) -> Result<Self, SharedMemoryError> {
        let c_name = os_name(name).map_err(|reason| SharedMemoryError::OpenFailed {
            name: name.to_string(),
            reason,
        })?;

        // SAFETY: c_name is a valid CString
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };

        if fd < 0 {
            return Err(SharedMemoryError::OpenFailed {
                name: name.to_string(),
                reason: format!("shm_open failed: {}", std::io::Error::last_os_error()),
            });
        }

        let actual = match object_size(fd) {
            Ok(actual) => actual,
            Err(errno) => {
                unsafe { libc::close(fd) };
                return Err(SharedMemoryError::OpenFailed {
                    name: name.to_string(),
                    reason: format!("fstat failed: {}", errno),
                });
            }
        };

        // Mapping past the end of the object would fault on first access.
        let size = expected_size.unwrap_or(actual);
        let minimum = size.max(HEADER_SIZE);
        if actual < minimum {
            unsafe { libc::close(fd) };
            return Err(SharedMemoryError::SizeMismatch {
                name: name.to_string(),
                expected: minimum,
                actual,
            });
        }

        let ptr = match map(fd, size) {
            Ok(ptr) => ptr,
            Err(e) => {
                unsafe { libc::close(fd) };
                return Err(e);
            }
        };

        tracing::debug!(name = %name, size = size, "Opened shared memory region");

        Ok(Self {
            name: name.clone(),
            ptr,
            size,
            fd,
        })
    }

    /// Remove the named object. Existing mappings stay valid until dropped.
    ///
    /// Returns `false` if no object with that name existed.
    pub fn unlink(name: &ChannelName) -> Result<bool, SharedMemoryError> {
        let c_name = os_name(name).map_err(|reason| SharedMemoryError::UnlinkFailed {
            name: name.to_string(),
            reason,
        })?;

        // SAFETY: c_name is a valid CString
        if unsafe { libc::shm_unlink(c_name.as_ptr()) } == 0 {
            tracing::info!(name = %name, "Unlinked shared memory region");
            return Ok(true);
        }

        let errno = std::io::Error::last_os_error();
        if errno.raw_os_error() == Some(libc::ENOENT) {
            return Ok(false);
        }
        Err(SharedMemoryError::UnlinkFailed {
            name: name.to_string(),
            reason: errno.to_string(),
        })
    }

    /// Unmap this region and unlink the named object.
    pub fn destroy(self) -> Result<(), SharedMemoryError> {
        let name = self.name.clone();
        drop(self);
        Self::unlink(&name).map(|_| ())
    }

    /// Get the name of this shared memory region.
    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    /// Get the size of this shared memory region.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for SharedMemoryRegion {
    fn drop(&mut self) {
        // SAFETY: ptr and size were set during creation
        let result = unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size) };
        if result < 0 {
            tracing::error!(
                name = %self.name,
                error = %std::io::Error::last_os_error(),
                "Failed to unmap shared memory"
            );
        }

        // SAFETY: fd was opened during creation
        unsafe { libc::close(self.fd) };
    }
}

fn os_name(name: &ChannelName) -> Result<CString, String> {
    CString::new(name.os_name()).map_err(|e| format!("Invalid name: {}", e))
}

fn object_size(fd: i32) -> Result<usize, std::io::Error> {
    // SAFETY: an all-zero stat is a valid value to be overwritten by fstat
    let mut stat: libc::stat = unsafe { std::mem::zeroed() };
    // SAFETY: fd is valid and stat is a valid out pointer
    if unsafe { libc::fstat(fd, &mut stat) } < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(stat.st_size.max(0) as usize)
}

fn map(fd: i32, size: usize) -> Result<NonNull<u8>, SharedMemoryError> {
    // Both sides need PROT_WRITE: the consumer publishes the tail cursor.
    // SAFETY: fd is valid, size is non-zero and within the object
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd,
            0,
        )
    };

    if ptr == libc::MAP_FAILED {
        return Err(SharedMemoryError::MapFailed {
            reason: format!("mmap failed: {}", std::io::Error::last_os_error()),
        });
    }

    NonNull::new(ptr as *mut u8).ok_or_else(|| SharedMemoryError::MapFailed {
        reason: "mmap returned a null mapping".to_string(),
    })
}

/// Zero-initialized, 8-byte aligned heap region.
///
/// Share one between a producer ring and a consumer ring with `Arc<HeapRegion>`.
pub struct HeapRegion {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

// SAFETY: HeapRegion owns its allocation exclusively.
unsafe impl Send for HeapRegion {}

// SAFETY: concurrent access to the bytes is coordinated by the ring buffer's atomics.
unsafe impl Sync for HeapRegion {}

// SAFETY: the allocation is valid for `len` bytes until drop and 8-byte aligned.
unsafe impl Region for HeapRegion {
    fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl HeapRegion {
    const ALIGN: usize = 8;

    /// Allocate `len` zeroed bytes.
    ///
    /// Fails when `len` rounded up to the alignment overflows `isize`.
    pub fn new(len: usize) -> Result<Self, LayoutError> {
        let layout = Layout::from_size_align(len.max(Self::ALIGN), Self::ALIGN)
            .map_err(|_| LayoutError::RegionTooLarge { len })?;

        // SAFETY: layout has non-zero size
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = match NonNull::new(raw) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(layout),
        };

        Ok(Self { ptr, len, layout })
    }

    /// Allocate a region sized for a ring with the given data capacity.
    pub fn for_capacity(capacity: u32) -> Result<Self, LayoutError> {
        Self::new(HEADER_SIZE + capacity as usize)
    }
}

impl Drop for HeapRegion {
    fn drop(&mut self) {
        // SAFETY: ptr was allocated with exactly this layout
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}
