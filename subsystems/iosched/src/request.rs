//! Block request descriptors and per-request scheduler metadata.

use core::fmt;

use crate::time::Timestamp;

/// Sector size shift (512-byte sectors)
pub const SECTOR_SHIFT: u32 = 9;

/// Sector size in bytes
pub const SECTOR_SIZE: u64 = 1 << SECTOR_SHIFT;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Stable request identifier assigned by the host block layer
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct RequestId(pub u64);

impl RequestId {
    /// Create a new request ID
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get raw value
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rq#{}", self.0)
    }
}

/// Data direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    /// Device to memory
    Read  = 0,
    /// Memory to device
    Write = 1,
}

impl Direction {
    /// Index into per-direction arrays
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Get direction name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

bitflags::bitflags! {
    /// Host-provided request hints
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RequestFlags: u32 {
        /// Caller is waiting synchronously on completion
        const SYNC = 1 << 0;
        /// Elevated-priority metadata I/O
        const PRIO = 1 << 1;
    }
}

// ============================================================================
// REQUEST
// ============================================================================

/// Block request as seen by the scheduler.
///
/// The request itself belongs to the host; the scheduler holds this
/// descriptor while the request is queued and hands it back on dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoRequest {
    /// Host identifier
    pub id: RequestId,
    /// Transfer direction
    pub direction: Direction,
    /// Starting sector
    pub sector: u64,
    /// Length in sectors
    pub nr_sectors: u32,
    /// Hints
    pub flags: RequestFlags,
}

impl IoRequest {
    /// Create new request
    pub const fn new(id: RequestId, direction: Direction, sector: u64, nr_sectors: u32) -> Self {
        Self {
            id,
            direction,
            sector,
            nr_sectors,
            flags: RequestFlags::empty(),
        }
    }

    /// Create a read request
    pub const fn read(id: u64, sector: u64, nr_sectors: u32) -> Self {
        Self::new(RequestId(id), Direction::Read, sector, nr_sectors)
    }

    /// Create a write request
    pub const fn write(id: u64, sector: u64, nr_sectors: u32) -> Self {
        Self::new(RequestId(id), Direction::Write, sector, nr_sectors)
    }

    /// Attach hints
    pub const fn with_flags(mut self, flags: RequestFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Transfer size in bytes
    #[inline]
    pub const fn bytes(&self) -> u64 {
        (self.nr_sectors as u64) << SECTOR_SHIFT
    }

    /// Transfer size in KiB (truncated)
    #[inline]
    pub const fn kb(&self) -> u32 {
        (self.bytes() >> 10) as u32
    }

    /// First sector past the end of the request
    #[inline]
    pub const fn end_sector(&self) -> u64 {
        self.sector + self.nr_sectors as u64
    }

    /// Is read
    #[inline]
    pub fn is_read(&self) -> bool {
        self.direction == Direction::Read
    }

    /// Is write
    #[inline]
    pub fn is_write(&self) -> bool {
        self.direction == Direction::Write
    }
}

// ============================================================================
// CLASSIFICATION & METADATA
// ============================================================================

/// Priority class assigned at admission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum RequestClass {
    /// Very small read, latency critical
    CriticalRead = 0,
    /// Small read
    SmallRead    = 1,
    /// Large read
    LargeRead    = 2,
    /// Ordinary write
    NormalWrite  = 3,
    /// Small write, candidate for coalescing
    TinyWrite    = 4,
}

impl RequestClass {
    /// Number of classes
    pub const COUNT: usize = 5;

    /// Index into per-class tables
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Get class name
    pub fn name(&self) -> &'static str {
        match self {
            Self::CriticalRead => "critical_read",
            Self::SmallRead => "small_read",
            Self::LargeRead => "large_read",
            Self::NormalWrite => "normal_write",
            Self::TinyWrite => "tiny_write",
        }
    }

    /// Is a read class
    pub fn is_read(&self) -> bool {
        matches!(self, Self::CriticalRead | Self::SmallRead | Self::LargeRead)
    }
}

/// Scheduler-private metadata attached at admission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestMeta {
    /// Admission time
    pub enqueue_time: Timestamp,
    /// Class, fixed for the request's lifetime
    pub class: RequestClass,
    /// Held in the coalesce staging area
    pub in_coalesce: bool,
}

impl RequestMeta {
    /// Create metadata for a freshly admitted request
    pub const fn new(enqueue_time: Timestamp, class: RequestClass) -> Self {
        Self {
            enqueue_time,
            class,
            in_coalesce: false,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
