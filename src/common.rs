//! Geometry of the disk array and shared wire constants.

/// bytes per block
pub const BLOCK_SIZE: usize = 256;

/// disks in the array
pub const NUM_DISKS: usize = 16;

/// blocks per disk
pub const BLOCKS_PER_DISK: usize = 256;

/// bytes per disk
pub const DISK_SIZE: usize = BLOCK_SIZE * BLOCKS_PER_DISK;

/// total addressable bytes across the array
pub const TOTAL_SIZE: usize = NUM_DISKS * DISK_SIZE;

/// per-call I/O cap in bytes
pub const MAX_IO_LEN: usize = 1024;

/// wire header: 4-byte big-endian opcode + 1 info byte
pub const HEADER_LEN: usize = 5;

/// smallest allowed cache capacity
pub const MIN_CACHE_ENTRIES: usize = 2;

/// largest allowed cache capacity
pub const MAX_CACHE_ENTRIES: usize = 4096;
