use std::fmt;
use std::io;

/// Everything that can go wrong between a caller and the remote array.
/// Variant identity is the contract; payload fields are diagnostic only, and
/// `PartialEq` compares `Io` values by [`io::ErrorKind`].
#[derive(Debug)]
pub enum Error {
    /// cache capacity outside the allowed bounds
    InvalidCacheSize(usize),
    /// a cache is already attached to this volume
    CacheExists,
    /// no cache attached
    NoCache,
    /// the volume is not mounted
    NotMounted,
    /// the volume is already mounted
    AlreadyMounted,
    /// write permission has not been granted
    WriteProtected,
    /// address range falls outside the volume
    OutOfRange,
    /// request longer than the per-call cap
    RequestTooLarge(usize),
    /// (disk, block) outside the array geometry
    TargetOutOfRange { disk: u32, block: u32 },
    /// the cache already holds an entry for this (disk, block)
    DuplicateEntry { disk: u32, block: u32 },
    /// response echoed a different opcode than the request carried
    OpcodeMismatch { sent: u32, received: u32 },
    /// the remote set the error bit in its response
    RemoteFailure(u32),
    /// opcode does not decode to a known command
    BadOpcode(u32),
    /// unrecoverable stream failure
    Io(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCacheSize(n) => write!(f, "cache capacity {n} out of range"),
            Error::CacheExists => write!(f, "a cache is already attached"),
            Error::NoCache => write!(f, "no cache attached"),
            Error::NotMounted => write!(f, "volume is not mounted"),
            Error::AlreadyMounted => write!(f, "volume is already mounted"),
            Error::WriteProtected => write!(f, "write permission not granted"),
            Error::OutOfRange => write!(f, "address range exceeds the volume"),
            Error::RequestTooLarge(n) => {
                write!(f, "request of {n} bytes exceeds the per-call cap")
            }
            Error::TargetOutOfRange { disk, block } => {
                write!(f, "no such block: disk {disk}, block {block}")
            }
            Error::DuplicateEntry { disk, block } => {
                write!(f, "already cached: disk {disk}, block {block}")
            }
            Error::OpcodeMismatch { sent, received } => write!(
                f,
                "response opcode {received:#010x} does not match request {sent:#010x}"
            ),
            Error::RemoteFailure(op) => {
                write!(f, "remote reported failure for opcode {op:#010x}")
            }
            Error::BadOpcode(op) => write!(f, "malformed opcode {op:#010x}"),
            Error::Io(e) => write!(f, "stream failure: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Error::Io(a), Error::Io(b)) => a.kind() == b.kind(),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        match *e {
            bincode::ErrorKind::Io(e) => Error::Io(e),
            other => Error::Io(io::Error::new(io::ErrorKind::InvalidData, other)),
        }
    }
}
