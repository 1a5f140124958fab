//! Linear byte-addressable volume over a networked JBOD disk array.
//!
//! Layers, bottom up:
//! 1. `net`: request/response protocol client over a connected byte stream.
//! 2. `cache`: fixed-capacity block cache with hit/miss accounting.
//! 3. `volume`: mount/permission state and byte-range to block translation.

mod cache;
mod common;
mod error;
mod net;
mod proto;
mod volume;

pub use cache::BlockCache;
pub use common::*;
pub use error::{Error, Result};
pub use net::JbodClient;
pub use proto::{command_of, pack, Command, PacketHeader, INFO_BLOCK, INFO_ERROR};
pub use volume::Volume;
