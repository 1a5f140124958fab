//! Opcode packing and the wire header shared by requests and responses.
//!
//! An opcode carries the command selector in the bits above the operand
//! field: `command << 12`, disk index in bits 0..4, block index in bits
//! 4..12. The 5-byte header is the opcode in big-endian followed by one info
//! byte; bit 0 of the info byte flags a remote error (responses only), bit 1
//! flags that a block payload follows the header.

use super::*;

use bincode::Options;
use serde::{Deserialize, Serialize};

/// response info bit: the remote reports an error
pub const INFO_ERROR: u8 = 0x01;

/// info bit: a block payload follows the header
pub const INFO_BLOCK: u8 = 0x02;

/// command selector sits above the operand bits
const COMMAND_SHIFT: u32 = 12;

/// block index sits above the disk bits
const BLOCK_SHIFT: u32 = 4;

/// Command selector carried in the high bits of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Command {
    Mount = 0,
    Unmount = 1,
    SeekToDisk = 2,
    SeekToBlock = 3,
    ReadBlock = 4,
    WriteBlock = 5,
    WritePermission = 6,
    RevokeWritePermission = 7,
}

/// Packs a command and its operands into a wire opcode. Commands without
/// operands pass zeroes.
pub fn pack(cmd: Command, disk: u32, block: u32) -> u32 {
    ((cmd as u32) << COMMAND_SHIFT) | (block << BLOCK_SHIFT) | disk
}

/// Recovers the command selector from an opcode.
pub fn command_of(op: u32) -> Result<Command> {
    match op >> COMMAND_SHIFT {
        0 => Ok(Command::Mount),
        1 => Ok(Command::Unmount),
        2 => Ok(Command::SeekToDisk),
        3 => Ok(Command::SeekToBlock),
        4 => Ok(Command::ReadBlock),
        5 => Ok(Command::WriteBlock),
        6 => Ok(Command::WritePermission),
        7 => Ok(Command::RevokeWritePermission),
        _ => Err(Error::BadOpcode(op)),
    }
}

/// Wire header, identical for both directions.
#[repr(C)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PacketHeader {
    pub opcode: u32,
    pub info: u8,
}

/// Big-endian fixed-width integers: the header serializes to exactly
/// [`HEADER_LEN`] bytes.
fn codec() -> impl Options {
    bincode::options().with_big_endian().with_fixint_encoding()
}

impl PacketHeader {
    pub fn encode(&self) -> Result<[u8; HEADER_LEN]> {
        let mut raw = [0u8; HEADER_LEN];
        codec().serialize_into(&mut raw[..], self)?;
        Ok(raw)
    }

    pub fn decode(raw: &[u8; HEADER_LEN]) -> Result<Self> {
        Ok(codec().deserialize(&raw[..])?)
    }
}
