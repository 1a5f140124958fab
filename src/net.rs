//! Protocol client for the remote JBOD service.
//!
//! One connection, one request in flight, one matching response. Every
//! stream transfer is driven to completion: short reads and writes resume
//! where they stopped and interrupted calls are retried. End of stream
//! before the requested length is a hard failure, never a short success.
//! Nothing above the system-call level is ever retried; a failed operation
//! is surfaced to the caller unchanged.

use super::*;
use proto::{command_of, Command, PacketHeader, INFO_BLOCK, INFO_ERROR};

use std::io::{self, Read, Write};
use std::net::TcpStream;

use log::{debug, trace};

pub struct JbodClient<S> {
    stream: S,
}

impl JbodClient<TcpStream> {
    /// Opens a TCP connection to a JBOD server.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        debug!("connected to jbod server at {host}:{port}");
        Ok(Self { stream })
    }
}

impl<S: Read + Write> JbodClient<S> {
    /// Wraps an already connected byte stream.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Gives the stream back, ending the session.
    pub fn into_stream(self) -> S {
        self.stream
    }

    /// One blocking round trip: sends the request, reads the matching
    /// response. A response payload is copied into `block` before the error
    /// bit is evaluated. The echoed opcode must equal the sent one.
    pub fn operation(&mut self, op: u32, mut block: Option<&mut [u8; BLOCK_SIZE]>) -> Result<()> {
        let cmd = command_of(op)?;
        self.send_packet(op, cmd, block.as_deref())?;

        let mut payload = [0u8; BLOCK_SIZE];
        let header = self.recv_packet(&mut payload)?;
        if header.opcode != op {
            return Err(Error::OpcodeMismatch {
                sent: op,
                received: header.opcode,
            });
        }
        if header.info & INFO_BLOCK != 0 {
            if let Some(out) = block.as_deref_mut() {
                out.copy_from_slice(&payload);
            }
        }
        if header.info & INFO_ERROR != 0 {
            return Err(Error::RemoteFailure(op));
        }
        Ok(())
    }

    /// A block payload follows the header only for write-block requests; a
    /// write-block request without one is malformed.
    fn send_packet(&mut self, op: u32, cmd: Command, block: Option<&[u8; BLOCK_SIZE]>) -> Result<()> {
        let writes_block = cmd == Command::WriteBlock;
        if writes_block && block.is_none() {
            return Err(Error::BadOpcode(op));
        }
        let header = PacketHeader {
            opcode: op,
            info: if writes_block { INFO_BLOCK } else { 0 },
        };
        write_full(&mut self.stream, &header.encode()?)?;
        if writes_block {
            if let Some(payload) = block {
                write_full(&mut self.stream, payload)?;
            }
        }
        trace!("-> op {op:#010x}");
        Ok(())
    }

    fn recv_packet(&mut self, block: &mut [u8; BLOCK_SIZE]) -> Result<PacketHeader> {
        let mut raw = [0u8; HEADER_LEN];
        read_full(&mut self.stream, &mut raw)?;
        let header = PacketHeader::decode(&raw)?;
        if header.info & INFO_BLOCK != 0 {
            read_full(&mut self.stream, block)?;
        }
        trace!("<- op {:#010x} info {:#04x}", header.opcode, header.info);
        Ok(header)
    }
}

/// Reads exactly `buf.len()` bytes. Interrupted calls are retried and short
/// reads resumed; end of stream first is `UnexpectedEof`.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream closed mid-frame",
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(())
}

/// Writes all of `buf`, retrying interruption and resuming short writes.
fn write_full<W: Write>(w: &mut W, buf: &[u8]) -> Result<()> {
    let mut sent = 0;
    while sent < buf.len() {
        match w.write(&buf[sent..]) {
            Ok(0) => {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "stream refused further bytes",
                )))
            }
            Ok(n) => sent += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(())
}
