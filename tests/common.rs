//! Shared fixtures: an in-memory JBOD server that speaks the real wire
//! format over `Read + Write`, plus stream wrappers that inject the failure
//! modes the client has to survive.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::rc::Rc;

use jbod_volume::{BLOCKS_PER_DISK, BLOCK_SIZE, DISK_SIZE, HEADER_LEN, NUM_DISKS};

const INFO_ERROR: u8 = 0x01;
const INFO_BLOCK: u8 = 0x02;

const CMD_MOUNT: u32 = 0;
const CMD_UNMOUNT: u32 = 1;
const CMD_SEEK_TO_DISK: u32 = 2;
const CMD_SEEK_TO_BLOCK: u32 = 3;
const CMD_READ_BLOCK: u32 = 4;
const CMD_WRITE_BLOCK: u32 = 5;
const CMD_WRITE_PERMISSION: u32 = 6;
const CMD_REVOKE_WRITE_PERMISSION: u32 = 7;

/// Server side of the wire protocol, decoded independently of the library
/// under test. Disk contents persist for the lifetime of the value, across
/// mount cycles.
pub struct FakeJbod {
    disks: Vec<Vec<u8>>,
    mounted: bool,
    writable: bool,
    cur_disk: usize,
    cur_block: usize,
    requests: usize,
    inbox: Vec<u8>,
    outbox: VecDeque<u8>,
}

impl FakeJbod {
    fn new() -> Self {
        FakeJbod {
            disks: vec![vec![0u8; DISK_SIZE]; NUM_DISKS],
            mounted: false,
            writable: false,
            cur_disk: 0,
            cur_block: 0,
            requests: 0,
            inbox: Vec::new(),
            outbox: VecDeque::new(),
        }
    }

    /// Consumes complete request frames from the inbox and queues responses.
    fn pump(&mut self) {
        loop {
            if self.inbox.len() < HEADER_LEN {
                return;
            }
            let op = u32::from_be_bytes(self.inbox[..4].try_into().unwrap());
            let cmd = op >> 12;
            let frame = if cmd == CMD_WRITE_BLOCK {
                HEADER_LEN + BLOCK_SIZE
            } else {
                HEADER_LEN
            };
            if self.inbox.len() < frame {
                return;
            }
            let payload = self.inbox[HEADER_LEN..frame].to_vec();
            self.inbox.drain(..frame);
            self.requests += 1;
            self.handle(op, cmd, &payload);
        }
    }

    fn handle(&mut self, op: u32, cmd: u32, payload: &[u8]) {
        let mut err = false;
        let mut block: Option<Vec<u8>> = None;

        match cmd {
            CMD_MOUNT => {
                if self.mounted {
                    err = true;
                } else {
                    self.mounted = true;
                }
            }
            CMD_UNMOUNT => {
                if !self.mounted {
                    err = true;
                } else {
                    self.mounted = false;
                }
            }
            CMD_WRITE_PERMISSION => self.writable = true,
            CMD_REVOKE_WRITE_PERMISSION => self.writable = false,
            CMD_SEEK_TO_DISK => {
                let disk = (op & 0xfff) as usize;
                if !self.mounted || disk >= NUM_DISKS {
                    err = true;
                } else {
                    self.cur_disk = disk;
                }
            }
            CMD_SEEK_TO_BLOCK => {
                let blk = ((op >> 4) & 0xff) as usize;
                if !self.mounted {
                    err = true;
                } else {
                    self.cur_block = blk;
                }
            }
            CMD_READ_BLOCK => {
                if !self.mounted {
                    err = true;
                } else {
                    let start = self.cur_block * BLOCK_SIZE;
                    block = Some(self.disks[self.cur_disk][start..start + BLOCK_SIZE].to_vec());
                    self.advance();
                }
            }
            CMD_WRITE_BLOCK => {
                if !self.mounted || !self.writable {
                    err = true;
                } else {
                    let start = self.cur_block * BLOCK_SIZE;
                    self.disks[self.cur_disk][start..start + BLOCK_SIZE].copy_from_slice(payload);
                    self.advance();
                }
            }
            _ => err = true,
        }

        let mut info = 0u8;
        if err {
            info |= INFO_ERROR;
        }
        if block.is_some() {
            info |= INFO_BLOCK;
        }
        self.outbox.extend(op.to_be_bytes());
        self.outbox.push_back(info);
        if let Some(b) = block {
            self.outbox.extend(b);
        }
    }

    // the block pointer advances after each transfer
    fn advance(&mut self) {
        self.cur_block = (self.cur_block + 1) % BLOCKS_PER_DISK;
    }
}

/// Cloneable handle implementing `Read + Write`; clones share one server, so
/// tests can keep a handle to inspect or corrupt the disks behind the
/// client's back.
#[derive(Clone)]
pub struct FakeStream(Rc<RefCell<FakeJbod>>);

pub fn fake_server() -> FakeStream {
    FakeStream(Rc::new(RefCell::new(FakeJbod::new())))
}

impl FakeStream {
    pub fn requests(&self) -> usize {
        self.0.borrow().requests
    }

    pub fn block_contents(&self, disk: usize, block: usize) -> Vec<u8> {
        let inner = self.0.borrow();
        inner.disks[disk][block * BLOCK_SIZE..(block + 1) * BLOCK_SIZE].to_vec()
    }

    /// Overwrites a block on the remote side without going through the wire.
    pub fn fill_block(&self, disk: usize, block: usize, byte: u8) {
        let mut inner = self.0.borrow_mut();
        inner.disks[disk][block * BLOCK_SIZE..(block + 1) * BLOCK_SIZE].fill(byte);
    }
}

impl Read for FakeStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.0.borrow_mut();
        let n = buf.len().min(inner.outbox.len());
        for slot in buf[..n].iter_mut() {
            *slot = inner.outbox.pop_front().unwrap();
        }
        Ok(n)
    }
}

impl Write for FakeStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.0.borrow_mut();
        inner.inbox.extend_from_slice(buf);
        inner.pump();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Interrupts every other call and moves one byte at a time in both
/// directions; the client's full-I/O loops have to absorb all of it.
pub struct InterruptingStream<S> {
    inner: S,
    read_tick: bool,
    write_tick: bool,
}

impl<S> InterruptingStream<S> {
    pub fn new(inner: S) -> Self {
        InterruptingStream {
            inner,
            read_tick: false,
            write_tick: false,
        }
    }
}

impl<S: Read> Read for InterruptingStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.read_tick {
            self.read_tick = true;
            return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
        }
        self.read_tick = false;
        let take = buf.len().min(1);
        self.inner.read(&mut buf[..take])
    }
}

impl<S: Write> Write for InterruptingStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.write_tick {
            self.write_tick = true;
            return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
        }
        self.write_tick = false;
        self.inner.write(&buf[..buf.len().min(1)])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Replays a canned response and records everything the client sends.
pub struct ScriptedStream {
    reply: io::Cursor<Vec<u8>>,
    pub sent: Vec<u8>,
}

impl ScriptedStream {
    pub fn new(reply: Vec<u8>) -> Self {
        ScriptedStream {
            reply: io::Cursor::new(reply),
            sent: Vec::new(),
        }
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reply.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sent.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
