//! Linear volume over the remote disk array.
//!
//! Translates arbitrary byte ranges into per-disk, per-block remote
//! operations, holds the mount and write-permission flags, and keeps the
//! block cache consistent with remote state. Validation and state errors are
//! raised before any remote traffic; once a block operation fails, the whole
//! call fails as a unit.

use super::*;
use proto::{pack, Command};

use std::io::{Read, Write};

use log::{debug, warn};

pub struct Volume<S> {
    client: JbodClient<S>,
    cache: Option<BlockCache>,
    mounted: bool,
    writable: bool,
}

/// Splits a byte address into (disk, block, offset-in-block).
fn locate(addr: u32) -> (u32, u32, usize) {
    let addr = addr as usize;
    let disk = addr / DISK_SIZE;
    let block = (addr / BLOCK_SIZE) % BLOCKS_PER_DISK;
    (disk as u32, block as u32, addr % BLOCK_SIZE)
}

impl<S: Read + Write> Volume<S> {
    pub fn new(client: JbodClient<S>) -> Self {
        Volume {
            client,
            cache: None,
            mounted: false,
            writable: false,
        }
    }

    /// At most one cache per volume; detach the old one first.
    pub fn attach_cache(&mut self, capacity: usize) -> Result<()> {
        if self.cache.is_some() {
            return Err(Error::CacheExists);
        }
        self.cache = Some(BlockCache::new(capacity)?);
        debug!("attached a {capacity}-entry block cache");
        Ok(())
    }

    pub fn detach_cache(&mut self) -> Result<BlockCache> {
        self.cache.take().ok_or(Error::NoCache)
    }

    pub fn cache(&self) -> Option<&BlockCache> {
        self.cache.as_ref()
    }

    pub fn cache_mut(&mut self) -> Option<&mut BlockCache> {
        self.cache.as_mut()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn mount(&mut self) -> Result<()> {
        if self.mounted {
            return Err(Error::AlreadyMounted);
        }
        self.client.operation(pack(Command::Mount, 0, 0), None)?;
        self.mounted = true;
        debug!("volume mounted");
        Ok(())
    }

    pub fn unmount(&mut self) -> Result<()> {
        if !self.mounted {
            return Err(Error::NotMounted);
        }
        self.client.operation(pack(Command::Unmount, 0, 0), None)?;
        self.mounted = false;
        debug!("volume unmounted");
        Ok(())
    }

    /// Write permission is independent of the mount state; granting and
    /// revoking both work on an unmounted volume.
    pub fn grant_write(&mut self) -> Result<()> {
        self.client
            .operation(pack(Command::WritePermission, 0, 0), None)?;
        self.writable = true;
        Ok(())
    }

    pub fn revoke_write(&mut self) -> Result<()> {
        self.client
            .operation(pack(Command::RevokeWritePermission, 0, 0), None)?;
        self.writable = false;
        Ok(())
    }

    /// Reads `buf.len()` bytes starting at byte address `addr`. Blocks come
    /// from the cache when resident, otherwise from the remote array (and
    /// are then cached best-effort). Returns the byte count, which equals
    /// `buf.len()` on success.
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<usize> {
        if !self.mounted {
            return Err(Error::NotMounted);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let len = buf.len();
        if addr as u64 + len as u64 > TOTAL_SIZE as u64 {
            return Err(Error::OutOfRange);
        }
        if len > MAX_IO_LEN {
            return Err(Error::RequestTooLarge(len));
        }

        let mut copied = 0;
        while copied < len {
            let (disk, block, offset) = locate(addr + copied as u32);
            let take = (BLOCK_SIZE - offset).min(len - copied);

            let content = match self.cache.as_mut().and_then(|c| c.lookup(disk, block)) {
                Some(content) => content,
                None => {
                    let content = self.fetch_block(disk, block)?;
                    if let Some(cache) = &mut self.cache {
                        if let Err(e) = cache.insert(disk, block, &content) {
                            warn!("cache insert failed for disk {disk} block {block}: {e}");
                        }
                    }
                    content
                }
            };
            buf[copied..copied + take].copy_from_slice(&content[offset..offset + take]);
            copied += take;
        }
        Ok(len)
    }

    /// Writes `buf.len()` bytes starting at byte address `addr`. A block not
    /// fully covered by the range is read first so the surrounding bytes
    /// survive the merge. Resident cache entries are updated after the
    /// remote write; nothing new is inserted on this path.
    pub fn write(&mut self, addr: u32, buf: &[u8]) -> Result<usize> {
        if !self.mounted {
            return Err(Error::NotMounted);
        }
        if !self.writable {
            return Err(Error::WriteProtected);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let len = buf.len();
        if addr as u64 + len as u64 > TOTAL_SIZE as u64 {
            return Err(Error::OutOfRange);
        }
        if len > MAX_IO_LEN {
            return Err(Error::RequestTooLarge(len));
        }

        let mut written = 0;
        while written < len {
            let (disk, block, offset) = locate(addr + written as u32);
            let take = (BLOCK_SIZE - offset).min(len - written);

            let mut content = match self.cache.as_mut().and_then(|c| c.lookup(disk, block)) {
                Some(content) => content,
                None => self.fetch_block(disk, block)?,
            };
            content[offset..offset + take].copy_from_slice(&buf[written..written + take]);
            self.store_block(disk, block, &mut content)?;
            if let Some(cache) = &mut self.cache {
                cache.update(disk, block, &content);
            }
            written += take;
        }
        Ok(len)
    }

    /// seek-to-disk, seek-to-block, read-block
    fn fetch_block(&mut self, disk: u32, block: u32) -> Result<[u8; BLOCK_SIZE]> {
        self.seek(disk, block)?;
        let mut content = [0u8; BLOCK_SIZE];
        self.client
            .operation(pack(Command::ReadBlock, 0, 0), Some(&mut content))?;
        Ok(content)
    }

    /// seek-to-disk, seek-to-block, write-block
    fn store_block(&mut self, disk: u32, block: u32, content: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        self.seek(disk, block)?;
        self.client
            .operation(pack(Command::WriteBlock, 0, 0), Some(content))
    }

    fn seek(&mut self, disk: u32, block: u32) -> Result<()> {
        self.client
            .operation(pack(Command::SeekToDisk, disk, 0), None)?;
        self.client
            .operation(pack(Command::SeekToBlock, 0, block), None)
    }
}
