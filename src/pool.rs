// The block pool: a fixed-count array of shared blocks, each its own named
// shared-memory segment paired 1:1 with its own named mutex (the per-block
// lock), accessed through `ScopedAccess` — the same shm+mutex pairing this
// codebase already uses elsewhere for guarded shared buffers. One block per
// segment (rather than one large segment sliced by index) lets each
// per-block lock be acquired and released independently without any
// bookkeeping beyond the index, and keeps the per-block critical section
// short: all metadata reads/writes and the payload copy for a single chunk
// occur under one acquisition.

use std::io;

use crate::block::META_BLOCK_SIZE;
use crate::mutex::IpcMutex;
use crate::scoped_access::ScopedAccess;
use crate::shm::{ShmHandle, ShmOpenMode};

fn block_segment_name(prefix: &str, idx: usize) -> String {
    format!("{prefix}_BLK_{idx}")
}

fn block_lock_name(prefix: &str, idx: usize) -> String {
    format!("{prefix}_BLKLOCK_{idx}")
}

/// The pool's storage: `maxsize` blocks of `META_BLOCK_SIZE + chunk_size`
/// bytes each, plus the per-block locks that guard them.
pub struct BlockPool {
    prefix: String,
    chunk_size: usize,
    blocks: Vec<(ShmHandle, IpcMutex)>,
}

impl BlockPool {
    /// Bytes occupied by one block: metadata header plus payload.
    pub fn block_stride(chunk_size: usize) -> usize {
        META_BLOCK_SIZE + chunk_size
    }

    /// Open (or create) all `maxsize` block segments and locks under `prefix`.
    pub fn open(
        prefix: &str,
        maxsize: usize,
        chunk_size: usize,
        mode: ShmOpenMode,
    ) -> io::Result<Self> {
        let stride = Self::block_stride(chunk_size);
        let mut blocks = Vec::with_capacity(maxsize);
        for idx in 0..maxsize {
            let shm = ShmHandle::acquire(&block_segment_name(prefix, idx), stride, mode)?;
            let mtx = IpcMutex::open(&block_lock_name(prefix, idx))?;
            blocks.push((shm, mtx));
        }
        Ok(Self {
            prefix: prefix.to_string(),
            chunk_size,
            blocks,
        })
    }

    pub fn maxsize(&self) -> usize {
        self.blocks.len()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Lock block `idx` and run `f` with exclusive access to its raw bytes
    /// (metadata header followed by payload). A block's metadata and
    /// payload are only ever read or written under that block's lock.
    pub fn with_block<R>(&self, idx: usize, f: impl FnOnce(&mut [u8]) -> R) -> io::Result<R> {
        let (shm, mtx) = &self.blocks[idx];
        let guard = ScopedAccess::new(shm, mtx)?;
        let len = Self::block_stride(self.chunk_size);
        let slice = unsafe { std::slice::from_raw_parts_mut(guard.as_mut_ptr(), len) };
        Ok(f(slice))
    }

    /// Release every segment and lock this pool owns, regardless of whether
    /// other processes still hold a mapping: the owner unlinks
    /// unconditionally, and late peers simply observe the removal.
    pub fn destroy(&self) {
        for idx in 0..self.blocks.len() {
            ShmHandle::clear_storage(&block_segment_name(&self.prefix, idx));
            IpcMutex::clear_storage(&block_lock_name(&self.prefix, idx));
        }
    }
}
