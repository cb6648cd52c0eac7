// The queue itself: gate-guarded reservation on the producer side,
// gate-guarded head claim plus gather on the consumer side, and the
// integrity layer wired together.

use std::io;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::block::{chunk_count, BlockMeta, MsgId, META_BLOCK_SIZE, RESERVED_CHUNK_ID};
use crate::checksum::adler32;
use crate::config::QueueConfig;
use crate::diagnostics;
use crate::error::QueueError;
use crate::gate;
use crate::handle::QueueHandle;
use crate::ids::{current_pid, next_msg_id};
use crate::mutex::IpcMutex;
use crate::pool::BlockPool;
use crate::serializer::{BincodeSerializer, Serializer};
use crate::shm::ShmOpenMode;

fn producer_gate_name(name: &str) -> String {
    format!("{name}_PGATE")
}

fn consumer_gate_name(name: &str) -> String {
    format!("{name}_CGATE")
}

/// A record of a claimed head chunk, recorded while the consumer gate is
/// still held.
struct HeadInfo {
    index: usize,
    msg_id: MsgId,
    src_pid: u32,
    total_chunks: u32,
}

/// A multi-producer/multi-consumer inter-process queue whose payload bytes
/// travel through shared-memory blocks rather than a kernel pipe. `S` is
/// the object-to-bytes collaborator; it defaults to [`BincodeSerializer`].
pub struct ShmQueue<T, S = BincodeSerializer> {
    name: String,
    config: QueueConfig,
    pool: BlockPool,
    producer_gate: IpcMutex,
    consumer_gate: IpcMutex,
    serializer: S,
    watermark: AtomicUsize,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S> ShmQueue<T, S>
where
    S: Serializer<T>,
{
    /// Open (or create) a queue named `name`, backed by `config.maxsize()`
    /// blocks of `config.chunk_size()` payload bytes each.
    pub fn with_serializer(name: &str, config: QueueConfig, serializer: S) -> io::Result<Self> {
        let pool = BlockPool::open(
            name,
            config.maxsize(),
            config.chunk_size(),
            ShmOpenMode::CreateOrOpen,
        )?;
        let producer_gate = IpcMutex::open(&producer_gate_name(name))?;
        let consumer_gate = IpcMutex::open(&consumer_gate_name(name))?;
        Ok(Self {
            name: name.to_string(),
            config,
            pool,
            producer_gate,
            consumer_gate,
            serializer,
            watermark: AtomicUsize::new(0),
            _marker: PhantomData,
        })
    }

    /// Reopen a queue in a child process from a bundle produced by
    /// [`Self::handle`]. The child supplies its own serializer instance.
    pub fn from_handle_with_serializer(handle: &QueueHandle, serializer: S) -> io::Result<Self> {
        Self::with_serializer(&handle.name, handle.config(), serializer)
    }

    /// The handle bundle a child process can use to reopen this queue.
    pub fn handle(&self) -> QueueHandle {
        QueueHandle::new(&self.name, &self.config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// High-water mark of chunks-per-message observed so far, maintained
    /// only when `watermark_check` is enabled (otherwise always 0).
    pub fn watermark(&self) -> usize {
        self.watermark.load(Ordering::Relaxed)
    }

    /// Always unsupported: these cannot be answered reliably under
    /// concurrent scanning by other producers and consumers.
    pub fn qsize(&self) -> Result<usize, QueueError> {
        Err(QueueError::NotSupported)
    }

    pub fn is_empty(&self) -> Result<bool, QueueError> {
        Err(QueueError::NotSupported)
    }

    pub fn is_full(&self) -> Result<bool, QueueError> {
        Err(QueueError::NotSupported)
    }

    /// Release every shared block, lock, and gate this queue owns, whether
    /// or not other processes still hold a mapping. Safe to call more than
    /// once; the contract is still "owner calls `close` once, after all
    /// peers have finished."
    pub fn close(&self) {
        self.pool.destroy();
        IpcMutex::clear_storage(&producer_gate_name(&self.name));
        IpcMutex::clear_storage(&consumer_gate_name(&self.name));
    }

    // -----------------------------------------------------------------
    // publish
    // -----------------------------------------------------------------

    /// Submit one logical message.
    pub fn publish(
        &self,
        msg: &T,
        block: bool,
        timeout: Option<Duration>,
    ) -> Result<(), QueueError> {
        let bytes = self.serializer.dumps(msg)?;
        let chunk_size = self.pool.chunk_size();
        let total_chunks = chunk_count(bytes.len(), chunk_size);

        if self.config.deadlock_immanent_check() && total_chunks > self.pool.maxsize() {
            return Err(QueueError::CapacityExceeded {
                needed: total_chunks,
                maxsize: self.pool.maxsize(),
            });
        }

        if self.config.watermark_check() {
            let prev = self.watermark.fetch_max(total_chunks, Ordering::Relaxed);
            if total_chunks > prev {
                diagnostics::info_watermark(total_chunks);
            }
        }

        let msg_id = next_msg_id();
        let src_pid = current_pid();
        let deadline = timeout.map(|d| Instant::now() + d);

        if !gate::acquire(&self.producer_gate, block, deadline).map_err(QueueError::Io)? {
            return Err(QueueError::Full);
        }

        let reserved = match self.reserve_blocks(total_chunks, &msg_id, src_pid, block, deadline) {
            Ok(v) => v,
            Err(e) => {
                let _ = self.producer_gate.unlock();
                return Err(e);
            }
        };
        self.producer_gate.unlock().map_err(QueueError::Io)?;

        // Payload copy happens without the gate held: other producers may
        // now be reserving their own blocks concurrently.
        for (i, &idx) in reserved.iter().enumerate() {
            let start = i * chunk_size;
            let end = (start + chunk_size).min(bytes.len());
            let slice = &bytes[start..end];
            let checksum = if self.config.integrity_check() {
                adler32(slice)
            } else {
                0
            };
            let total_msg_size = if self.config.integrity_check() {
                bytes.len() as u32
            } else {
                0
            };

            self.pool
                .with_block(idx, |buf| {
                    let meta = BlockMeta {
                        msg_id,
                        msg_size: slice.len() as u32,
                        chunk_id: (i + 1) as u32,
                        total_chunks: total_chunks as u32,
                        total_msg_size,
                        checksum,
                        src_pid,
                    };
                    meta.write(&mut buf[..META_BLOCK_SIZE]);
                    buf[META_BLOCK_SIZE..META_BLOCK_SIZE + slice.len()].copy_from_slice(slice);
                })
                .map_err(QueueError::Io)?;
        }

        Ok(())
    }

    /// Non-blocking `publish(msg, block=false)`.
    pub fn try_publish(&self, msg: &T) -> Result<(), QueueError> {
        self.publish(msg, false, None)
    }

    /// Reserve `total_chunks` free blocks for `msg_id`, scanning ascending
    /// with wrap-around. On failure to make progress across one full lap,
    /// backs off with [`crate::spin_lock`]'s adaptive yield; on a
    /// non-blocking miss or expired deadline, rolls back everything
    /// reserved so far and raises `Full`.
    fn reserve_blocks(
        &self,
        total_chunks: usize,
        msg_id: &MsgId,
        src_pid: u32,
        block: bool,
        deadline: Option<Instant>,
    ) -> Result<Vec<usize>, QueueError> {
        let maxsize = self.pool.maxsize();
        let mut reserved: Vec<usize> = Vec::with_capacity(total_chunks);
        let mut backoff: u32 = 0;
        let mut stalled_laps: u32 = 0;

        loop {
            let before = reserved.len();

            for idx in 0..maxsize {
                if reserved.len() == total_chunks {
                    break;
                }
                if reserved.contains(&idx) {
                    continue;
                }
                diagnostics::trace_scan("reserve", idx);

                let claimed = self
                    .pool
                    .with_block(idx, |buf| {
                        let meta = BlockMeta::read(&buf[..META_BLOCK_SIZE]);
                        if meta.is_free() {
                            let reserving = BlockMeta {
                                msg_id: *msg_id,
                                src_pid,
                                chunk_id: RESERVED_CHUNK_ID,
                                ..BlockMeta::free()
                            };
                            reserving.write(&mut buf[..META_BLOCK_SIZE]);
                            true
                        } else {
                            false
                        }
                    })
                    .map_err(QueueError::Io)?;

                if claimed {
                    reserved.push(idx);
                    backoff = 0;
                }
            }

            if reserved.len() == total_chunks {
                return Ok(reserved);
            }

            let timed_out = deadline.map(|dl| Instant::now() >= dl).unwrap_or(false);
            if !block || timed_out {
                self.rollback_reservation(&reserved);
                return Err(QueueError::Full);
            }

            if reserved.len() == before {
                stalled_laps += 1;
                if self.config.deadlock_check()
                    && stalled_laps % diagnostics::DEADLOCK_CHECK_THRESHOLD == 0
                {
                    diagnostics::warn_stuck("reserve", stalled_laps);
                }
                crate::spin_lock::adaptive_yield_pub(&mut backoff);
            }
        }
    }

    fn rollback_reservation(&self, reserved: &[usize]) {
        for &idx in reserved {
            let _ = self.pool.with_block(idx, |buf| {
                BlockMeta::free().write(&mut buf[..META_BLOCK_SIZE]);
            });
        }
    }

    // -----------------------------------------------------------------
    // consume
    // -----------------------------------------------------------------

    /// Receive one logical message.
    pub fn consume(&self, block: bool, timeout: Option<Duration>) -> Result<T, QueueError> {
        let deadline = timeout.map(|d| Instant::now() + d);

        if !gate::acquire(&self.consumer_gate, block, deadline).map_err(QueueError::Io)? {
            return Err(QueueError::Empty);
        }

        let head = match self.claim_head(block, deadline) {
            Ok(Some(h)) => h,
            Ok(None) => {
                let _ = self.consumer_gate.unlock();
                return Err(QueueError::Empty);
            }
            Err(e) => {
                let _ = self.consumer_gate.unlock();
                return Err(e);
            }
        };

        // Once the head is claimed, the gather of the remaining chunks is
        // not subject to the caller's timeout.
        let mut indices = vec![0usize; head.total_chunks as usize];
        indices[0] = head.index;
        for k in 2..=head.total_chunks {
            indices[(k - 1) as usize] = self.find_chunk(&head.msg_id, head.src_pid, k);
        }

        self.consumer_gate.unlock().map_err(QueueError::Io)?;

        self.gather(&indices)
    }

    /// Non-blocking `consume(block=false)`.
    pub fn try_consume(&self) -> Result<T, QueueError> {
        self.consume(false, None)
    }

    /// Scan for a head (`msg_id != 0, chunk_id == 1`) and claim it by
    /// rewriting `chunk_id` to the reservation sentinel.
    fn claim_head(
        &self,
        block: bool,
        deadline: Option<Instant>,
    ) -> Result<Option<HeadInfo>, QueueError> {
        let maxsize = self.pool.maxsize();
        let mut backoff: u32 = 0;
        let mut stalled_laps: u32 = 0;

        loop {
            for idx in 0..maxsize {
                diagnostics::trace_scan("claim_head", idx);

                let found = self
                    .pool
                    .with_block(idx, |buf| {
                        let meta = BlockMeta::read(&buf[..META_BLOCK_SIZE]);
                        if meta.is_head() {
                            let mut claimed = meta;
                            claimed.chunk_id = RESERVED_CHUNK_ID;
                            claimed.write(&mut buf[..META_BLOCK_SIZE]);
                            Some(HeadInfo {
                                index: idx,
                                msg_id: meta.msg_id,
                                src_pid: meta.src_pid,
                                total_chunks: meta.total_chunks,
                            })
                        } else {
                            None
                        }
                    })
                    .map_err(QueueError::Io)?;

                if let Some(head) = found {
                    return Ok(Some(head));
                }
            }

            let timed_out = deadline.map(|dl| Instant::now() >= dl).unwrap_or(false);
            if !block || timed_out {
                return Ok(None);
            }

            stalled_laps += 1;
            if self.config.deadlock_check()
                && stalled_laps % diagnostics::DEADLOCK_CHECK_THRESHOLD == 0
            {
                diagnostics::warn_stuck("claim_head", stalled_laps);
            }
            crate::spin_lock::adaptive_yield_pub(&mut backoff);
        }
    }

    /// Scan for the block carrying `(src_pid, msg_id, chunk_id)`. Always
    /// spin-waits: the producer may still be writing this chunk, and the
    /// caller's timeout does not apply once the head has been claimed.
    fn find_chunk(&self, msg_id: &MsgId, src_pid: u32, chunk_id: u32) -> usize {
        let maxsize = self.pool.maxsize();
        let mut backoff: u32 = 0;
        let mut stalled_laps: u32 = 0;

        loop {
            for idx in 0..maxsize {
                diagnostics::trace_scan("gather", idx);
                let matches = self
                    .pool
                    .with_block(idx, |buf| {
                        let meta = BlockMeta::read(&buf[..META_BLOCK_SIZE]);
                        !meta.is_free()
                            && meta.src_pid == src_pid
                            && meta.msg_id == *msg_id
                            && meta.chunk_id == chunk_id
                    })
                    .unwrap_or(false);
                if matches {
                    return idx;
                }
            }

            stalled_laps += 1;
            if self.config.deadlock_check()
                && stalled_laps % diagnostics::DEADLOCK_CHECK_THRESHOLD == 0
            {
                diagnostics::warn_stuck("gather", stalled_laps);
            }
            crate::spin_lock::adaptive_yield_pub(&mut backoff);
        }
    }

    /// Copy every chunk's payload out (releasing its block as it goes),
    /// verify integrity, and deserialize.
    fn gather(&self, indices: &[usize]) -> Result<T, QueueError> {
        let mut assembled: Vec<u8> = Vec::new();
        let mut total_msg_size: u32 = 0;
        let mut integrity_ok = true;

        for (i, &idx) in indices.iter().enumerate() {
            let (chunk_ok, chunk_bytes, recorded_total) = self
                .pool
                .with_block(idx, |buf| {
                    let meta = BlockMeta::read(&buf[..META_BLOCK_SIZE]);
                    let msg_size = meta.msg_size as usize;
                    let payload = &buf[META_BLOCK_SIZE..META_BLOCK_SIZE + msg_size];
                    let ok = !self.config.integrity_check() || adler32(payload) == meta.checksum;
                    let chunk_bytes = payload.to_vec();
                    let recorded_total = meta.total_msg_size;
                    // Every exit path (success, integrity failure,
                    // deserialize failure) releases every held block.
                    BlockMeta::free().write(&mut buf[..META_BLOCK_SIZE]);
                    (ok, chunk_bytes, recorded_total)
                })
                .map_err(QueueError::Io)?;

            if i == 0 {
                total_msg_size = recorded_total;
            }
            integrity_ok &= chunk_ok;
            assembled.extend_from_slice(&chunk_bytes);
        }

        if !integrity_ok {
            return Err(QueueError::IntegrityError(
                "per-chunk checksum mismatch".to_string(),
            ));
        }

        if self.config.integrity_check() && assembled.len() as u32 != total_msg_size {
            return Err(QueueError::IntegrityError(format!(
                "assembled length {} does not match recorded total {total_msg_size}",
                assembled.len(),
            )));
        }

        self.serializer.loads(&assembled)
    }
}

impl<T> ShmQueue<T, BincodeSerializer>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    /// Open (or create) a queue using the default `bincode`-over-`serde`
    /// serializer.
    pub fn new(name: &str, config: QueueConfig) -> io::Result<Self> {
        Self::with_serializer(name, config, BincodeSerializer)
    }

    /// Reopen a queue in a child process using the default serializer.
    pub fn from_handle(handle: &QueueHandle) -> io::Result<Self> {
        Self::with_serializer(&handle.name, handle.config(), BincodeSerializer)
    }
}
