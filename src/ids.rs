// Message identity: a process-wide monotonic counter rendered as 12 ASCII
// hex characters. A process-wide counter (not per-`ShmQueue` instance) so
// that two queues opened in the same process never mint the same id.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::block::MsgId;

static NEXT_MSG_ID: AtomicU64 = AtomicU64::new(1);

/// Mint a fresh, non-zero 12-byte message id unique within this process.
///
/// The counter is reduced modulo 16^12 so the hex rendering always fits in
/// 12 characters; `(src_pid, msg_id, chunk_id)` is what actually restores
/// global uniqueness across producers.
pub fn next_msg_id() -> MsgId {
    let n = NEXT_MSG_ID.fetch_add(1, Ordering::Relaxed) & 0xFFFF_FFFF_FFFF;
    let hex = format!("{n:012x}");
    let mut id = [0u8; 12];
    id.copy_from_slice(hex.as_bytes());
    id
}

/// The calling process's id, stamped into `src_pid` at reservation time.
pub fn current_pid() -> u32 {
    std::process::id()
}
