// State handed to child processes: an explicit handle bundle carrying
// everything a child needs to reopen the same named segments and locks,
// passed over whatever bootstrap channel the host process model uses
// (command-line, environment, ancestor pipe — out of scope for this crate,
// which only defines the bundle's shape).
//
// Segment and lock names are not enumerated in the bundle: they are
// deterministic functions of `name` and a block index (see `pool.rs`'s
// `block_segment_name`/`block_lock_name`), so the bundle only needs to carry
// the shared prefix plus the two sizing parameters. Per-process state — the
// `msg_id` counter, the watermark — is never part of the bundle and resets
// in the child.

use serde::{Deserialize, Serialize};

use crate::config::QueueConfig;

/// A serializable bundle identifying a [`crate::ShmQueue`]'s shared state,
/// reopenable by any process that receives it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueHandle {
    pub name: String,
    pub chunk_size: usize,
    pub maxsize: usize,
    pub integrity_check: bool,
    pub deadlock_immanent_check: bool,
}

impl QueueHandle {
    pub fn new(name: &str, config: &QueueConfig) -> Self {
        Self {
            name: name.to_string(),
            chunk_size: config.chunk_size(),
            maxsize: config.maxsize(),
            integrity_check: config.integrity_check(),
            deadlock_immanent_check: config.deadlock_immanent_check(),
        }
    }

    /// Reconstruct the (non-diagnostic) construction parameters this bundle
    /// was built from. `deadlock_check`/`watermark_check`/`verbose` are
    /// per-process diagnostic knobs, not part of the shared state, and take
    /// their defaults in the child.
    pub fn config(&self) -> QueueConfig {
        QueueConfig::new(self.chunk_size, self.maxsize)
            .with_integrity_check(self.integrity_check)
            .with_deadlock_immanent_check(self.deadlock_immanent_check)
    }
}
