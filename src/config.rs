// Construction parameters, carried as plain, cheap-to-copy data validated
// once at construction rather than at every call site, in the same spirit
// as this codebase's sibling `Config` types.

use crate::block::MAX_CHUNK_SIZE;

/// Default payload bytes per block: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Default block count.
pub const DEFAULT_MAXSIZE: usize = 2;

/// Construction parameters for a [`crate::ShmQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    chunk_size: usize,
    maxsize: usize,
    integrity_check: bool,
    deadlock_immanent_check: bool,
    deadlock_check: bool,
    watermark_check: bool,
    verbose: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            maxsize: DEFAULT_MAXSIZE,
            integrity_check: true,
            deadlock_immanent_check: true,
            deadlock_check: false,
            watermark_check: false,
            verbose: false,
        }
    }
}

impl QueueConfig {
    /// Build a config for `maxsize` blocks of `chunk_size` payload bytes
    /// each. `chunk_size <= 0` means "use the maximum"; values above
    /// `MAX_CHUNK_SIZE` are clamped down, not rejected. `maxsize` is floored
    /// at 1 (a zero-block pool could never hold even an empty message).
    pub fn new(chunk_size: usize, maxsize: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            MAX_CHUNK_SIZE
        } else {
            chunk_size.min(MAX_CHUNK_SIZE)
        };
        Self {
            chunk_size,
            maxsize: maxsize.max(1),
            ..Self::default()
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn maxsize(&self) -> usize {
        self.maxsize
    }

    pub fn integrity_check(&self) -> bool {
        self.integrity_check
    }

    pub fn deadlock_immanent_check(&self) -> bool {
        self.deadlock_immanent_check
    }

    pub fn deadlock_check(&self) -> bool {
        self.deadlock_check
    }

    pub fn watermark_check(&self) -> bool {
        self.watermark_check
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn with_integrity_check(mut self, enabled: bool) -> Self {
        self.integrity_check = enabled;
        self
    }

    pub fn with_deadlock_immanent_check(mut self, enabled: bool) -> Self {
        self.deadlock_immanent_check = enabled;
        self
    }

    pub fn with_deadlock_check(mut self, enabled: bool) -> Self {
        self.deadlock_check = enabled;
        self
    }

    pub fn with_watermark_check(mut self, enabled: bool) -> Self {
        self.watermark_check = enabled;
        self
    }

    pub fn with_verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }
}
