// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// A multi-producer/multi-consumer inter-process message queue whose
// payloads travel through shared-memory blocks rather than a kernel pipe.
// Built on the same pure-Rust shared memory and named mutex primitives this
// crate also exposes directly.

pub mod shm_name;

mod platform;

mod shm;
pub use shm::{ShmHandle, ShmOpenMode};

mod mutex;
pub use mutex::IpcMutex;

mod scoped_access;
pub use scoped_access::ScopedAccess;

mod spin_lock;
pub use spin_lock::SpinLock;

mod checksum;
pub use checksum::adler32;

mod error;
pub use error::QueueError;

mod serializer;
pub use serializer::{BincodeSerializer, Serializer};

mod config;
pub use config::QueueConfig;

mod block;
mod diagnostics;
mod gate;
mod ids;
mod pool;

mod handle;
pub use handle::QueueHandle;

mod queue;
pub use queue::ShmQueue;
