// Gate acquisition helper shared by the Producer Gate and Consumer Gate: a
// single cross-process mutex, acquired blocking-with-timeout or
// non-blocking depending on the caller's `block` flag.

use std::io;
use std::time::Instant;

use crate::mutex::IpcMutex;

/// Acquire `gate`, honoring `block`/`deadline` the way `publish`/`consume`'s
/// `block`/`timeout` parameters are defined. Returns `Ok(false)` on a
/// non-blocking miss or an expired deadline, never blocking past it.
pub fn acquire(gate: &IpcMutex, block: bool, deadline: Option<Instant>) -> io::Result<bool> {
    if !block {
        return gate.try_lock();
    }
    match deadline {
        None => gate.lock().map(|_| true),
        Some(dl) => {
            let remaining = dl.saturating_duration_since(Instant::now());
            gate.lock_timeout(Some(remaining))
        }
    }
}
