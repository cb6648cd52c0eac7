// Diagnostic logging for the `verbose`, `deadlock_check`, and
// `watermark_check` construction parameters. Built on `tracing` behind the
// optional, non-default `diagnostics` feature; with the feature disabled
// these calls compile away to nothing and the optional dependency itself is
// never pulled in.

/// Spin threshold past which a reservation/gather loop is considered
/// "stuck long enough to be worth a diagnostic warning" when
/// `deadlock_check` is enabled.
pub const DEADLOCK_CHECK_THRESHOLD: u32 = 1000;

#[cfg(feature = "diagnostics")]
pub(crate) fn trace_scan(kind: &str, idx: usize) {
    tracing::trace!(kind, idx, "block scan");
}

#[cfg(not(feature = "diagnostics"))]
pub(crate) fn trace_scan(_kind: &str, _idx: usize) {}

#[cfg(feature = "diagnostics")]
pub(crate) fn warn_stuck(op: &str, spins: u32) {
    tracing::warn!(op, spins, "reservation/gather loop has not progressed in a while");
}

#[cfg(not(feature = "diagnostics"))]
pub(crate) fn warn_stuck(_op: &str, _spins: u32) {}

#[cfg(feature = "diagnostics")]
pub(crate) fn info_watermark(chunks: usize) {
    tracing::info!(chunks, "new per-message chunk-count watermark");
}

#[cfg(not(feature = "diagnostics"))]
pub(crate) fn info_watermark(_chunks: usize) {}
