//! CPU affinity utilities for binding threads to specific cores.
//!
//! The persistence writer is a single long-lived thread; on busy hosts it can
//! be pinned to a dedicated core so producer bursts do not starve it. This
//! module wraps the `core_affinity` crate with a simple API.

use tracing::{info, warn};

/// Bind the current thread to the specified CPU core.
///
/// Returns `true` if the binding succeeded, `false` if the core ID is invalid
/// or the OS rejected the request.
///
/// # Example
///
/// ```ignore
/// std::thread::spawn(move || {
///     dv_core::cpu_affinity::bind_to_core(2);
///     drain_queue();
/// });
/// ```
pub fn bind_to_core(core_id: usize) -> bool {
    let core_ids = core_affinity::get_core_ids().unwrap_or_default();
    if let Some(core) = core_ids.get(core_id) {
        let ok = core_affinity::set_for_current(*core);
        if ok {
            info!("bound thread to CPU core {core_id}");
        } else {
            warn!("failed to bind thread to CPU core {core_id}");
        }
        ok
    } else {
        warn!(
            "CPU core {core_id} not available (system has {} cores)",
            core_ids.len()
        );
        false
    }
}

/// Bind the current thread to the specified core, if `core_id` is `Some`.
///
/// Convenience wrapper that does nothing for `None` (no affinity configured).
pub fn maybe_bind(core_id: Option<i32>) {
    if let Some(id) = core_id.and_then(|id| usize::try_from(id).ok()) {
        bind_to_core(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_core_is_refused() {
        assert!(!bind_to_core(usize::MAX));
    }

    #[test]
    fn negative_or_missing_core_is_ignored() {
        maybe_bind(None);
        maybe_bind(Some(-1));
    }
}
