// ============================================================================
// CPU Affinity
// Keeps the matching thread on one core so its book stays cache-hot
// ============================================================================

/// Pin the current thread to a specific CPU core.
///
/// # Returns
/// * `true` if pinning succeeded
/// * `false` if the core doesn't exist or pinning failed
#[cfg(feature = "numa")]
pub fn pin_current_thread_to_core(core_id: usize) -> bool {
    let core_ids = core_affinity::get_core_ids().unwrap_or_default();

    core_ids
        .into_iter()
        .find(|id| id.id == core_id)
        .map(core_affinity::set_for_current)
        .unwrap_or(false)
}

/// Get all available core IDs on this system.
#[cfg(feature = "numa")]
pub fn get_available_cores() -> Vec<usize> {
    core_affinity::get_core_ids()
        .unwrap_or_default()
        .into_iter()
        .map(|id| id.id)
        .collect()
}

// ============================================================================
// Stub implementations when numa feature is disabled
// ============================================================================

/// Pin the current thread to a specific CPU core.
///
/// **Note:** This is a no-op stub. Enable the `numa` feature for actual CPU pinning.
#[cfg(not(feature = "numa"))]
pub fn pin_current_thread_to_core(_core_id: usize) -> bool {
    false
}

/// Get all available core IDs on this system.
///
/// **Note:** This is a stub. Enable the `numa` feature for actual core detection.
#[cfg(not(feature = "numa"))]
pub fn get_available_cores() -> Vec<usize> {
    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    (0..num_cpus).collect()
}
