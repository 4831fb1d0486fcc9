// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stand-in for a host event loop.

use trellis_core::Reconciler;
use trellis_core::deadline::Deadline;
use trellis_core::error::Result;

use crate::memory_host::{MemoryHost, MemoryHostError};

/// Fires the callbacks [`MemoryHost`] has been asked for until none are
/// pending or `limit` callbacks have run.
///
/// Animation callbacks go first. Each deferred callback gets a fresh
/// deadline from `slice`. Returns the number of callbacks fired.
///
/// # Errors
///
/// Returns the first error a callback reports. Requests made before the
/// failure stay pending.
pub fn run_pending<D: Deadline>(
    reconciler: &mut Reconciler<MemoryHost>,
    limit: u32,
    mut slice: impl FnMut() -> D,
) -> Result<u32, MemoryHostError> {
    let mut fired = 0;
    while fired < limit {
        if reconciler.host_mut().take_animation_request() {
            reconciler.perform_animation_work()?;
        } else if reconciler.host_mut().take_deferred_request() {
            reconciler.perform_deferred_work(&slice())?;
        } else {
            break;
        }
        fired += 1;
    }
    Ok(fired)
}
