//! Unique Ids - Process-Wide Identifier Generation
//!
//! Every graph node and every variable is tagged with an id that never
//! repeats within a process. Sessions key their variables by these ids and
//! save files record them.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use std::sync::atomic::{AtomicU64, Ordering};

static UID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generates a new unique id.
#[must_use]
pub fn generate_uid() -> u64 {
    UID_COUNTER.fetch_add(1, Ordering::Relaxed)
}
