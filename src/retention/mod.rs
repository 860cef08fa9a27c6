//! Time-based retention of stored files.
//!
//! Every stored file is deleted shortly after it outlives the TTL (24 hours
//! by default). Two triggers enforce this:
//!
//! - **One-shot deletion**: registered by acquisition right after a download
//!   completes, fires once at `registration + TTL`.
//! - **Sweep**: runs on every multiple of the sweep interval (the top of the
//!   hour by default) and deletes anything whose mtime is older than the TTL.
//!
//! The two are not ordered against each other; deletion is idempotent, so
//! the later trigger just observes a missing file.

mod scheduler;
mod sweep;

pub use scheduler::{PendingDeletion, RetentionPolicy, RetentionScheduler};
pub use sweep::{
    delay_until_next_boundary, delete_expired, is_expired, sweep_expired, DeletionResult,
    SweepReport,
};
