//! Live event-stream reconciliation and rendering for planectl.
//!
//! The watch pipeline is: SSE frame decoding ([`sse`]) → typed partial
//! event records ([`event`]) → per-domain reconciliation against keyed
//! posture state ([`reconcile`]) → one rendered line per observable
//! change-set ([`render`]), driven by the cancellable loop in [`watch`].
//!
//! Reconcilers own their state for the lifetime of one watch invocation;
//! nothing here is shared or global. Events are applied strictly in
//! arrival order, so a diff always compares against the state produced by
//! every earlier event.

pub mod error;
pub mod event;
pub mod reconcile;
pub mod render;
pub mod sse;
pub mod watch;

pub use error::WatchError;
pub use reconcile::Reconciler;
pub use watch::{WatchOptions, WatchOutcome, run_watch};
