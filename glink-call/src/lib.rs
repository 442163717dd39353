//! GuardianLink call signaling
//!
//! Mesh call coordination over a watchable document store: presence docs,
//! one shared connection record per participant pair with deterministic
//! offerer/answerer roles, trickled ICE candidate lanes, and
//! last-participant-out cleanup. Media capture and the actual transport sit
//! behind traits so hosts plug in their own stacks.
//!
//! Call eligibility (which meetings may be joined) lives in `glink-common`;
//! this crate only runs the signaling once a session id is in hand.

pub mod coordinator;
pub mod error;
pub mod media;
pub mod pair;
pub mod signal;

pub use coordinator::{CallCoordinator, CallIdentity};
pub use error::{CallError, Result};
pub use pair::{pair_role, PairKey, PairRole};
