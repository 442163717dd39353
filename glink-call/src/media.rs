//! Media and peer-connection seams
//!
//! The coordinator drives negotiation through these traits rather than a
//! concrete WebRTC stack, so the transport can be swapped (or mocked) while
//! the signaling protocol stays fixed.

use crate::signal::{IceCandidateDoc, SessionDesc};
use crate::Result;
use futures::stream::BoxStream;
use std::future::Future;

/// Connection lifecycle as reported by the underlying transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Handle to acquired local capture media. Stopped when the holder leaves
/// the call.
pub trait LocalMedia: Send + 'static {
    fn stop(&mut self);
}

/// Capture device access. Acquisition failures are classified by cause:
/// [`crate::CallError::MediaPermissionDenied`] when the user refused,
/// [`crate::CallError::MediaUnavailable`] when no device exists, and
/// [`crate::CallError::Media`] for anything else. A failure aborts the join
/// for this user only; other participants are unaffected.
pub trait MediaDevices: Send + Sync + 'static {
    type Media: LocalMedia;

    fn acquire(&self) -> impl Future<Output = Result<Self::Media>> + Send;
}

/// One transport connection to a single remote participant.
///
/// The coordinator guarantees `set_remote_description` is called at most
/// once per connection; candidates may be added before or after the remote
/// description and the implementation must accept either order.
pub trait PeerConnection: Send + Sync + 'static {
    fn create_offer(&self) -> impl Future<Output = Result<SessionDesc>> + Send;

    fn create_answer(&self) -> impl Future<Output = Result<SessionDesc>> + Send;

    fn set_remote_description(&self, desc: SessionDesc) -> impl Future<Output = Result<()>> + Send;

    fn add_ice_candidate(&self, candidate: IceCandidateDoc)
        -> impl Future<Output = Result<()>> + Send;

    /// Locally gathered candidates, for trickling to the remote side.
    fn local_candidates(&self) -> BoxStream<'static, IceCandidateDoc>;

    /// Connection state transitions.
    fn states(&self) -> BoxStream<'static, PeerState>;

    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Creates one [`PeerConnection`] per remote participant.
pub trait PeerFactory: Send + Sync + 'static {
    type Peer: PeerConnection;

    fn create_peer(&self, ice_servers: &[String]) -> impl Future<Output = Result<Self::Peer>> + Send;
}
