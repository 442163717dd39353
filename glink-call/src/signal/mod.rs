//! Signaling document shapes and the store abstraction
//!
//! A call session is a tree of small documents: one participant doc per
//! user, one connection doc per unordered participant pair, and two
//! append-only candidate lists per pair (one written by the offerer, one by
//! the answerer). [`SignalStore`] abstracts the document store so the
//! coordinator is independent of the backing transport;
//! [`memory::MemoryStore`] is the in-process implementation.
//!
//! Wire field names are camelCase to match the hosted document schema.

pub mod memory;

use crate::pair::PairKey;
use crate::Result;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::future::Future;
use uuid::Uuid;

/// Presence record for one participant in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDoc {
    pub user_id: String,
    pub user_name: String,
    pub joined_at: DateTime<Utc>,
}

/// SDP direction marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// A session description as exchanged through the store. The direction
/// marker is stored under `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDesc {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

/// The single connection record shared by a participant pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<SessionDesc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<SessionDesc>,
}

/// Partial update to a connection doc. `Some` fields replace, `None` fields
/// are left as stored, so offerer and answerer can write the same record
/// without clobbering each other.
#[derive(Debug, Clone, Default)]
pub struct ConnectionPatch {
    pub offer: Option<SessionDesc>,
    pub answer: Option<SessionDesc>,
}

/// One trickled ICE candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateDoc {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u32>,
    pub username_fragment: Option<String>,
}

/// Which of the pair's two candidate lists a candidate belongs to. Each
/// side appends to the lane matching its own role and reads the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateLane {
    Offer,
    Answer,
}

impl CandidateLane {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateLane::Offer => "offerCandidates",
            CandidateLane::Answer => "answerCandidates",
        }
    }

    /// The lane the opposite side writes to.
    pub fn opposite(self) -> Self {
        match self {
            CandidateLane::Offer => CandidateLane::Answer,
            CandidateLane::Answer => CandidateLane::Offer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// A change notification from a watch stream.
#[derive(Debug, Clone)]
pub struct Change<T> {
    pub kind: ChangeKind,
    /// Document id (the participant's user id for participant changes).
    pub id: String,
    /// Document contents; `None` for removals.
    pub doc: Option<T>,
}

/// Document store for one or more call sessions.
///
/// Watch streams deliver the current state first (as `Added` changes or
/// snapshots) and then live updates, so subscription order relative to other
/// participants' writes does not matter. Deleting a record that does not
/// exist succeeds: cleanup runs concurrently from every leaving participant.
pub trait SignalStore: Send + Sync + 'static {
    fn put_participant(
        &self,
        session: Uuid,
        doc: ParticipantDoc,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_participant(
        &self,
        session: Uuid,
        user_id: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    fn list_participants(
        &self,
        session: Uuid,
    ) -> impl Future<Output = Result<Vec<ParticipantDoc>>> + Send;

    /// Current participants as `Added` changes, then live joins and leaves.
    fn watch_participants(&self, session: Uuid) -> BoxStream<'static, Change<ParticipantDoc>>;

    /// Merge a patch into the pair's connection doc, creating it if absent.
    fn merge_connection(
        &self,
        session: Uuid,
        pair: &PairKey,
        patch: ConnectionPatch,
    ) -> impl Future<Output = Result<()>> + Send;

    fn get_connection(
        &self,
        session: Uuid,
        pair: &PairKey,
    ) -> impl Future<Output = Result<Option<ConnectionDoc>>> + Send;

    fn list_connections(&self, session: Uuid) -> impl Future<Output = Result<Vec<PairKey>>> + Send;

    fn delete_connection(
        &self,
        session: Uuid,
        pair: &PairKey,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Snapshot of the connection doc now (if present), then a snapshot per
    /// subsequent merge. Consumers must tolerate duplicate snapshots.
    fn watch_connection(&self, session: Uuid, pair: &PairKey)
        -> BoxStream<'static, ConnectionDoc>;

    fn append_candidate(
        &self,
        session: Uuid,
        pair: &PairKey,
        lane: CandidateLane,
        candidate: IceCandidateDoc,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_candidates(
        &self,
        session: Uuid,
        pair: &PairKey,
        lane: CandidateLane,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Candidates already in the lane (in append order), then live appends.
    fn watch_candidates(
        &self,
        session: Uuid,
        pair: &PairKey,
        lane: CandidateLane,
    ) -> BoxStream<'static, IceCandidateDoc>;

    /// Remove the session root document.
    fn delete_session(&self, session: Uuid) -> impl Future<Output = Result<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_use_wire_field_names() {
        let doc = ParticipantDoc {
            user_id: "u1".to_string(),
            user_name: "Riya".to_string(),
            joined_at: Utc::now(),
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("userName").is_some());
        assert!(json.get("joinedAt").is_some());

        let cand = IceCandidateDoc {
            candidate: "candidate:0 1 UDP 2122252543 192.0.2.1 54400 typ host".to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_mline_index: Some(0),
            username_fragment: Some("abcd".to_string()),
        };
        let json = serde_json::to_value(&cand).unwrap();
        assert!(json.get("sdpMid").is_some());
        assert!(json.get("sdpMLineIndex").is_some());
        assert!(json.get("usernameFragment").is_some());
    }

    #[test]
    fn session_desc_uses_type_on_the_wire() {
        let desc = SessionDesc {
            kind: SdpKind::Offer,
            sdp: "v=0".to_string(),
        };
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["type"], "offer");
        assert!(json.get("kind").is_none());

        let parsed: SessionDesc =
            serde_json::from_value(serde_json::json!({ "type": "answer", "sdp": "v=0" })).unwrap();
        assert_eq!(parsed.kind, SdpKind::Answer);
    }

    #[test]
    fn lanes_name_their_lists() {
        assert_eq!(CandidateLane::Offer.as_str(), "offerCandidates");
        assert_eq!(CandidateLane::Offer.opposite(), CandidateLane::Answer);
    }
}
