//! In-memory signaling store
//!
//! Backs tests and single-process deployments. All mutations publish a
//! store event on a broadcast channel while holding the state lock, and
//! watch streams subscribe under the same lock before snapshotting, so
//! replayed state and live events never overlap or reorder.

use super::{
    CandidateLane, Change, ChangeKind, ConnectionDoc, ConnectionPatch, IceCandidateDoc,
    ParticipantDoc, SignalStore,
};
use crate::pair::PairKey;
use crate::Result;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
enum StoreEvent {
    Participant {
        session: Uuid,
        change: Change<ParticipantDoc>,
    },
    Connection {
        session: Uuid,
        pair: PairKey,
        doc: ConnectionDoc,
    },
    Candidate {
        session: Uuid,
        pair: PairKey,
        lane: CandidateLane,
        doc: IceCandidateDoc,
    },
}

#[derive(Default)]
struct SessionState {
    participants: HashMap<String, ParticipantDoc>,
    connections: HashMap<PairKey, ConnectionDoc>,
    candidates: HashMap<(PairKey, CandidateLane), Vec<IceCandidateDoc>>,
}

struct Shared {
    state: Mutex<HashMap<Uuid, SessionState>>,
    events: broadcast::Sender<StoreEvent>,
}

/// In-process [`SignalStore`] implementation.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(HashMap::new()),
                events,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, SessionState>> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SignalStore for MemoryStore {
    async fn put_participant(&self, session: Uuid, doc: ParticipantDoc) -> Result<()> {
        let mut state = self.lock();
        let participants = &mut state.entry(session).or_default().participants;
        let kind = if participants.contains_key(&doc.user_id) {
            ChangeKind::Modified
        } else {
            ChangeKind::Added
        };
        participants.insert(doc.user_id.clone(), doc.clone());
        let _ = self.shared.events.send(StoreEvent::Participant {
            session,
            change: Change {
                kind,
                id: doc.user_id.clone(),
                doc: Some(doc),
            },
        });
        Ok(())
    }

    async fn delete_participant(&self, session: Uuid, user_id: &str) -> Result<()> {
        let mut state = self.lock();
        let Some(session_state) = state.get_mut(&session) else {
            return Ok(());
        };
        if session_state.participants.remove(user_id).is_some() {
            let _ = self.shared.events.send(StoreEvent::Participant {
                session,
                change: Change {
                    kind: ChangeKind::Removed,
                    id: user_id.to_string(),
                    doc: None,
                },
            });
        }
        Ok(())
    }

    async fn list_participants(&self, session: Uuid) -> Result<Vec<ParticipantDoc>> {
        let state = self.lock();
        Ok(state
            .get(&session)
            .map(|s| s.participants.values().cloned().collect())
            .unwrap_or_default())
    }

    fn watch_participants(&self, session: Uuid) -> BoxStream<'static, Change<ParticipantDoc>> {
        // Subscribe under the lock so the snapshot and the live stream
        // partition the event sequence exactly.
        let (snapshot, rx) = {
            let state = self.lock();
            let snapshot: Vec<ParticipantDoc> = state
                .get(&session)
                .map(|s| s.participants.values().cloned().collect())
                .unwrap_or_default();
            (snapshot, self.shared.events.subscribe())
        };

        let stream = async_stream::stream! {
            for doc in snapshot {
                yield Change {
                    kind: ChangeKind::Added,
                    id: doc.user_id.clone(),
                    doc: Some(doc),
                };
            }
            let mut rx = rx;
            loop {
                match rx.recv().await {
                    Ok(StoreEvent::Participant { session: s, change }) if s == session => {
                        yield change;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "participant watcher lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        stream.boxed()
    }

    async fn merge_connection(
        &self,
        session: Uuid,
        pair: &PairKey,
        patch: ConnectionPatch,
    ) -> Result<()> {
        let mut state = self.lock();
        let doc = state
            .entry(session)
            .or_default()
            .connections
            .entry(pair.clone())
            .or_default();
        if let Some(offer) = patch.offer {
            doc.offer = Some(offer);
        }
        if let Some(answer) = patch.answer {
            doc.answer = Some(answer);
        }
        let doc = doc.clone();
        let _ = self.shared.events.send(StoreEvent::Connection {
            session,
            pair: pair.clone(),
            doc,
        });
        Ok(())
    }

    async fn get_connection(&self, session: Uuid, pair: &PairKey) -> Result<Option<ConnectionDoc>> {
        let state = self.lock();
        Ok(state
            .get(&session)
            .and_then(|s| s.connections.get(pair))
            .cloned())
    }

    async fn list_connections(&self, session: Uuid) -> Result<Vec<PairKey>> {
        let state = self.lock();
        Ok(state
            .get(&session)
            .map(|s| s.connections.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_connection(&self, session: Uuid, pair: &PairKey) -> Result<()> {
        let mut state = self.lock();
        if let Some(session_state) = state.get_mut(&session) {
            session_state.connections.remove(pair);
        }
        Ok(())
    }

    fn watch_connection(
        &self,
        session: Uuid,
        pair: &PairKey,
    ) -> BoxStream<'static, ConnectionDoc> {
        let pair = pair.clone();
        let (snapshot, rx) = {
            let state = self.lock();
            let snapshot = state
                .get(&session)
                .and_then(|s| s.connections.get(&pair))
                .cloned();
            (snapshot, self.shared.events.subscribe())
        };

        let stream = async_stream::stream! {
            if let Some(doc) = snapshot {
                yield doc;
            }
            let mut rx = rx;
            loop {
                match rx.recv().await {
                    Ok(StoreEvent::Connection { session: s, pair: p, doc })
                        if s == session && p == pair =>
                    {
                        yield doc;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "connection watcher lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        stream.boxed()
    }

    async fn append_candidate(
        &self,
        session: Uuid,
        pair: &PairKey,
        lane: CandidateLane,
        candidate: IceCandidateDoc,
    ) -> Result<()> {
        let mut state = self.lock();
        state
            .entry(session)
            .or_default()
            .candidates
            .entry((pair.clone(), lane))
            .or_default()
            .push(candidate.clone());
        let _ = self.shared.events.send(StoreEvent::Candidate {
            session,
            pair: pair.clone(),
            lane,
            doc: candidate,
        });
        Ok(())
    }

    async fn delete_candidates(
        &self,
        session: Uuid,
        pair: &PairKey,
        lane: CandidateLane,
    ) -> Result<()> {
        let mut state = self.lock();
        if let Some(session_state) = state.get_mut(&session) {
            session_state.candidates.remove(&(pair.clone(), lane));
        }
        Ok(())
    }

    fn watch_candidates(
        &self,
        session: Uuid,
        pair: &PairKey,
        lane: CandidateLane,
    ) -> BoxStream<'static, IceCandidateDoc> {
        let pair = pair.clone();
        let (snapshot, rx) = {
            let state = self.lock();
            let snapshot: Vec<IceCandidateDoc> = state
                .get(&session)
                .and_then(|s| s.candidates.get(&(pair.clone(), lane)))
                .cloned()
                .unwrap_or_default();
            (snapshot, self.shared.events.subscribe())
        };

        let stream = async_stream::stream! {
            for doc in snapshot {
                yield doc;
            }
            let mut rx = rx;
            loop {
                match rx.recv().await {
                    Ok(StoreEvent::Candidate { session: s, pair: p, lane: l, doc })
                        if s == session && p == pair && l == lane =>
                    {
                        yield doc;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "candidate watcher lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        stream.boxed()
    }

    async fn delete_session(&self, session: Uuid) -> Result<()> {
        self.lock().remove(&session);
        Ok(())
    }
}
