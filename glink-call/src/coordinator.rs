//! Per-session call coordinator
//!
//! One coordinator per joined session. It owns the local media handle, the
//! per-remote peer registry, and the background tasks driving negotiation,
//! so nothing about a call lives in ambient state. Dropping the coordinator
//! after [`CallCoordinator::leave`] releases everything.
//!
//! Negotiation protocol per participant pair: the offerer (lexicographically
//! smaller user id) publishes an offer into the shared connection doc and
//! trickles candidates into the offer lane; the answerer reacts to the
//! offer, publishes its answer, and trickles into the answer lane. SDP and
//! candidate arrival order are independent; each remote description is
//! applied at most once.

use crate::media::{LocalMedia, MediaDevices, PeerConnection, PeerFactory, PeerState};
use crate::pair::{pair_role, PairKey, PairRole};
use crate::signal::{CandidateLane, ChangeKind, ConnectionPatch, ParticipantDoc, SignalStore};
use crate::{CallError, Result};
use chrono::Utc;
use futures::StreamExt;
use glink_common::config::CoreConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Who the local participant is.
#[derive(Debug, Clone)]
pub struct CallIdentity {
    pub user_id: String,
    pub user_name: String,
}

struct PeerHandle<P> {
    peer: Arc<P>,
    tasks: Vec<JoinHandle<()>>,
}

struct Inner<S: SignalStore, F: PeerFactory, M: MediaDevices> {
    store: S,
    factory: F,
    devices: M,
    ice_servers: Vec<String>,
    session_id: Uuid,
    identity: CallIdentity,
    peers: Mutex<HashMap<String, PeerHandle<F::Peer>>>,
    media: Mutex<Option<M::Media>>,
    participant_watch: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Coordinates one participant's side of a call session.
pub struct CallCoordinator<S: SignalStore, F: PeerFactory, M: MediaDevices> {
    inner: Arc<Inner<S, F, M>>,
}

impl<S: SignalStore, F: PeerFactory, M: MediaDevices> CallCoordinator<S, F, M> {
    pub fn new(
        store: S,
        factory: F,
        devices: M,
        config: &CoreConfig,
        session_id: Uuid,
        identity: CallIdentity,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                factory,
                devices,
                ice_servers: config.ice_servers.clone(),
                session_id,
                identity,
                peers: Mutex::new(HashMap::new()),
                media: Mutex::new(None),
                participant_watch: Mutex::new(None),
            }),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    /// Number of remote peers currently connected or negotiating.
    pub fn peer_count(&self) -> usize {
        lock(&self.inner.peers).len()
    }

    /// Enter the session: acquire local media, publish presence, and start
    /// reacting to other participants. Media acquisition failure aborts the
    /// join without touching the store.
    pub async fn join(&self) -> Result<()> {
        if lock(&self.inner.participant_watch).is_some() {
            return Err(CallError::Signal("already joined this session".to_string()));
        }

        let media = self.inner.devices.acquire().await?;
        *lock(&self.inner.media) = Some(media);

        self.inner
            .store
            .put_participant(
                self.inner.session_id,
                ParticipantDoc {
                    user_id: self.inner.identity.user_id.clone(),
                    user_name: self.inner.identity.user_name.clone(),
                    joined_at: Utc::now(),
                },
            )
            .await?;
        info!(
            session = %self.inner.session_id,
            user = %self.inner.identity.user_id,
            "joined call session"
        );

        let mut changes = self.inner.store.watch_participants(self.inner.session_id);
        let inner = Arc::clone(&self.inner);
        let watch = tokio::spawn(async move {
            while let Some(change) = changes.next().await {
                if change.id == inner.identity.user_id {
                    continue;
                }
                match change.kind {
                    ChangeKind::Added => {
                        if let Err(e) = ensure_peer(&inner, change.id.clone()).await {
                            warn!(remote = %change.id, error = %e, "failed to set up peer");
                        }
                    }
                    ChangeKind::Removed => {
                        debug!(remote = %change.id, "participant left");
                        teardown_peer(&inner, &change.id);
                    }
                    ChangeKind::Modified => {}
                }
            }
        });
        *lock(&self.inner.participant_watch) = Some(watch);
        Ok(())
    }

    /// Leave the session: stop negotiation, close peers, release media,
    /// withdraw the presence record, and garbage-collect the session's
    /// signaling documents if nobody is left. Cleanup failures are logged
    /// and swallowed; records another leaver already deleted never raise.
    pub async fn leave(&self) -> Result<()> {
        if let Some(watch) = lock(&self.inner.participant_watch).take() {
            watch.abort();
        }

        let handles: Vec<PeerHandle<F::Peer>> = {
            let mut peers = lock(&self.inner.peers);
            peers.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            for task in &handle.tasks {
                task.abort();
            }
            if let Err(e) = handle.peer.close().await {
                warn!(error = %e, "peer close failed on leave");
            }
        }

        if let Some(mut media) = lock(&self.inner.media).take() {
            media.stop();
        }

        if let Err(e) = self
            .inner
            .store
            .delete_participant(self.inner.session_id, &self.inner.identity.user_id)
            .await
        {
            warn!(error = %e, "failed to withdraw participant record");
        }

        match self.inner.store.list_participants(self.inner.session_id).await {
            Ok(remaining) if remaining.is_empty() => self.cleanup_session().await,
            Ok(remaining) => {
                debug!(remaining = remaining.len(), "participants remain, skipping session cleanup");
            }
            Err(e) => warn!(error = %e, "could not check remaining participants"),
        }

        info!(
            session = %self.inner.session_id,
            user = %self.inner.identity.user_id,
            "left call session"
        );
        Ok(())
    }

    async fn cleanup_session(&self) {
        let session = self.inner.session_id;
        info!(%session, "last participant out, clearing signaling documents");
        match self.inner.store.list_connections(session).await {
            Ok(pairs) => {
                for pair in pairs {
                    for lane in [CandidateLane::Offer, CandidateLane::Answer] {
                        if let Err(e) = self.inner.store.delete_candidates(session, &pair, lane).await
                        {
                            warn!(%pair, error = %e, "candidate cleanup failed");
                        }
                    }
                    if let Err(e) = self.inner.store.delete_connection(session, &pair).await {
                        warn!(%pair, error = %e, "connection cleanup failed");
                    }
                }
            }
            Err(e) => warn!(error = %e, "could not list connections for cleanup"),
        }
        if let Err(e) = self.inner.store.delete_session(session).await {
            warn!(error = %e, "session document cleanup failed");
        }
    }
}

/// Create and register the peer for a newly seen remote participant.
/// A second `Added` for a known remote is a no-op.
async fn ensure_peer<S: SignalStore, F: PeerFactory, M: MediaDevices>(
    inner: &Arc<Inner<S, F, M>>,
    remote_id: String,
) -> Result<()> {
    if lock(&inner.peers).contains_key(&remote_id) {
        debug!(remote = %remote_id, "peer already exists");
        return Ok(());
    }

    let peer = Arc::new(inner.factory.create_peer(&inner.ice_servers).await?);
    let pair = PairKey::new(&inner.identity.user_id, &remote_id);
    let role = pair_role(&inner.identity.user_id, &remote_id);
    let own_lane = match role {
        PairRole::Offerer => CandidateLane::Offer,
        PairRole::Answerer => CandidateLane::Answer,
    };
    let mut tasks = Vec::with_capacity(4);

    // Failure of this one peer tears it down without touching the others.
    {
        let inner = Arc::clone(inner);
        let remote = remote_id.clone();
        let mut states = peer.states();
        tasks.push(tokio::spawn(async move {
            while let Some(state) = states.next().await {
                match state {
                    PeerState::Failed | PeerState::Disconnected => {
                        warn!(remote = %remote, ?state, "peer connection lost");
                        teardown_peer(&inner, &remote);
                        break;
                    }
                    PeerState::Closed => break,
                    PeerState::New | PeerState::Connected => {}
                }
            }
        }));
    }

    // Trickle locally gathered candidates into our lane.
    {
        let inner = Arc::clone(inner);
        let pair = pair.clone();
        let mut locals = peer.local_candidates();
        tasks.push(tokio::spawn(async move {
            while let Some(candidate) = locals.next().await {
                if let Err(e) = inner
                    .store
                    .append_candidate(inner.session_id, &pair, own_lane, candidate)
                    .await
                {
                    warn!(%pair, error = %e, "failed to publish local candidate");
                    break;
                }
            }
        }));
    }

    // Apply the remote side's candidates as they arrive, before or after
    // the remote description.
    {
        let peer = Arc::clone(&peer);
        let pair_label = pair.clone();
        let mut remotes = inner
            .store
            .watch_candidates(inner.session_id, &pair, own_lane.opposite());
        tasks.push(tokio::spawn(async move {
            while let Some(candidate) = remotes.next().await {
                if let Err(e) = peer.add_ice_candidate(candidate).await {
                    warn!(pair = %pair_label, error = %e, "failed to apply remote candidate");
                }
            }
        }));
    }

    {
        let inner = Arc::clone(inner);
        let peer = Arc::clone(&peer);
        let pair = pair.clone();
        tasks.push(tokio::spawn(async move {
            let outcome = match role {
                PairRole::Offerer => {
                    run_offerer(&inner.store, inner.session_id, peer.as_ref(), &pair).await
                }
                PairRole::Answerer => {
                    run_answerer(&inner.store, inner.session_id, peer.as_ref(), &pair).await
                }
            };
            if let Err(e) = outcome {
                warn!(%pair, error = %e, "negotiation ended with error");
            }
        }));
    }

    lock(&inner.peers).insert(remote_id.clone(), PeerHandle { peer, tasks });
    info!(remote = %remote_id, %pair, ?role, "peer registered");
    Ok(())
}

/// Remove a peer from the registry and shut it down. Safe to call from one
/// of the peer's own tasks: closing happens on a detached task.
fn teardown_peer<S: SignalStore, F: PeerFactory, M: MediaDevices>(
    inner: &Arc<Inner<S, F, M>>,
    remote_id: &str,
) {
    let Some(handle) = lock(&inner.peers).remove(remote_id) else {
        return;
    };
    for task in &handle.tasks {
        task.abort();
    }
    let peer = handle.peer;
    tokio::spawn(async move {
        if let Err(e) = peer.close().await {
            warn!(error = %e, "peer close failed");
        }
    });
}

/// Offerer side: publish the offer, then wait for the answer and apply it
/// exactly once.
async fn run_offerer<S: SignalStore, P: PeerConnection>(
    store: &S,
    session: Uuid,
    peer: &P,
    pair: &PairKey,
) -> Result<()> {
    let offer = peer.create_offer().await?;
    store
        .merge_connection(
            session,
            pair,
            ConnectionPatch {
                offer: Some(offer),
                answer: None,
            },
        )
        .await?;
    debug!(%pair, "offer published");

    let mut docs = store.watch_connection(session, pair);
    while let Some(doc) = docs.next().await {
        // Duplicate snapshots of the same doc are expected; only the first
        // answer is applied.
        if let Some(answer) = doc.answer {
            peer.set_remote_description(answer).await?;
            debug!(%pair, "answer applied");
            break;
        }
    }
    Ok(())
}

/// Answerer side: wait for the offer, apply it once, publish the answer.
async fn run_answerer<S: SignalStore, P: PeerConnection>(
    store: &S,
    session: Uuid,
    peer: &P,
    pair: &PairKey,
) -> Result<()> {
    let mut docs = store.watch_connection(session, pair);
    while let Some(doc) = docs.next().await {
        if let Some(offer) = doc.offer {
            peer.set_remote_description(offer).await?;
            let answer = peer.create_answer().await?;
            store
                .merge_connection(
                    session,
                    pair,
                    ConnectionPatch {
                        offer: None,
                        answer: Some(answer),
                    },
                )
                .await?;
            debug!(%pair, "answer published");
            break;
        }
    }
    Ok(())
}
