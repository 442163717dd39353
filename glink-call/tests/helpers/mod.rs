//! Mock media stack and test utilities shared by the integration tests.

use futures::stream::BoxStream;
use futures::StreamExt;
use glink_call::media::{LocalMedia, MediaDevices, PeerConnection, PeerFactory, PeerState};
use glink_call::signal::{IceCandidateDoc, SdpKind, SessionDesc};
use glink_call::{CallError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::{BroadcastStream, UnboundedReceiverStream};

pub struct MockMedia {
    stopped: Arc<AtomicBool>,
}

impl LocalMedia for MockMedia {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

pub struct MockDevices {
    pub deny: bool,
    pub stopped: Arc<AtomicBool>,
}

impl MockDevices {
    pub fn granting() -> (Self, Arc<AtomicBool>) {
        let stopped = Arc::new(AtomicBool::new(false));
        (
            Self {
                deny: false,
                stopped: Arc::clone(&stopped),
            },
            stopped,
        )
    }

    pub fn denying() -> Self {
        Self {
            deny: true,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl MediaDevices for MockDevices {
    type Media = MockMedia;

    async fn acquire(&self) -> Result<MockMedia> {
        if self.deny {
            return Err(CallError::MediaPermissionDenied(
                "user dismissed the prompt".to_string(),
            ));
        }
        Ok(MockMedia {
            stopped: Arc::clone(&self.stopped),
        })
    }
}

/// Everything a test needs to observe and drive one created peer.
#[derive(Default)]
pub struct PeerLog {
    pub remote_descriptions: Mutex<Vec<SessionDesc>>,
    pub remote_candidates: Mutex<Vec<IceCandidateDoc>>,
    pub closed: AtomicBool,
}

impl PeerLog {
    pub fn remote_description_count(&self) -> usize {
        self.remote_descriptions.lock().unwrap().len()
    }

    pub fn remote_candidate_strings(&self) -> Vec<String> {
        self.remote_candidates
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.candidate.clone())
            .collect()
    }
}

pub struct MockPeerHandle {
    pub log: Arc<PeerLog>,
    pub candidate_tx: mpsc::UnboundedSender<IceCandidateDoc>,
    pub state_tx: broadcast::Sender<PeerState>,
}

pub struct MockPeer {
    label: String,
    log: Arc<PeerLog>,
    candidate_rx: Mutex<Option<mpsc::UnboundedReceiver<IceCandidateDoc>>>,
    state_tx: broadcast::Sender<PeerState>,
}

impl PeerConnection for MockPeer {
    async fn create_offer(&self) -> Result<SessionDesc> {
        Ok(SessionDesc {
            kind: SdpKind::Offer,
            sdp: format!("v=0 offer from {}", self.label),
        })
    }

    async fn create_answer(&self) -> Result<SessionDesc> {
        Ok(SessionDesc {
            kind: SdpKind::Answer,
            sdp: format!("v=0 answer from {}", self.label),
        })
    }

    async fn set_remote_description(&self, desc: SessionDesc) -> Result<()> {
        self.log.remote_descriptions.lock().unwrap().push(desc);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateDoc) -> Result<()> {
        self.log.remote_candidates.lock().unwrap().push(candidate);
        Ok(())
    }

    fn local_candidates(&self) -> BoxStream<'static, IceCandidateDoc> {
        match self.candidate_rx.lock().unwrap().take() {
            Some(rx) => UnboundedReceiverStream::new(rx).boxed(),
            None => futures::stream::empty().boxed(),
        }
    }

    fn states(&self) -> BoxStream<'static, PeerState> {
        BroadcastStream::new(self.state_tx.subscribe())
            .filter_map(|state| async move { state.ok() })
            .boxed()
    }

    async fn close(&self) -> Result<()> {
        self.log.closed.store(true, Ordering::SeqCst);
        let _ = self.state_tx.send(PeerState::Closed);
        Ok(())
    }
}

/// Factory that records a handle for every peer it creates, so tests can
/// inject candidates and state transitions from outside.
#[derive(Clone, Default)]
pub struct MockFactory {
    pub label: String,
    pub created: Arc<Mutex<Vec<MockPeerHandle>>>,
}

impl MockFactory {
    pub fn labeled(label: &str) -> Self {
        Self {
            label: label.to_string(),
            created: Arc::default(),
        }
    }

    pub fn handle(&self, index: usize) -> (Arc<PeerLog>, mpsc::UnboundedSender<IceCandidateDoc>) {
        let created = self.created.lock().unwrap();
        let handle = &created[index];
        (Arc::clone(&handle.log), handle.candidate_tx.clone())
    }

    pub fn state_sender(&self, index: usize) -> broadcast::Sender<PeerState> {
        self.created.lock().unwrap()[index].state_tx.clone()
    }
}

impl PeerFactory for MockFactory {
    type Peer = MockPeer;

    async fn create_peer(&self, _ice_servers: &[String]) -> Result<MockPeer> {
        let (candidate_tx, candidate_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = broadcast::channel(16);
        let log = Arc::new(PeerLog::default());
        self.created.lock().unwrap().push(MockPeerHandle {
            log: Arc::clone(&log),
            candidate_tx,
            state_tx: state_tx.clone(),
        });
        Ok(MockPeer {
            label: self.label.clone(),
            log,
            candidate_rx: Mutex::new(Some(candidate_rx)),
            state_tx,
        })
    }
}

pub fn candidate(n: u32) -> IceCandidateDoc {
    IceCandidateDoc {
        candidate: format!("candidate:{n} 1 UDP 2122252543 192.0.2.{n} 54400 typ host"),
        sdp_mid: Some("0".to_string()),
        sdp_mline_index: Some(0),
        username_fragment: None,
    }
}

/// Enable log output for a test when RUST_LOG is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Poll a condition until it holds, failing the test after two seconds.
pub async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}
