//! Shared test doubles: an in-memory relay channel and a scripted peer
//! transport, plus a callback recorder.

use async_trait::async_trait;
use roomrtc_signaling::peer::transport::{
    IceCandidateCallback, MediaStream, PeerTransport, PeerTransportFactory, RemoteMediaCallback,
    Role,
};
use roomrtc_signaling::signaling::channel::{ChannelFactory, CommandSender, SignalingChannel};
use roomrtc_signaling::signaling::protocol::{
    IceCandidate, JoinRoomAck, JoinRoomRequest, SessionDescription, SignalingCommand,
    SignalingEvent,
};
use roomrtc_signaling::{Error, Result, SignalingServerConfiguration};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Install the test tracing subscriber once per process
///
/// Filtered by `RUST_LOG`; output is captured per test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn test_config() -> SignalingServerConfiguration {
    SignalingServerConfiguration {
        url: "ws://relay.test:8080".to_string(),
        client_name: "alice".to_string(),
        room: "chat".to_string(),
        password: Some("secret".to_string()),
        connect_timeout_secs: 5,
    }
}

/// Poll an async condition until it holds or the deadline passes
pub async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..400 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within timeout");
}

// ---------------------------------------------------------------------------
// Relay channel double
// ---------------------------------------------------------------------------

/// Test-side handle to one opened mock channel
#[derive(Clone)]
pub struct RelayHandle {
    event_tx: mpsc::UnboundedSender<SignalingEvent>,
    commands: Arc<Mutex<Vec<SignalingCommand>>>,
    closed: Arc<AtomicBool>,
}

impl RelayHandle {
    pub fn push(&self, event: SignalingEvent) {
        self.event_tx.send(event).expect("session dropped event receiver");
    }

    pub fn commands(&self) -> Vec<SignalingCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn command_count(&self) -> usize {
        self.commands.lock().unwrap().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockChannel {
    ack: JoinRoomAck,
    cmd_tx: mpsc::UnboundedSender<SignalingCommand>,
    events: Option<mpsc::UnboundedReceiver<SignalingEvent>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl SignalingChannel for MockChannel {
    async fn join_room(&mut self, _request: JoinRoomRequest) -> Result<JoinRoomAck> {
        Ok(self.ack.clone())
    }

    fn sender(&self) -> CommandSender {
        CommandSender::new(self.cmd_tx.clone())
    }

    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SignalingEvent>> {
        self.events.take()
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Factory producing scripted in-memory channels
pub struct MockChannelFactory {
    join_ack: Mutex<JoinRoomAck>,
    fail_connect: AtomicBool,
    handles: Mutex<Vec<RelayHandle>>,
}

impl MockChannelFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            join_ack: Mutex::new(JoinRoomAck {
                joined: true,
                client_id: Some("me".to_string()),
            }),
            fail_connect: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        })
    }

    pub fn set_client_id(&self, id: &str) {
        self.join_ack.lock().unwrap().client_id = Some(id.to_string());
    }

    pub fn reject_join(&self) {
        *self.join_ack.lock().unwrap() = JoinRoomAck {
            joined: false,
            client_id: None,
        };
    }

    pub fn fail_next_connect(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    /// Handle for the most recently opened channel
    pub fn handle(&self) -> RelayHandle {
        self.handles
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no channel opened yet")
    }

    pub fn opened_count(&self) -> usize {
        self.handles.lock().unwrap().len()
    }

    /// Boxed delegating view, keeping this shared handle alive for the test
    pub fn boxed(self: &Arc<Self>) -> Box<dyn ChannelFactory> {
        Box::new(SharedChannelFactory(self.clone()))
    }
}

struct SharedChannelFactory(Arc<MockChannelFactory>);

#[async_trait]
impl ChannelFactory for SharedChannelFactory {
    async fn connect(
        &self,
        config: &SignalingServerConfiguration,
    ) -> Result<Box<dyn SignalingChannel>> {
        self.0.connect(config).await
    }
}

#[async_trait]
impl ChannelFactory for MockChannelFactory {
    async fn connect(
        &self,
        _config: &SignalingServerConfiguration,
    ) -> Result<Box<dyn SignalingChannel>> {
        if self.fail_connect.swap(false, Ordering::SeqCst) {
            return Err(Error::Connection("relay unreachable".to_string()));
        }

        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let drained = commands.clone();
        tokio::spawn(async move {
            while let Some(command) = cmd_rx.recv().await {
                drained.lock().unwrap().push(command);
            }
        });

        self.handles.lock().unwrap().push(RelayHandle {
            event_tx,
            commands,
            closed: closed.clone(),
        });

        Ok(Box::new(MockChannel {
            ack: self.join_ack.lock().unwrap().clone(),
            cmd_tx,
            events: Some(event_rx),
            closed,
        }))
    }
}

// ---------------------------------------------------------------------------
// Peer transport double
// ---------------------------------------------------------------------------

pub struct FakeStream;

impl MediaStream for FakeStream {}

#[derive(Default)]
struct MockTransportState {
    local_description: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,
    candidates: Vec<IceCandidate>,
    on_ice_candidate: Option<IceCandidateCallback>,
    on_remote_media: Option<RemoteMediaCallback>,
}

/// Scripted peer transport recording every negotiation step
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockTransportState>,
}

impl MockTransport {
    pub fn candidate(line: &str) -> IceCandidate {
        IceCandidate {
            candidate: line.to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_mline_index: Some(0),
        }
    }

    pub fn discover_candidate(&self, candidate: Option<IceCandidate>) {
        let callback = self.state.lock().unwrap().on_ice_candidate.clone();
        if let Some(callback) = callback {
            callback(candidate);
        }
    }

    pub fn deliver_remote_media(&self) {
        let callback = self.state.lock().unwrap().on_remote_media.clone();
        if let Some(callback) = callback {
            callback(Arc::new(FakeStream));
        }
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.state.lock().unwrap().local_description.clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.state.lock().unwrap().remote_description.clone()
    }

    pub fn applied_candidates(&self) -> Vec<IceCandidate> {
        self.state.lock().unwrap().candidates.clone()
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn create_offer(&self) -> Result<SessionDescription> {
        Ok(SessionDescription::offer("v=0 test-offer"))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        Ok(SessionDescription::answer("v=0 test-answer"))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.state.lock().unwrap().local_description = Some(description);
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.state.lock().unwrap().remote_description = Some(description);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.state.lock().unwrap().candidates.push(candidate);
        Ok(())
    }

    fn set_on_ice_candidate(&self, callback: Option<IceCandidateCallback>) {
        self.state.lock().unwrap().on_ice_candidate = callback;
    }

    fn set_on_remote_media(&self, callback: Option<RemoteMediaCallback>) {
        self.state.lock().unwrap().on_remote_media = callback;
    }
}

/// Factory handing out [`MockTransport`]s, remembered by peer id
#[derive(Default)]
pub struct MockTransportFactory {
    created: Mutex<HashMap<String, (Arc<MockTransport>, Role)>>,
}

impl MockTransportFactory {
    pub fn transport(&self, remote_id: &str) -> Arc<MockTransport> {
        self.created
            .lock()
            .unwrap()
            .get(remote_id)
            .map(|(transport, _)| transport.clone())
            .expect("no transport created for peer")
    }

    pub fn has_created(&self, remote_id: &str) -> bool {
        self.created.lock().unwrap().contains_key(remote_id)
    }

    pub fn created_role(&self, remote_id: &str) -> Option<Role> {
        self.created
            .lock()
            .unwrap()
            .get(remote_id)
            .map(|(_, role)| *role)
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

impl PeerTransportFactory for MockTransportFactory {
    fn create(&self, remote_id: &str, role: Role) -> Result<Arc<dyn PeerTransport>> {
        let transport = Arc::new(MockTransport::default());
        self.created
            .lock()
            .unwrap()
            .insert(remote_id.to_string(), (transport.clone(), role));
        Ok(transport)
    }
}

// ---------------------------------------------------------------------------
// Callback recorder
// ---------------------------------------------------------------------------

/// Records every session callback as a flat string log
#[derive(Clone, Default)]
pub struct CallbackLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallbackLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn count_of(&self, entry: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.as_str() == entry)
            .count()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.count_of(entry) > 0
    }
}

/// Register every session callback into one log
pub async fn attach_log(session: &roomrtc_signaling::SignalingSession, log: &CallbackLog) {
    let l = log.clone();
    session.on_connection_open(move || l.push("open")).await;

    let l = log.clone();
    session.on_connection_close(move || l.push("close")).await;

    let l = log.clone();
    session
        .on_connection_error(move |message| l.push(format!("error:{}", message)))
        .await;

    let l = log.clone();
    session
        .on_room_clients_changed(move |clients| {
            let mut summary: Vec<String> = clients
                .iter()
                .map(|c| format!("{}{}", c.id, if c.is_connected { "+" } else { "-" }))
                .collect();
            summary.sort();
            l.push(format!("roster:{}", summary.join(",")));
        })
        .await;

    let l = log.clone();
    session
        .on_add_remote_stream(move |id, name, _stream| l.push(format!("stream:{}:{}", id, name)))
        .await;

    let l = log.clone();
    session
        .on_client_connected(move |id| l.push(format!("connected:{}", id)))
        .await;

    let l = log.clone();
    session
        .on_client_disconnect(move |id| l.push(format!("gone:{}", id)))
        .await;

    let l = log.clone();
    session
        .on_call_rejected(move |id| l.push(format!("rejected:{}", id)))
        .await;
}
