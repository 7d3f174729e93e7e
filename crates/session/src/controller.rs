//! Session lifecycle: hosting, joining, leaving.
//!
//! [`SessionController`] reacts to transport lifecycle events, drives the
//! [`RegistrationProtocol`] and tells subscribers what happened. It owns the
//! transport and at most one [`Session`] at a time; a session is created when
//! the process becomes a server or finishes connecting to one and is dropped,
//! registry included, when it ends.
//!
//! ```text
//! Idle ──create_server──▶ Hosting
//! Idle ──join_server──▶ Connecting ──connected──▶ Joined
//!                           │
//!                           └──failed / timeout──▶ Idle
//! Joined ──server gone / leave──▶ Idle
//! ```

use std::time::Instant;

use crossbeam::channel::Receiver;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::error::{ProtocolError, SessionError, SessionResult};
use crate::events::{EndReason, JoinFailure, SessionEvent, Subscribers};
use crate::messages::SessionMessage;
use crate::player::{PeerId, PlayerRecord};
use crate::protocol::{Handled, Outbound, RegistrationProtocol, Role};
use crate::registry::Registry;
use crate::transport::{Transport, TransportEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SessionState {
    Idle,
    Hosting,
    Connecting,
    Joined,
}

/// State of one running session.
#[derive(Debug)]
pub struct Session {
    protocol: RegistrationProtocol,
    registered: bool,
}

impl Session {
    fn new(role: Role) -> Self {
        Self {
            protocol: RegistrationProtocol::new(role),
            registered: matches!(role, Role::Server),
        }
    }

    pub fn role(&self) -> Role {
        self.protocol.role()
    }

    pub fn registry(&self) -> &Registry {
        self.protocol.registry()
    }

    pub fn local_id(&self) -> Option<PeerId> {
        match self.role() {
            Role::Server => Some(PeerId::SERVER),
            Role::Client { local } => Some(local),
            Role::Unbound => None,
        }
    }

    /// A server is registered from the start. A client is once the server's
    /// own record has been backfilled.
    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

#[derive(Debug)]
pub struct SessionController<T: Transport> {
    transport: T,
    config: SessionConfig,
    state: SessionState,
    session: Option<Session>,
    deadline: Option<Instant>,
    subscribers: Subscribers,
    events: Vec<TransportEvent>,
    outbound: Vec<Outbound>,
}

impl<T: Transport> SessionController<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            state: SessionState::Idle,
            session: None,
            deadline: None,
            subscribers: Subscribers::default(),
            events: Vec::new(),
            outbound: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Registry of the running session, if any.
    pub fn players(&self) -> Option<&Registry> {
        self.session.as_ref().map(Session::registry)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a receiver for every [`SessionEvent`] raised from now on.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        self.subscribers.subscribe()
    }

    /// Starts hosting on the configured port and registers the server player.
    pub fn create_server(&mut self) -> SessionResult<()> {
        self.ensure_idle()?;

        let port = self.config.port;
        if let Err(err) = self
            .transport
            .create_server(port, self.config.max_players)
        {
            warn!("Failed to create server: {err}");
            return Err(err.into());
        }

        info!(port, "server created");
        self.state = SessionState::Hosting;
        self.session = Some(Session::new(Role::Server));
        self.subscribers.publish(SessionEvent::ServerCreated);

        let record = self.config.server_player.to_record();
        self.announce(record);
        Ok(())
    }

    /// Starts dialing a server. The join completes once the transport
    /// reports the connection during [`update`](Self::update).
    pub fn join_server(&mut self, address: &str, port: u16) -> SessionResult<()> {
        self.ensure_idle()?;

        if let Err(err) = self.transport.create_client(address, port) {
            warn!("Failed to connect to server: {err}");
            self.subscribers
                .publish(SessionEvent::JoinFailed(JoinFailure::Dial));
            return Err(err.into());
        }

        info!(address, port, "connecting");
        self.state = SessionState::Connecting;
        self.deadline = Some(Instant::now() + self.config.connect_timeout());
        Ok(())
    }

    /// Leaves the current session, whatever state it is in.
    pub fn leave(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }
        info!(state = %self.state, "leaving session");
        self.end_session(EndReason::Left);
    }

    /// Drains pending transport events, dispatches them and enforces timeouts.
    pub fn update(&mut self, now: Instant) {
        let mut events = std::mem::take(&mut self.events);
        self.transport.poll_events(&mut events);
        for event in events.drain(..) {
            self.handle_transport_event(event, now);
        }
        self.events = events;

        self.check_timeouts(now);
    }

    /// Dispatches a single transport event.
    pub fn handle_transport_event(&mut self, event: TransportEvent, now: Instant) {
        match event {
            TransportEvent::PeerConnected { peer } => {
                debug!(%peer, "peer connected");
                self.subscribers.publish(SessionEvent::PeerConnected(peer));
            }
            TransportEvent::PeerDisconnected { peer } => {
                // Registry entries stay; removal is left to higher layers.
                debug!(%peer, "peer disconnected");
                self.subscribers
                    .publish(SessionEvent::PeerDisconnected(peer));
            }
            TransportEvent::ConnectedToServer => self.on_connected(now),
            TransportEvent::ConnectionFailed => {
                if self.state == SessionState::Connecting {
                    warn!("connection to server failed");
                    self.fail_join(JoinFailure::ConnectionFailed);
                }
            }
            TransportEvent::ServerDisconnected => {
                if matches!(self.state, SessionState::Joined | SessionState::Connecting) {
                    info!("The server abandoned me!");
                    self.end_session(EndReason::ServerDisconnected);
                }
            }
            TransportEvent::Message { sender, payload } => {
                match SessionMessage::from_bytes(&payload) {
                    Ok(SessionMessage::RegisterPlayer(record)) => {
                        self.on_register_request(sender, record)
                    }
                    Err(err) => warn!(%sender, "Failed to decode session message: {err}"),
                }
            }
        }
    }

    fn on_connected(&mut self, now: Instant) {
        if self.state != SessionState::Connecting {
            debug!(state = %self.state, "ignoring connected notification");
            return;
        }
        let Some(local) = self.transport.unique_id() else {
            error!("transport connected without assigning a peer id");
            self.fail_join(JoinFailure::ConnectionFailed);
            return;
        };

        info!(%local, "joined server");
        self.state = SessionState::Joined;
        self.session = Some(Session::new(Role::Client { local }));
        self.deadline = Some(now + self.config.registration_timeout());
        self.subscribers.publish(SessionEvent::JoinSucceeded);

        let record = self.config.client_player.to_record();
        self.announce(record);
    }

    fn announce(&mut self, record: PlayerRecord) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let result = session.protocol.announce_self(record, &mut self.outbound);
        self.apply(result);
    }

    fn on_register_request(&mut self, sender: PeerId, record: PlayerRecord) {
        let Some(session) = self.session.as_mut() else {
            debug!(%sender, "register request outside a session, dropping");
            return;
        };
        let result = session
            .protocol
            .handle_register_request(sender, record, &mut self.outbound);
        self.apply(result);
    }

    fn apply(&mut self, result: Result<Handled, ProtocolError>) {
        match result {
            Ok(Handled::Registered(_)) => {
                self.flush_outbound();
                self.subscribers.publish(SessionEvent::PlayersChanged);
                self.check_registration();
            }
            Ok(Handled::Dropped(rejection)) => {
                debug!(?rejection, "register request dropped");
                self.outbound.clear();
            }
            Err(err) => {
                error!("registry invariant violated, aborting session: {err}");
                self.outbound.clear();
                self.end_session(EndReason::ProtocolViolation);
            }
        }
    }

    fn check_registration(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.registered || !session.registry().contains(PeerId::SERVER) {
            return;
        }
        session.registered = true;
        self.deadline = None;

        if let Some(local) = session.local_id() {
            info!(%local, "registration complete");
            self.subscribers
                .publish(SessionEvent::RegistrationCompleted(local));
        }
    }

    fn flush_outbound(&mut self) {
        for Outbound { to, record } in self.outbound.drain(..) {
            let payload = match SessionMessage::RegisterPlayer(record).to_bytes() {
                Ok(payload) => payload,
                Err(err) => {
                    error!(%to, "Failed to encode session message: {err}");
                    continue;
                }
            };
            if let Err(err) = self.transport.send_to(to, payload) {
                warn!(%to, "Failed to send session message: {err}");
            }
        }
    }

    fn check_timeouts(&mut self, now: Instant) {
        let Some(deadline) = self.deadline else {
            return;
        };
        if now < deadline {
            return;
        }
        match self.state {
            SessionState::Connecting => {
                warn!("timed out waiting for the server connection");
                self.fail_join(JoinFailure::Timeout);
            }
            SessionState::Joined => {
                warn!("timed out waiting for registration by the server");
                self.fail_join(JoinFailure::RegistrationTimedOut);
            }
            SessionState::Idle | SessionState::Hosting => self.deadline = None,
        }
    }

    fn fail_join(&mut self, failure: JoinFailure) {
        self.reset();
        self.subscribers.publish(SessionEvent::JoinFailed(failure));
    }

    fn end_session(&mut self, reason: EndReason) {
        self.reset();
        self.subscribers.publish(SessionEvent::SessionEnded(reason));
    }

    fn reset(&mut self) {
        self.transport.close();
        self.session = None;
        self.deadline = None;
        self.outbound.clear();
        self.state = SessionState::Idle;
    }

    fn ensure_idle(&self) -> SessionResult<()> {
        match self.state {
            SessionState::Idle => Ok(()),
            SessionState::Hosting => Err(SessionError::AlreadyActive("hosting")),
            SessionState::Connecting => Err(SessionError::AlreadyActive("connecting")),
            SessionState::Joined => Err(SessionError::AlreadyActive("joined")),
        }
    }
}
