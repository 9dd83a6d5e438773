//! End-to-end session state machine

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use e2elink_core::{Address, E2eError, IdlePolicy, Result, Role, SessionConfig, SessionState};
use e2elink_tunnel::PumpLimits;

use crate::bridge::{self, Leg};
use crate::handshake;
use crate::signal::CloseSignal;

/// Duplex byte stream a session can run over
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

pub type BoxedTransport = Box<dyn Transport>;

/// Application-facing end of a connected session's local pipe
pub type LocalConn = DuplexStream;

struct Inner {
    state: SessionState,
    role: Option<Role>,
    /// Relayed stream while no bridge owns it
    remote: Option<BoxedTransport>,
    /// Bridge task owning the relayed stream and `localConn` once connected
    bridge: Option<JoinHandle<()>>,
}

struct Shared {
    peer: Address,
    config: SessionConfig,
    inner: Mutex<Inner>,
    close_signal: CloseSignal,
}

impl Shared {
    /// Tear down once. Returns false if already closed.
    fn close(&self) -> bool {
        let (remote, bridge) = {
            let mut inner = self.inner.lock();
            if inner.state.is_terminal() {
                return false;
            }
            inner.state = SessionState::Closed;
            (inner.remote.take(), inner.bridge.take())
        };

        drop(remote);
        if let Some(bridge) = bridge {
            bridge.abort();
        }
        self.close_signal.fire();
        debug!("E2E session with {} closed", self.peer.short());
        true
    }
}

/// One end-to-end circuit over a relayed connection.
///
/// Constructed around an already established relay stream. Exactly one of
/// [`connect_as_initiator`](Self::connect_as_initiator) or
/// [`connect_as_acceptor`](Self::connect_as_acceptor) negotiates the role;
/// on success the session returns the application-facing end of an in-memory
/// pipe and bridges the other end (`localConn`) to the relay stream.
///
/// [`close`](Self::close) is idempotent, safe from any task, and also runs on
/// drop.
pub struct E2eSession {
    shared: Arc<Shared>,
}

impl E2eSession {
    /// Create a session with default settings and the given idle timeout
    pub fn new<T: Transport>(remote: T, peer: Address, idle_timeout: std::time::Duration) -> Self {
        Self::build(
            Box::new(remote),
            peer,
            SessionConfig::with_idle_timeout(idle_timeout),
        )
    }

    pub fn with_config<T: Transport>(remote: T, peer: Address, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(Box::new(remote), peer, config))
    }

    fn build(remote: BoxedTransport, peer: Address, config: SessionConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                peer,
                config,
                inner: Mutex::new(Inner {
                    state: SessionState::Uninitialized,
                    role: None,
                    remote: Some(remote),
                    bridge: None,
                }),
                close_signal: CloseSignal::new(),
            }),
        }
    }

    pub fn peer(&self) -> Address {
        self.shared.peer
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state
    }

    pub fn role(&self) -> Option<Role> {
        self.shared.inner.lock().role
    }

    pub fn is_closed(&self) -> bool {
        self.shared.close_signal.is_fired()
    }

    /// Originate the circuit (client side).
    ///
    /// Sends the connect frame and waits up to the idle timeout for the
    /// acceptor's answer.
    pub async fn connect_as_initiator(&self) -> Result<LocalConn> {
        self.connect(Role::Initiator).await
    }

    /// Accept an inbound circuit (device side).
    ///
    /// Waits up to the idle timeout for the initiator's connect frame and
    /// acknowledges it.
    pub async fn connect_as_acceptor(&self) -> Result<LocalConn> {
        self.connect(Role::Acceptor).await
    }

    async fn connect(&self, role: Role) -> Result<LocalConn> {
        let mut remote = self.begin_connect(role)?;
        let idle_timeout = self.shared.config.idle_timeout;

        debug!(
            "Connecting to {} as {} (idle timeout {:?})",
            self.shared.peer.short(),
            role,
            idle_timeout
        );

        let outcome = tokio::select! {
            res = tokio::time::timeout(idle_timeout, handshake_for(role, &mut remote)) => {
                res.unwrap_or(Err(E2eError::Timeout))
            }
            _ = self.shared.close_signal.wait() => Err(E2eError::SessionClosed),
        };

        self.finish_connect(role, remote, outcome)
    }

    fn begin_connect(&self, role: Role) -> Result<BoxedTransport> {
        let mut inner = self.shared.inner.lock();
        match inner.state {
            SessionState::Uninitialized => {}
            SessionState::Closed => return Err(E2eError::SessionClosed),
            other => return Err(E2eError::InvalidState(other)),
        }

        let remote = inner.remote.take().ok_or(E2eError::TransportClosed)?;
        inner.state = SessionState::Connecting;
        inner.role = Some(role);
        Ok(remote)
    }

    fn finish_connect(
        &self,
        role: Role,
        remote: BoxedTransport,
        outcome: Result<()>,
    ) -> Result<LocalConn> {
        let mut inner = self.shared.inner.lock();

        if inner.state == SessionState::Closed {
            drop(inner);
            drop(remote);
            return Err(E2eError::SessionClosed);
        }

        if let Err(e) = outcome {
            warn!(
                "E2E connect to {} as {} failed: {}",
                self.shared.peer.short(),
                role,
                e
            );
            inner.state = SessionState::Failed;
            inner.remote = Some(remote);
            return Err(e);
        }

        let config = &self.shared.config;
        let (app_end, local_conn) = tokio::io::duplex(config.pipe_capacity);
        let limits = match config.idle_policy {
            IdlePolicy::ConnectOnly => PumpLimits::unbounded(config.chunk_size),
            IdlePolicy::Enforce => {
                PumpLimits::new(config.chunk_size, config.idle_timeout, config.idle_timeout)
            }
        };

        let shared = Arc::clone(&self.shared);
        inner.bridge = Some(tokio::spawn(async move {
            let (leg, result) = bridge::run(remote, local_conn, limits).await;
            match (leg, &result) {
                (_, Err(E2eError::Timeout)) => {
                    debug!("E2E session with {} idle, closing", shared.peer.short())
                }
                (Leg::RemoteToLocal, Ok(_)) => {
                    debug!("Relay stream from {} closed", shared.peer.short())
                }
                (Leg::LocalToRemote, Ok(_)) => {
                    debug!("Local endpoint for {} closed", shared.peer.short())
                }
                (leg, Err(e)) => {
                    warn!("E2E bridge {:?} for {} failed: {}", leg, shared.peer.short(), e)
                }
            }
            shared.close();
        }));
        inner.state = SessionState::Connected;

        info!(
            "E2E session with {} connected as {}",
            self.shared.peer.short(),
            role
        );
        Ok(app_end)
    }

    /// Tear the session down.
    ///
    /// Closes `localConn` and the relayed stream and fires the completion
    /// signal. Later calls, including concurrent ones, do nothing.
    pub fn close(&self) {
        self.shared.close();
    }

    /// Resolve once teardown has begun
    pub async fn closed(&self) {
        self.shared.close_signal.wait().await
    }
}

async fn handshake_for(role: Role, remote: &mut BoxedTransport) -> Result<()> {
    match role {
        Role::Initiator => handshake::initiate(remote).await,
        Role::Acceptor => handshake::accept(remote).await,
    }
}

impl Drop for E2eSession {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl std::fmt::Debug for E2eSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("E2eSession")
            .field("peer", &self.shared.peer)
            .field("state", &inner.state)
            .field("role", &inner.role)
            .finish()
    }
}
