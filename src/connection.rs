//! `ConnectionServer`: TCP accept loop, per-connection session worker,
//! and the stage machine gating which opcodes a session may act on
//! (spec §4.6, §5).
//!
//! Each accepted connection is its own single-writer worker task — the
//! teacher's `WorldBusAgent` pattern of "one async task owns one piece of
//! mutable state, driven by messages" generalizes directly here, with the
//! TCP stream itself supplying the inbound message stream and a channel
//! supplying outbound frames queued by other workers.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::error::ConnectionError;
use crate::protocol::dispatch::DispatchTable;
use crate::protocol::opcodes::ConnectionCategory;
use crate::protocol::{decode_frame, encode_frame};

/// unauthenticated -> authenticated -> in-realm -> loading -> in-world ->
/// disconnecting (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStage {
    Unauthenticated,
    Authenticated,
    InRealm,
    Loading,
    InWorld,
    Disconnecting,
}

impl SessionStage {
    /// The only stage transitions the session loop will accept. A
    /// handler requesting any other transition is a bug, not a protocol
    /// event, so this is an assertion boundary rather than a `Result`.
    fn can_advance_to(self, next: SessionStage) -> bool {
        use SessionStage::*;
        matches!(
            (self, next),
            (Unauthenticated, Authenticated)
                | (Authenticated, InRealm)
                | (InRealm, Loading)
                | (Loading, InWorld)
                | (_, Disconnecting)
        )
    }
}

/// Per-session mutable state, owned exclusively by that session's worker
/// task — never shared, per spec §5's single-writer rule.
pub struct SessionContext {
    pub session_id: u64,
    pub stage: SessionStage,
    pub category: ConnectionCategory,
    pub player_guid: Option<u64>,
    pub outbound: mpsc::UnboundedSender<Vec<u8>>,
}

impl SessionContext {
    pub fn advance_stage(&mut self, next: SessionStage) {
        if self.stage.can_advance_to(next) {
            self.stage = next;
        } else {
            tracing::error!(
                session_id = self.session_id,
                from = ?self.stage,
                to = ?next,
                "rejected illegal session stage transition"
            );
        }
    }

    pub fn send(&self, opcode: u16, payload: &[u8]) {
        if self.outbound.send(encode_frame(opcode, payload)).is_err() {
            tracing::debug!(session_id = self.session_id, "outbound queue closed, dropping send");
        }
    }
}

/// World-category opcodes below this stage are rejected as out-of-stage
/// rather than dispatched; not a fatal error (spec §4.6).
fn stage_allows_world_traffic(stage: SessionStage) -> bool {
    matches!(stage, SessionStage::InWorld)
}

pub struct ConnectionServer {
    category: ConnectionCategory,
    dispatch: Arc<DispatchTable<SessionContext>>,
    next_session_id: Arc<AtomicU64>,
}

impl ConnectionServer {
    pub fn new(category: ConnectionCategory, dispatch: DispatchTable<SessionContext>) -> Self {
        Self {
            category,
            dispatch: Arc::new(dispatch),
            next_session_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Accepts connections until the listener errors or the process is
    /// asked to shut down; each accepted stream becomes its own session
    /// worker task.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ConnectionError> {
        loop {
            let (stream, peer_addr) = listener.accept().await?;
            let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
            let category = self.category;
            let dispatch = Arc::clone(&self.dispatch);
            tokio::spawn(async move {
                if let Err(err) = run_session(stream, peer_addr, session_id, category, dispatch).await {
                    tracing::warn!(session_id, error = %err, "session ended with error");
                }
            });
        }
    }
}

async fn run_session(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    session_id: u64,
    category: ConnectionCategory,
    dispatch: Arc<DispatchTable<SessionContext>>,
) -> Result<(), ConnectionError> {
    tracing::info!(session_id, %peer_addr, "session started");

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let mut ctx = SessionContext {
        session_id,
        stage: SessionStage::Unauthenticated,
        category,
        player_guid: None,
        outbound: outbound_tx,
    };

    let mut inbound = BytesMut::with_capacity(4096);
    let mut read_buf = [0u8; 4096];

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(bytes) => stream.write_all(&bytes).await?,
                    None => break,
                }
            }
            read_result = stream.read(&mut read_buf) => {
                let n = read_result?;
                if n == 0 {
                    break;
                }
                inbound.extend_from_slice(&read_buf[..n]);
                loop {
                    let frame = match decode_frame(&mut inbound) {
                        Ok(Some(frame)) => frame,
                        Ok(None) => break,
                        Err(err) => return Err(ConnectionError::Framing(err.to_string())),
                    };
                    dispatch_frame(&mut ctx, &dispatch, frame.opcode, &frame.payload);
                    if ctx.stage == SessionStage::Disconnecting {
                        return Ok(());
                    }
                }
            }
        }
    }

    tracing::info!(session_id, "session ended");
    Ok(())
}

fn dispatch_frame(
    ctx: &mut SessionContext,
    dispatch: &DispatchTable<SessionContext>,
    opcode: u16,
    payload: &[u8],
) {
    if ctx.category == ConnectionCategory::World && !stage_allows_world_traffic(ctx.stage) {
        tracing::debug!(
            session_id = ctx.session_id,
            opcode = format!("{opcode:#06x}"),
            stage = ?ctx.stage,
            "rejected opcode out of stage"
        );
        return;
    }
    dispatch.dispatch(ctx, opcode, payload);
}
