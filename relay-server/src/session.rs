//! Per-connection protocol handler.

use std::net::SocketAddr;

use anyhow::{ Context, Result };
use relay_core::codec::{ decode_line, encode_line };
use relay_core::{ ClientEvent, ConnectionId, HubHandle, ServerEvent, validate };
use tokio::io::{ AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter, Lines };
use tokio::sync::mpsc;
use tracing::{ debug, info };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Joined,
    Closed,
}

pub struct GatewaySession {
    peer: SocketAddr,
    hub: HubHandle,
    state: SessionState,
}

impl GatewaySession {
    pub fn new(peer: SocketAddr, hub: HubHandle) -> Self {
        GatewaySession {
            peer,
            hub,
            state: SessionState::Connecting,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drives the connection until either side closes it. The connection is
    /// unregistered on every exit path.
    pub async fn run<S>(&mut self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (reader, writer) = tokio::io::split(stream);
        let mut lines = BufReader::new(reader).lines();
        let mut writer = BufWriter::new(writer);

        let (outbox, mut inbox) = mpsc::unbounded_channel::<ServerEvent>();
        let id = self.hub.join(outbox).context("Failed to join hub")?;
        info!(conn = %id, peer = %self.peer, "client connected");

        let result = self.pump(id, &mut lines, &mut writer, &mut inbox).await;

        // Client disconnected or the socket broke
        self.hub.leave(id);
        self.state = SessionState::Closed;
        info!(conn = %id, peer = %self.peer, "client disconnected");
        result
    }

    async fn pump<R, W>(
        &mut self,
        id: ConnectionId,
        lines: &mut Lines<R>,
        writer: &mut W,
        inbox: &mut mpsc::UnboundedReceiver<ServerEvent>,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        // the hub queues the backlog ahead of any broadcast
        let Some(backlog) = inbox.recv().await else {
            return Ok(());
        };
        write_event(writer, &backlog).await?;
        self.state = SessionState::Joined;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line.context("Failed to read line from client")? {
                        Some(line) => self.handle_line(id, &line)?,
                        None => return Ok(()),
                    }
                }
                event = inbox.recv() => {
                    let Some(event) = event else { return Ok(()) };
                    write_event(writer, &event).await?;
                }
            }
        }
    }

    fn handle_line(&self, id: ConnectionId, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        let request = match decode_line::<ClientEvent>(line) {
            Ok(ClientEvent::SendMessage(request)) => request,
            Err(e) => {
                debug!(conn = %id, error = %e, "ignoring unreadable line");
                return Ok(());
            }
        };

        match validate(request) {
            Ok(candidate) => self.hub.publish(id, candidate).context("Failed to publish")?,
            Err(rejection) => debug!(conn = %id, reason = %rejection, "dropped publish"),
        }
        Ok(())
    }
}

async fn write_event<W>(writer: &mut W, event: &ServerEvent) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let line = encode_line(event)?;
    writer
        .write_all(line.as_bytes())
        .await
        .context("Failed to write to client")?;
    writer.flush().await.context("Failed to flush client stream")?;
    Ok(())
}
