//! Client implementation.
//!
//! One framed stream carries everything:
//! - handshake: wait for `OFFER`, send `REQUEST`, wait for `JOIN`
//! - per-tick `DATA` input upstream
//! - `DATA` snapshots downstream, kept for interpolation
//!
//! A reader task owns the read half so that waiting with a timeout never
//! leaves a frame half-read.

use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use arena_shared::{
    config::EngineConfig,
    frame::{read_frame, write_frame},
    net::{
        decode_server, encode_client, ClientMessage, InputCommand, ParticipantId, ServerMessage,
        Snapshot,
    },
};
use tokio::{
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    sync::mpsc,
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    input::{build_command, InputState},
    interp::SnapshotBuffer,
};

/// High-level game client.
pub struct GameClient {
    pub uid: ParticipantId,
    pub snaps: SnapshotBuffer,
    writer: OwnedWriteHalf,
    inbound: mpsc::UnboundedReceiver<ServerMessage>,
    reader: JoinHandle<()>,
    peer: SocketAddr,
    tick: u64,
}

impl GameClient {
    /// Connects to the configured server and completes the join handshake.
    pub async fn connect(cfg: &EngineConfig) -> anyhow::Result<Self> {
        let addr: SocketAddr = cfg.server_addr.parse().context("parse server_addr")?;
        Self::connect_addr(addr).await
    }

    pub async fn connect_addr(addr: SocketAddr) -> anyhow::Result<Self> {
        info!(server = %addr, "Connecting to server");
        let stream = TcpStream::connect(addr).await.context("tcp connect")?;
        stream.set_nodelay(true).context("set_nodelay")?;
        let (read_half, writer) = stream.into_split();
        let (tx, mut inbound) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(read_half, tx));

        let uid = match inbound.recv().await {
            Some(ServerMessage::Offer { uid }) => uid,
            other => {
                reader.abort();
                match other {
                    Some(msg) => anyhow::bail!("expected OFFER, got {msg:?}"),
                    None => anyhow::bail!("server closed the connection before OFFER"),
                }
            }
        };
        debug!(uid = %uid, "Offered participant id");

        let mut client = Self {
            uid,
            snaps: SnapshotBuffer::new(32),
            writer,
            inbound,
            reader,
            peer: addr,
            tick: 0,
        };
        client.send(&ClientMessage::Request { id: uid }).await?;

        // Snapshots go to every session, so some may arrive before the JOIN.
        loop {
            match client.recv().await? {
                ServerMessage::Join => break,
                ServerMessage::Data(snap) => client.snaps.push(snap),
                other => anyhow::bail!("expected JOIN, got {other:?}"),
            }
        }
        info!(uid = %uid, "Joined");
        Ok(client)
    }

    /// Advances one client tick: build input command and send.
    pub async fn tick(&mut self, input: InputState) -> anyhow::Result<InputCommand> {
        let cmd = build_command(self.uid, self.tick, input);
        self.send(&ClientMessage::Data(cmd.clone())).await?;
        self.tick += 1;
        Ok(cmd)
    }

    pub async fn send(&mut self, msg: &ClientMessage) -> anyhow::Result<()> {
        let payload = encode_client(msg).context("encode message")?;
        self.send_raw(&payload).await
    }

    /// Sends an arbitrary payload as one frame.
    pub async fn send_raw(&mut self, payload: &[u8]) -> anyhow::Result<()> {
        write_frame(&mut self.writer, payload).await
    }

    /// Next message from the server; an error once the server has closed.
    pub async fn recv(&mut self) -> anyhow::Result<ServerMessage> {
        self.inbound
            .recv()
            .await
            .context("server closed the connection")
    }

    /// Waits up to `timeout` for the next snapshot and buffers it.
    pub async fn recv_snapshot(&mut self, timeout: Duration) -> anyhow::Result<Option<Snapshot>> {
        match tokio::time::timeout(timeout, self.next_snapshot()).await {
            Ok(Ok(snap)) => {
                self.snaps.push(snap.clone());
                Ok(Some(snap))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None),
        }
    }

    /// Discards everything already received and returns the newest snapshot,
    /// waiting up to `timeout` if none is pending.
    pub async fn latest_snapshot(&mut self, timeout: Duration) -> anyhow::Result<Option<Snapshot>> {
        let mut latest = None;
        while let Ok(msg) = self.inbound.try_recv() {
            if let ServerMessage::Data(snap) = msg {
                latest = Some(snap);
            }
        }
        match latest {
            Some(snap) => {
                self.snaps.push(snap.clone());
                Ok(Some(snap))
            }
            None => self.recv_snapshot(timeout).await,
        }
    }

    async fn next_snapshot(&mut self) -> anyhow::Result<Snapshot> {
        loop {
            match self.recv().await? {
                ServerMessage::Data(snap) => return Ok(snap),
                other => debug!(?other, "Skipping non-snapshot message"),
            }
        }
    }

    pub fn server_peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(mut read_half: OwnedReadHalf, tx: mpsc::UnboundedSender<ServerMessage>) {
    loop {
        let payload = match read_frame(&mut read_half).await {
            Ok(Some(payload)) => payload,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Connection error");
                break;
            }
        };
        match decode_server(&payload) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break;
                }
            }
            Err(e) => warn!(error = %e, "Undecodable server message"),
        }
    }
    debug!("Reader finished");
}
