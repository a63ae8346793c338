//! Reference stream transport.
//!
//! Plays the transport collaborator for the loop over TCP with length-prefixed
//! JSON frames. Per accepted stream:
//! - a writer task drains the session's `ChannelSink` onto the socket;
//! - the listener forwards every inbound frame to the loop, tagged with the
//!   session's participant id, and reports `Closed` when the stream or the
//!   writer ends.
//!
//! A session the loop rejects (session cap, id exhaustion) is closed without
//! ever reading from it.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use arena_shared::frame::{read_frame, write_frame};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::{
    events::{Connection, EventSenders, SessionEvent},
    sink::ChannelSink,
};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

pub struct Acceptor {
    listener: TcpListener,
    senders: EventSenders,
    outbound_capacity: usize,
}

impl Acceptor {
    pub async fn bind(
        addr: SocketAddr,
        senders: EventSenders,
        outbound_capacity: usize,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await.context("tcp bind")?;
        Ok(Self {
            listener,
            senders,
            outbound_capacity,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts sessions forever, one task each.
    pub async fn run(self) {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "tcp accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            if let Err(e) = stream.set_nodelay(true) {
                debug!(%peer, error = %e, "set_nodelay failed");
            }

            let senders = self.senders.clone();
            let capacity = self.outbound_capacity;
            tokio::spawn(async move {
                if let Err(e) = serve_session(stream, peer, senders, capacity).await {
                    debug!(%peer, error = %e, "Session ended with error");
                }
            });
        }
    }
}

async fn serve_session(
    stream: TcpStream,
    peer: SocketAddr,
    senders: EventSenders,
    outbound_capacity: usize,
) -> anyhow::Result<()> {
    let (mut reader, mut writer) = stream.into_split();
    let (sink, mut outbound) = ChannelSink::new(outbound_capacity);
    let (conn, assigned) = Connection::with_reply(Arc::new(sink));
    senders
        .connections
        .send(conn)
        .map_err(|_| anyhow::anyhow!("game loop has shut down"))?;

    // Ends when the loop drops the sink or the peer stops reading.
    let mut writer_task = tokio::spawn(async move {
        while let Some(payload) = outbound.recv().await {
            write_frame(&mut writer, &payload).await?;
        }
        anyhow::Ok(())
    });

    let Ok(id) = assigned.await else {
        info!(%peer, "Session rejected");
        return Ok(());
    };
    info!(%peer, participant = %id, "Session established");

    // Ends with whichever side finishes first. The writer finishes once the
    // loop has dropped this participant's sink or the socket refuses writes.
    let result = loop {
        tokio::select! {
            frame = read_frame(&mut reader) => match frame {
                Ok(Some(payload)) => {
                    let event = SessionEvent::Message {
                        from: Some(id),
                        payload,
                    };
                    if senders.events.send(event).is_err() {
                        break Ok(());
                    }
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            },
            written = &mut writer_task => {
                debug!(%peer, participant = %id, "Writer finished");
                break match written {
                    Ok(res) => res,
                    Err(e) => Err(e).context("session writer"),
                };
            }
        }
    };

    let _ = senders.events.send(SessionEvent::Closed { id });
    writer_task.abort();
    info!(%peer, participant = %id, "Session closed");
    result
}

#[cfg(test)]
mod tests {
    use arena_shared::net::ParticipantId;
    use tokio::{io::AsyncReadExt, time::timeout};

    use super::*;
    use crate::events::{channels, EventSources};

    const WAIT: Duration = Duration::from_secs(2);

    async fn accepted(sources: &mut EventSources) -> Connection {
        timeout(WAIT, sources.connections.recv())
            .await
            .unwrap()
            .unwrap()
    }

    async fn acceptor() -> (SocketAddr, EventSources) {
        let (senders, sources) = channels();
        let acceptor = Acceptor::bind("127.0.0.1:0".parse().unwrap(), senders, 8)
            .await
            .unwrap();
        let addr = acceptor.local_addr().unwrap();
        tokio::spawn(acceptor.run());
        (addr, sources)
    }

    #[tokio::test]
    async fn dropping_the_sink_ends_the_session() {
        let (addr, mut sources) = acceptor().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let Connection { sink, assigned } = accepted(&mut sources).await;
        let id = ParticipantId(7);
        assigned.unwrap().send(id).unwrap();
        // The loop forgets the participant while its peer is still connected.
        drop(sink);

        let event = timeout(WAIT, sources.events.recv()).await.unwrap().unwrap();
        assert!(matches!(event, SessionEvent::Closed { id: closed } if closed == id));

        let mut buf = [0u8; 1];
        let n = timeout(WAIT, client.read(&mut buf)).await.unwrap().unwrap();
        assert_eq!(n, 0, "socket should be closed");
    }

    #[tokio::test]
    async fn rejected_session_is_closed() {
        let (addr, mut sources) = acceptor().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        drop(accepted(&mut sources).await);

        let mut buf = [0u8; 1];
        let n = timeout(WAIT, client.read(&mut buf)).await.unwrap().unwrap();
        assert_eq!(n, 0);
        assert!(sources.events.try_recv().is_err());
    }
}
