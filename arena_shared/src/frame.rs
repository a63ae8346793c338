//! Stream framing.
//!
//! Messages travel over a byte stream as length-prefixed frames:
//! a big-endian `u32` length followed by the payload.

use anyhow::Context;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload accepted from a peer.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Writes one frame.
pub async fn write_frame<W>(w: &mut W, payload: &[u8]) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    anyhow::ensure!(
        payload.len() <= MAX_FRAME_LEN,
        "frame of {} bytes exceeds limit",
        payload.len()
    );
    let mut buf = BytesMut::with_capacity(4 + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.extend_from_slice(payload);
    w.write_all(&buf).await.context("write frame")?;
    Ok(())
}

/// Reads one frame; `Ok(None)` means the peer closed the stream cleanly.
pub async fn read_frame<R>(r: &mut R) -> anyhow::Result<Option<Bytes>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    // EOF is only clean before the first header byte.
    if r.read(&mut len_buf[..1]).await.context("read frame len")? == 0 {
        return Ok(None);
    }
    r.read_exact(&mut len_buf[1..])
        .await
        .context("read frame len")?;
    let len = u32::from_be_bytes(len_buf) as usize;
    anyhow::ensure!(len <= MAX_FRAME_LEN, "peer sent {len} byte frame");

    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload)
        .await
        .context("read frame payload")?;
    Ok(Some(Bytes::from(payload)))
}
