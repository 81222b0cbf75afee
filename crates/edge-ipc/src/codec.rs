//! Length-prefixed framing over async byte transports.

use std::pin::Pin;

use futures::{Sink, Stream};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{IncomingMessage, IpcError, OutgoingMessage};

/// Largest accepted frame body.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Outbound half of the channel.
pub type MessageSink = Pin<Box<dyn Sink<OutgoingMessage, Error = IpcError> + Send>>;

/// Inbound half of the channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<IncomingMessage, IpcError>> + Send>>;

/// Read one frame body. `None` on a clean end of input between frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, IpcError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    let read = reader.read(&mut len_buf).await?;
    if read == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut len_buf[read..]).await?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(IpcError::FrameTooLarge(len));
    }

    let mut frame = vec![0u8; len];
    reader.read_exact(&mut frame).await?;
    tracing::trace!(len, "frame received");
    Ok(Some(frame))
}

/// Write one frame and flush it.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(IpcError::FrameTooLarge(payload.len()));
    }

    writer
        .write_u32(payload.len() as u32)
        .await
        .map_err(IpcError::on_write)?;
    writer.write_all(payload).await.map_err(IpcError::on_write)?;
    writer.flush().await.map_err(IpcError::on_write)?;
    tracing::trace!(len = payload.len(), "frame sent");
    Ok(())
}

/// Adapt a byte writer into a sink of outbound messages.
///
/// Each send completes only once the frame has been written and flushed.
pub fn sender<W>(writer: W) -> MessageSink
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    Box::pin(futures::sink::unfold(
        writer,
        |mut writer, msg: OutgoingMessage| async move {
            let payload = serde_json::to_vec(&msg)?;
            write_frame(&mut writer, &payload).await?;
            Ok::<_, IpcError>(writer)
        },
    ))
}

/// Adapt a byte reader into a stream of inbound messages.
pub fn receiver<R>(reader: R) -> MessageStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    Box::pin(futures::stream::try_unfold(reader, |mut reader| async move {
        match read_frame(&mut reader).await? {
            Some(frame) => Ok(Some((IncomingMessage::decode(&frame)?, reader))),
            None => Ok(None),
        }
    }))
}
