//! Network Module
//!
//! Wire codec and TCP plumbing between mirror nodes. Every frame is a
//! 4-byte big-endian length prefix followed by a bincode payload.

mod client;
mod peer;
pub mod protocol;
mod server;

pub use client::PeerClient;
pub use peer::PeerAddr;
pub use protocol::{Request, Response};
pub use server::ReplicationServer;

use std::future::Future;
use std::io;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::{Error, Result};

/// Size of the length prefix in bytes
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Encode a message as a complete frame (prefix + payload)
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let body = bincode::serialize(message)?;
    let length = u32::try_from(body.len()).map_err(|_| Error::MessageTooLarge {
        size: body.len(),
        limit: u32::MAX as usize,
    })?;

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Read one framed message.
///
/// Returns `Ok(None)` if the stream is closed before any prefix byte
/// arrives, and a framing error if it closes part-way through a frame.
pub async fn read_message<T, R>(reader: &mut R) -> Result<Option<T>>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    read_message_limited(reader, None).await
}

/// Read one framed message, rejecting frames whose declared length is
/// above `limit`.
pub async fn read_message_limited<T, R>(reader: &mut R, limit: Option<usize>) -> Result<Option<T>>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    read_frame(reader, limit, None).await
}

/// Read one framed message, failing with `TimedOut` if any single read
/// stalls for longer than `idle`. A slow but steady sender never trips it.
pub async fn read_message_idle<T, R>(reader: &mut R, idle: Duration) -> Result<Option<T>>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    read_frame(reader, None, Some(idle)).await
}

/// Write one framed message and flush
pub async fn write_message<T, W>(writer: &mut W, message: &T) -> Result<()>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    write_frame(writer, message, None).await
}

/// Write one framed message, failing with `TimedOut` if any single write
/// stalls for longer than `idle`
pub async fn write_message_idle<T, W>(writer: &mut W, message: &T, idle: Duration) -> Result<()>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    write_frame(writer, message, Some(idle)).await
}

async fn read_frame<T, R>(reader: &mut R, limit: Option<usize>, idle: Option<Duration>) -> Result<Option<T>>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    // Read prefix
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    let received = read_full(reader, &mut prefix, idle).await?;
    if received == 0 {
        return Ok(None);
    }
    if received < LENGTH_PREFIX_SIZE {
        return Err(Error::Framing {
            expected: LENGTH_PREFIX_SIZE,
            received,
        });
    }

    let length = u32::from_be_bytes(prefix) as usize;
    if let Some(limit) = limit {
        if length > limit {
            return Err(Error::MessageTooLarge { size: length, limit });
        }
    }

    // Read body
    let mut body = vec![0u8; length];
    let received = read_full(reader, &mut body, idle).await?;
    if received < length {
        return Err(Error::Framing {
            expected: length,
            received,
        });
    }

    Ok(Some(bincode::deserialize(&body)?))
}

async fn write_frame<T, W>(writer: &mut W, message: &T, idle: Option<Duration>) -> Result<()>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let frame = encode(message)?;

    let mut written = 0;
    while written < frame.len() {
        let n = with_deadline(idle, writer.write(&frame[written..])).await?;
        if n == 0 {
            return Err(io::Error::from(io::ErrorKind::WriteZero).into());
        }
        written += n;
    }

    with_deadline(idle, writer.flush()).await?;
    Ok(())
}

/// Fill `buf`, looping on short reads. Returns how many bytes arrived
/// before end of stream.
async fn read_full<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
    idle: Option<Duration>,
) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = with_deadline(idle, reader.read(&mut buf[filled..])).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Bound a single I/O step
async fn with_deadline<F, T>(idle: Option<Duration>, step: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match idle {
        Some(idle) => match timeout(idle, step).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "peer stalled")),
        },
        None => step.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oplog::Operation;

    #[test]
    fn test_prefix_is_big_endian_length() {
        let frame = encode(&Request::Sync).unwrap();
        let body_len = frame.len() - LENGTH_PREFIX_SIZE;
        assert_eq!(&frame[..4], &(body_len as u32).to_be_bytes());
    }

    #[tokio::test]
    async fn test_read_back_written_frames() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let ops = vec![Operation::write("/a.txt", "hello"), Operation::mkdir("/d")];
        let request = Request::Ops { log: ops.clone() };

        // Small duplex buffer forces the reader through short reads
        let writer = tokio::spawn(async move {
            write_message(&mut client, &request).await.unwrap();
            write_message(&mut client, &Request::Sync).await.unwrap();
        });

        let first: Request = read_message(&mut server).await.unwrap().unwrap();
        let second: Request = read_message(&mut server).await.unwrap().unwrap();
        writer.await.unwrap();

        assert!(matches!(first, Request::Ops { log } if log == ops));
        assert!(matches!(second, Request::Sync));

        // Writer dropped: clean end of stream
        let third: Option<Request> = read_message(&mut server).await.unwrap();
        assert!(third.is_none());
    }

    #[tokio::test]
    async fn test_empty_stream_is_no_message() {
        let mut input: &[u8] = &[];
        let msg: Option<Request> = read_message(&mut input).await.unwrap();
        assert!(msg.is_none());
    }

    #[tokio::test]
    async fn test_truncated_payload_is_framing_error() {
        let frame = encode(&Request::Ops { log: vec![Operation::write("/f", "abcdef")] }).unwrap();
        let mut truncated = &frame[..frame.len() - 3];

        let result: Result<Option<Request>> = read_message(&mut truncated).await;
        match result {
            Err(Error::Framing { expected, received }) => {
                assert_eq!(expected, frame.len() - LENGTH_PREFIX_SIZE);
                assert_eq!(received, expected - 3);
            }
            other => panic!("expected framing error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_truncated_prefix_is_framing_error() {
        let mut input: &[u8] = &[0, 0];
        let result: Result<Option<Request>> = read_message(&mut input).await;
        assert!(matches!(result, Err(Error::Framing { expected: 4, received: 2 })));
    }

    #[tokio::test]
    async fn test_idle_deadline_applies_per_read() {
        let frame = encode(&Request::Ops { log: vec![Operation::write("/f", &"y".repeat(600))] }).unwrap();
        let (mut client, mut server) = tokio::io::duplex(1024);

        // Steady trickle: every chunk arrives well inside the idle bound
        let chunks: Vec<Vec<u8>> = frame.chunks(100).map(<[u8]>::to_vec).collect();
        let writer = tokio::spawn(async move {
            for chunk in chunks {
                client.write_all(&chunk).await.unwrap();
                tokio::time::sleep(Duration::from_millis(40)).await;
            }
            // Hold the stream open without sending the next frame
            tokio::time::sleep(Duration::from_millis(500)).await;
        });

        let msg: Option<Request> = read_message_idle(&mut server, Duration::from_millis(150)).await.unwrap();
        assert!(matches!(msg, Some(Request::Ops { .. })));

        let stalled: Result<Option<Request>> = read_message_idle(&mut server, Duration::from_millis(150)).await;
        assert!(matches!(stalled, Err(Error::Io(ref e)) if e.kind() == io::ErrorKind::TimedOut));

        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_limit_rejects_oversized_frame() {
        let frame = encode(&Request::Ops { log: vec![Operation::write("/f", &"x".repeat(256))] }).unwrap();
        let mut input = &frame[..];

        let result: Result<Option<Request>> = read_message_limited(&mut input, Some(64)).await;
        assert!(matches!(result, Err(Error::MessageTooLarge { limit: 64, .. })));
    }
}
