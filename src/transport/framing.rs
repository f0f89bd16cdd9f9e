//! 4-byte big-endian length-prefixed framing, shared by the TCP and Unix
//! transports.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, TransportError};

/// Read one length-prefixed frame. Returns `None` if the peer closed the
/// connection before sending any bytes of the length prefix (a clean
/// close between messages); any other short read is a
/// [`TransportError::ReceiveInterrupted`].
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, Error>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(TransportError::Io(e).into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    let mut data = vec![0u8; len];
    reader
        .read_exact(&mut data)
        .await
        .map_err(|e| -> Error {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                TransportError::ReceiveInterrupted.into()
            } else {
                TransportError::Io(e).into()
            }
        })?;

    Ok(Some(data))
}

/// Write one length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, data: &[u8]) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(data.len())
        .map_err(|_| Error::Parameter(format!("frame too large: {} bytes", data.len())))?;
    writer.write_all(&len.to_be_bytes()).await.map_err(|e| TransportError::Io(e))?;
    writer.write_all(data).await.map_err(|e| TransportError::Io(e))?;
    writer.flush().await.map_err(|e| TransportError::Io(e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_round_trips_through_a_buffer() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello").await.unwrap();
        assert_eq!(buf.len(), 4 + 5);

        let mut cursor = std::io::Cursor::new(buf);
        let frame = read_frame(&mut cursor).await.unwrap();
        assert_eq!(frame, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn empty_stream_reads_as_clean_close() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        let frame = read_frame(&mut cursor).await.unwrap();
        assert_eq!(frame, None);
    }

    #[tokio::test]
    async fn truncated_payload_is_receive_interrupted() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello world").await.unwrap();
        buf.truncate(6);
        let mut cursor = std::io::Cursor::new(buf);
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::ReceiveInterrupted)));
    }
}
