//! Frame I/O on async streams.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use msghub_core::error::AppError;
use msghub_core::result::AppResult;
use msghub_protocol::Frame;

/// Read one frame from the stream.
///
/// `max_part` bounds each length prefix so a corrupt peer cannot force an
/// unbounded allocation.
pub async fn read_frame<R>(reader: &mut R, max_part: usize) -> AppResult<Frame>
where
    R: AsyncRead + Unpin,
{
    let text_len = read_len(reader, max_part).await?;
    let mut text = vec![0u8; text_len];
    reader
        .read_exact(&mut text)
        .await
        .map_err(|e| AppError::network(format!("Failed to read frame text: {e}")))?;

    let binary_len = read_len(reader, max_part).await?;
    let mut binary = vec![0u8; binary_len];
    reader
        .read_exact(&mut binary)
        .await
        .map_err(|e| AppError::network(format!("Failed to read frame binary: {e}")))?;

    let text = String::from_utf8(text)
        .map_err(|_| AppError::validation("Frame text part is not valid UTF-8"))?;

    Ok(Frame::with_binary(text, binary))
}

/// Write one frame to the stream and flush it.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(&frame.encode())
        .await
        .map_err(|e| AppError::network(format!("Failed to write frame: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| AppError::network(format!("Failed to flush frame: {e}")))?;
    Ok(())
}

async fn read_len<R>(reader: &mut R, max_part: usize) -> AppResult<usize>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| AppError::network(format!("Connection closed: {e}")))?;

    let len = u32::from_le_bytes(buf) as usize;
    if len > max_part {
        return Err(AppError::validation(format!(
            "Frame part of {len} bytes exceeds buffer size {max_part}"
        )));
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_roundtrip() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        let frame = Frame::with_binary(r#"{"command":"blob"}"#, vec![7u8, 8, 9]);
        write_frame(&mut client, &frame).await.unwrap();

        let decoded = read_frame(&mut server, 1024).await.unwrap();
        assert_eq!(decoded, frame);
    }

    #[tokio::test]
    async fn test_oversized_part_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        let frame = Frame::text("0123456789");
        write_frame(&mut client, &frame).await.unwrap();

        let err = read_frame(&mut server, 4).await.unwrap_err();
        assert!(err.message.contains("exceeds buffer size"));
    }

    #[tokio::test]
    async fn test_closed_stream_is_a_network_error() {
        let (client, mut server) = tokio::io::duplex(1024);
        drop(client);

        assert!(read_frame(&mut server, 1024).await.is_err());
    }
}
