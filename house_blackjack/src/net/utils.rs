use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::errors::ProtocolError;

/// Longest inbound line accepted on stream transports.
pub const MAX_LINE_LEN: usize = 16 * 1024;

/// Reads one newline-terminated line of at most `max` bytes, without the
/// line terminator.
///
/// Returns `Ok(None)` at end of stream. An oversized line is consumed up to
/// its newline and reported as [`ProtocolError::LineTooLong`] so the caller
/// can keep reading.
pub async fn read_line<R>(reader: &mut R, max: usize) -> Result<Option<String>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = (&mut *reader)
        .take(max as u64 + 1)
        .read_until(b'\n', &mut buf)
        .await?;
    if n == 0 {
        return Ok(None);
    }

    if buf.last() != Some(&b'\n') && buf.len() > max {
        discard_rest_of_line(reader).await?;
        return Err(ProtocolError::LineTooLong { max });
    }

    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| ProtocolError::InvalidUtf8)
}

async fn discard_rest_of_line<R>(reader: &mut R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(idx) => {
                reader.consume(idx + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

/// Writes `frame` followed by a newline in a single write.
pub async fn write_line<W>(writer: &mut W, frame: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(frame.len() + 1);
    buf.extend_from_slice(frame.as_bytes());
    buf.push(b'\n');
    writer.write_all(&buf).await?;
    writer.flush().await
}
