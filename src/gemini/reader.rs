use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{Instant, timeout_at};

use crate::gemini::error::{ConnectionError, RequestError, TransportError};

/// Longest URL a client may send.
pub const MAX_URL_LEN: usize = 1024;

/// Longest legal request line: URL plus CRLF.
pub const MAX_LINE_LEN: usize = MAX_URL_LEN + 2;

/// Size of a single read. Twice the line cap so oversize input is seen
/// and rejected rather than cut at the cap.
const READ_CHUNK: usize = 2048;

/// Reads one request line off `stream` and returns it trimmed.
///
/// Reads until a CRLF has arrived, the line cap is exceeded, or the peer
/// stops sending, so a line split across several segments is still seen
/// whole. Every read is bounded by `deadline`.
pub async fn read_request_line<R>(stream: &mut R, deadline: Instant) -> Result<String, ConnectionError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = match timeout_at(deadline, stream.read(&mut chunk)).await {
            Ok(res) => res.map_err(TransportError::Io)?,
            Err(_) => return Err(TransportError::Timeout.into()),
        };

        if n == 0 {
            break;
        }

        buf.extend_from_slice(&chunk[..n]);

        if buf.len() > MAX_LINE_LEN || contains_crlf(&buf) {
            break;
        }
    }

    Ok(parse_request_line(&buf)?)
}

/// Validates raw request bytes. Checks run in a fixed order: length,
/// encoding, framing, emptiness.
pub fn parse_request_line(raw: &[u8]) -> Result<String, RequestError> {
    if raw.len() > MAX_LINE_LEN {
        return Err(RequestError::TooLong(raw.len()));
    }

    let text = std::str::from_utf8(raw).map_err(|_| RequestError::InvalidEncoding)?;

    if !text.ends_with("\r\n") {
        return Err(RequestError::MalformedFraming);
    }

    let line = text.trim();
    if line.is_empty() {
        return Err(RequestError::Empty);
    }

    Ok(line.to_string())
}

fn contains_crlf(buf: &[u8]) -> bool {
    buf.windows(2).any(|w| w == b"\r\n")
}
