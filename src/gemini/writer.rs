use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout_at};

use crate::gemini::error::TransportError;
use crate::gemini::response::Response;

/// Status line: `<code> <meta>\r\n`.
pub fn serialize_header(resp: &Response) -> Vec<u8> {
    format!("{} {}\r\n", resp.status.as_u8(), resp.meta).into_bytes()
}

/// Writes one response: the status line, then the body if any, with
/// nothing in between and no terminator after. The peer sees the end of
/// the body when the connection closes.
pub struct ResponseWriter {
    header: Vec<u8>,
    body: Option<Bytes>,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            header: serialize_header(response),
            body: response.body().cloned(),
        }
    }

    pub async fn write_to_stream<W>(&self, stream: &mut W, deadline: Instant) -> Result<(), TransportError>
    where
        W: AsyncWrite + Unpin,
    {
        let write = async {
            stream.write_all(&self.header).await?;
            if let Some(body) = &self.body {
                stream.write_all(body).await?;
            }
            stream.flush().await
        };

        match timeout_at(deadline, write).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(TransportError::Timeout),
        }
    }
}
