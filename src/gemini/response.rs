use bytes::Bytes;

/// Meta sent for the native text format, overriding sniffed detection.
pub const GEMTEXT_MIME: &str = "text/gemini; lang=en; charset=utf-8";

/// Gemini status codes emitted by the server.
///
/// - `Success` (20): body follows
/// - `RedirectTemporary` (31): retry against the meta URL
/// - `NotFound` (51): no resource at the target
/// - `ProxyRequestRefused` (53): request names another host, port or scheme
/// - `BadRequest` (59): malformed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    RedirectTemporary,
    NotFound,
    ProxyRequestRefused,
    BadRequest,
}

impl Status {
    /// Returns the two-digit wire code.
    ///
    /// ```
    /// # use lantern::gemini::response::Status;
    /// assert_eq!(Status::Success.as_u8(), 20);
    /// assert_eq!(Status::BadRequest.as_u8(), 59);
    /// ```
    pub fn as_u8(&self) -> u8 {
        match self {
            Status::Success => 20,
            Status::RedirectTemporary => 31,
            Status::NotFound => 51,
            Status::ProxyRequestRefused => 53,
            Status::BadRequest => 59,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }
}

/// The single reply produced for a connection.
///
/// A body is carried only by `Success` responses; the constructors are the
/// only way to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    /// Content type on success, target URL on redirect, reason otherwise.
    pub meta: String,
    body: Option<Bytes>,
}

impl Response {
    pub fn success(meta: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status: Status::Success,
            meta: meta.into(),
            body: Some(body.into()),
        }
    }

    pub fn redirect(target: impl Into<String>) -> Self {
        Self {
            status: Status::RedirectTemporary,
            meta: target.into(),
            body: None,
        }
    }

    /// An error reply. `Success` is coerced to `BadRequest` so that a
    /// body-less response never claims success.
    pub fn error(status: Status, message: impl Into<String>) -> Self {
        let status = if status.is_success() {
            Status::BadRequest
        } else {
            status
        };
        Self {
            status,
            meta: message.into(),
            body: None,
        }
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}
