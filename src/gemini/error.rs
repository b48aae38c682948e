//! Per-connection error taxonomy.
//!
//! Every variant is local to one connection: it ends that connection's
//! handling and never the process. Client-caused errors carry a fixed
//! status and message; transport errors are never answered.

use thiserror::Error;

use crate::gemini::response::{Response, Status};

/// Problems with what the client sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("request line of {0} bytes exceeds the limit")]
    TooLong(usize),

    #[error("request line is not valid UTF-8")]
    InvalidEncoding,

    #[error("request line does not end with CRLF")]
    MalformedFraming,

    #[error("request line is empty")]
    Empty,

    #[error("request is not a valid URL: {0}")]
    BadUrl(String),

    #[error("URL hostname is blank: {0}")]
    EmptyHost(String),

    #[error("URL port {0} does not match the bound port")]
    WrongPort(String),

    #[error("URL hostname {0} does not match the configured hostname")]
    WrongHost(String),

    #[error("URL scheme {0} is not accepted")]
    BadScheme(String),

    #[error("clean and original paths don't match: {cleaned} != {original}")]
    BadPath { original: String, cleaned: String },
}

impl RequestError {
    /// The reply for this error, or `None` when the connection must close
    /// without writing anything.
    pub fn reply(&self) -> Option<Response> {
        let (status, message) = match self {
            RequestError::TooLong(_) => (Status::BadRequest, "URL too long"),
            RequestError::InvalidEncoding => (Status::BadRequest, "Non-UTF8 URL"),
            RequestError::MalformedFraming => return None,
            RequestError::Empty => (Status::BadRequest, "Empty URL"),
            RequestError::BadUrl(_) => (Status::BadRequest, "Bad URL"),
            RequestError::EmptyHost(_) => (Status::BadRequest, "Empty hostname"),
            RequestError::WrongPort(_) => (Status::ProxyRequestRefused, "Wrong port"),
            RequestError::WrongHost(_) => (Status::ProxyRequestRefused, "Wrong hostname"),
            RequestError::BadScheme(_) => (Status::ProxyRequestRefused, "URL Scheme Not Accepted"),
            RequestError::BadPath { .. } => (Status::BadRequest, "Bad path"),
        };
        Some(Response::error(status, message))
    }
}

/// Problems turning a validated path into bytes.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to open {path}: {source}")]
    NotFound {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

impl ResourceError {
    pub fn reply(&self) -> Response {
        match self {
            ResourceError::NotFound { .. } => Response::error(Status::NotFound, "File not found"),
            ResourceError::Read { .. } => Response::error(Status::BadRequest, "File read error"),
        }
    }
}

/// Stream-level failures. Never answered, never retried.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection deadline elapsed")]
    Timeout,

    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ConnectionError {
    pub fn reply(&self) -> Option<Response> {
        match self {
            ConnectionError::Request(e) => e.reply(),
            ConnectionError::Resource(e) => Some(e.reply()),
            ConnectionError::Transport(_) => None,
        }
    }
}
