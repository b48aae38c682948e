//! Gemini protocol implementation.
//!
//! One request per connection: a single CRLF-terminated URL in, a single
//! status line (plus body on success) out, then close.
//!
//! # Architecture
//!
//! - **`connection`**: the per-connection state machine driving the stages below
//! - **`reader`**: reads and frames the request line
//! - **`request`**: parses the line as a URL and checks it is addressed to us
//! - **`resolver`**: maps the path to a file under the content root
//! - **`mime`**: content type detection
//! - **`response`** / **`writer`**: the reply and its wire form
//! - **`error`**: per-stage errors and their status codes
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Read one CRLF-terminated line
//!        └──────┬──────┘
//!               ▼
//!        ┌──────────────────┐
//!        │   Validating     │ ← Scheme, host, port; empty path redirects
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │   Resolving      │ ← Traversal check, open, read
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │   Responding     │ ← Status line, then body on success
//!        └──────┬───────────┘
//!               ▼
//!            Closed
//! ```
//!
//! A failure in any stage jumps to `Responding` with its error reply, or
//! straight to `Closed` when it has none (bad framing, transport errors).
//!
//! # Example
//!
//! ```ignore
//! use lantern::gemini::connection::Connection;
//!
//! let deadline = tokio::time::Instant::now() + config.deadline();
//! let stream = acceptor.accept(socket).await?;
//! Connection::new(stream, config, deadline).run().await?;
//! ```

pub mod connection;
pub mod error;
pub mod mime;
pub mod reader;
pub mod request;
pub mod resolver;
pub mod response;
pub mod writer;
