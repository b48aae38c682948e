use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout_at};

use crate::config::Config;
use crate::gemini::error::ConnectionError;
use crate::gemini::mime;
use crate::gemini::reader::read_request_line;
use crate::gemini::request::{Request, Validated, validate};
use crate::gemini::resolver::Resolver;
use crate::gemini::response::Response;
use crate::gemini::writer::ResponseWriter;

/// Handles exactly one request on an established stream.
pub struct Connection<S> {
    stream: S,
    config: Arc<Config>,
    resolver: Resolver,
    deadline: Instant,
    state: ConnectionState,
}

#[derive(Debug)]
pub enum ConnectionState {
    Reading,
    Validating(String),
    Resolving(Request),
    Responding(Response),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// `deadline` bounds every blocking step from here to close. It is
    /// armed by the caller and never extended.
    pub fn new(stream: S, config: Arc<Config>, deadline: Instant) -> Self {
        let resolver = Resolver::new(config.root_dir.clone());
        Self {
            stream,
            config,
            resolver,
            deadline,
            state: ConnectionState::Reading,
        }
    }

    /// Runs the connection to `Closed` and releases the stream. Returns the
    /// error that ended the exchange early, if any; by then any reply it
    /// called for has already been attempted.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        let mut failure = None;

        loop {
            self.state = match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    match read_request_line(&mut self.stream, self.deadline).await {
                        Ok(line) => ConnectionState::Validating(line),
                        Err(e) => fail(e, &mut failure),
                    }
                }

                ConnectionState::Validating(line) => match validate(&line, &self.config) {
                    Ok(Validated::Resolve(request)) => ConnectionState::Resolving(request),
                    Ok(Validated::Redirect(target)) => {
                        ConnectionState::Responding(Response::redirect(target))
                    }
                    Err(e) => fail(e.into(), &mut failure),
                },

                ConnectionState::Resolving(request) => {
                    match self.resolver.resolve(&request.path, self.deadline).await {
                        Ok(resource) => {
                            let meta = mime::content_type(&resource.path, &resource.body);
                            ConnectionState::Responding(Response::success(meta, resource.body))
                        }
                        Err(e) => fail(e, &mut failure),
                    }
                }

                ConnectionState::Responding(response) => {
                    tracing::info!(
                        status = response.status.as_u8(),
                        meta = %response.meta,
                        "Sending response"
                    );
                    let writer = ResponseWriter::new(&response);
                    if let Err(e) = writer.write_to_stream(&mut self.stream, self.deadline).await {
                        tracing::warn!(error = %e, "There was an error writing to the connection");
                        if failure.is_none() {
                            failure = Some(e.into());
                        }
                    }
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }

        // Best effort: lets a TLS peer see a clean close_notify.
        match timeout_at(self.deadline, self.stream.shutdown()).await {
            Ok(Err(e)) => tracing::debug!(error = %e, "Error closing the connection"),
            Err(_) => tracing::debug!("Deadline elapsed while closing the connection"),
            Ok(Ok(())) => {}
        }

        failure.map_or(Ok(()), Err)
    }
}

/// Records `error` and picks the next state: its reply, or straight to
/// `Closed` when it has none.
fn fail(error: ConnectionError, failure: &mut Option<ConnectionError>) -> ConnectionState {
    tracing::warn!(error = %error, "Request failed");
    let next = match error.reply() {
        Some(response) => ConnectionState::Responding(response),
        None => ConnectionState::Closed,
    };
    *failure = Some(error);
    next
}
