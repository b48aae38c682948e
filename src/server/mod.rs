//! Transport: TLS material and the accept loop.

pub mod listener;
pub mod tls;
