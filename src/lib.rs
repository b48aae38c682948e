//! Lantern - Gemini protocol server
//!
//! Core library for the request pipeline and its TLS transport.

pub mod config;
pub mod gemini;
pub mod server;
