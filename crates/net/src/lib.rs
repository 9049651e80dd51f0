//! Tider Net
//!
//! HTTP API client for the booking backend: request authentication,
//! wire types, and the error taxonomy for failed calls.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiClient, RequestAuthenticator, TokenSource};
pub use error::{Error, Result};
