//! HTTP transport shared by the provider implementations.

pub mod http;

pub use http::{HttpTransport, TransportError};
