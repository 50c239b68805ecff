//! Connectivity tracking and the HTTP transport.

mod http;
mod status;
mod transport;

pub use http::HttpTransport;
pub use status::{NetworkStatus, StatusSnapshot, Subscription};
pub use transport::{NetworkError, Transport};

#[cfg(test)]
pub(crate) use transport::testing;
