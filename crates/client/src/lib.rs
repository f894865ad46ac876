//! Client for the content-and-voting API.
//!
//! A [`ServiceEndpoint`] owns the connection pool and request metrics for one
//! API host. Each simulated actor gets its own [`ServiceClient`] from
//! [`ServiceEndpoint::connect`], holding that actor's token and cached identity.
//!
//! Every failure (non-accepted status, malformed body, connection error, or a
//! call made before authenticating) is reported as an [`ApiError`].

mod client;
mod error;
pub mod metrics;
pub mod url;

pub use client::{ServiceClient, ServiceEndpoint, ACCEPTED_STATUSES};
pub use error::ApiError;
pub use metrics::{Operation, OperationSummary, RequestMetrics};
pub use url::{build_url, reduce_slashes};
