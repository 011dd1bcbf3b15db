//! HTTP Client Factory
//!
//! Builds the reqwest clients the providers share. Every backend call is a
//! blocking network operation from the engine's perspective, so each client
//! carries a bounded request timeout: a hang in an embedding or generation
//! call must not hang the whole `analyze` request.

use std::time::Duration;

/// Build a `reqwest::Client` with the given per-request timeout.
pub fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("failed to build reqwest client")
}
