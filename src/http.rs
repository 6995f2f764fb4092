//! Shared HTTP plumbing for the provider clients.

use std::time::Duration;

const USER_AGENT: &str = concat!("hubdist/", env!("CARGO_PKG_VERSION"));

/// Blocking agent with the request timeout and user agent every client sends.
pub(crate) fn agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

