//! Access logging port.
//!
//! The dispatcher reports one [`AccessEntry`] per finished request through an
//! [`AccessLog`]. Health checks are never reported.

use std::net::SocketAddr;

use tracing::info;

use crate::http::{Method, StatusCode, Values};

/// What the dispatcher knows about a request once its response is decided.
#[derive(Debug, Clone)]
pub struct AccessEntry<'a> {
    pub remote_addr: Option<SocketAddr>,
    pub method: &'a Method,
    pub uri: &'a str,
    pub protocol: &'a str,
    pub query: &'a Values,
    /// The request body, when finalize wrote a JSON response and a handler read it.
    pub body: Option<&'a [u8]>,
    /// The status actually sent, after any serialization fallback.
    pub status: StatusCode,
    pub user_agent: Option<&'a str>,
    pub referer: Option<&'a str>,
}

pub trait AccessLog: Send + Sync {
    fn record(&self, entry: &AccessEntry<'_>);
}

/// Emits each entry as an `info` event under the `access` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAccessLog;

impl AccessLog for TracingAccessLog {
    fn record(&self, entry: &AccessEntry<'_>) {
        let remote = entry
            .remote_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "-".to_owned());
        let body = entry.body.map(String::from_utf8_lossy);

        info!(
            target: "access",
            remote = %remote,
            method = %entry.method,
            uri = entry.uri,
            protocol = entry.protocol,
            query = ?entry.query,
            body = body.as_deref().unwrap_or(""),
            status = entry.status.as_u16(),
            user_agent = entry.user_agent.unwrap_or(""),
            referer = entry.referer.unwrap_or(""),
        );
    }
}
