use std::fs;
use std::path::Path;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Certificate;
use url::Url;

use crate::error::AgentError;

const USER_AGENT_STRING: &str = concat!("stathub-agent/", env!("CARGO_PKG_VERSION"));

/// Deliver one signed payload to the collector.
///
/// POSTs the raw payload bytes to `<server>/api/stat` with the token in
/// `X-Client-Key`. An empty response body is success; a non-empty body
/// is the collector's error message. Single best-effort attempt, no
/// retries.
pub fn send(
    server: &str,
    payload: Vec<u8>,
    token: &str,
    cert_path: &Path,
) -> Result<(), AgentError> {
    let client = build_client(server, cert_path)?;
    let endpoint = format!("{server}/api/stat");

    let response = client
        .post(&endpoint)
        .header("X-Client-Key", token)
        .header(CONTENT_TYPE, "application/json")
        .header(USER_AGENT, USER_AGENT_STRING)
        .body(payload)
        .send()
        .map_err(|source| AgentError::Transport {
            url: endpoint.clone(),
            source,
        })?;

    let body = response.text().map_err(|source| AgentError::Transport {
        url: endpoint,
        source,
    })?;

    if body.is_empty() {
        Ok(())
    } else {
        Err(AgentError::ServerRejected(body))
    }
}

/// Plain client for http; for https, a client trusting only the pinned
/// PEM bundle at `cert_path`. Built-in roots stay disabled so the
/// collector certificate must chain to the pinned anchors. Trust
/// material problems abort before any network I/O.
fn build_client(server: &str, cert_path: &Path) -> Result<Client, AgentError> {
    if !is_https(server) {
        return Ok(Client::new());
    }

    let pem = fs::read(cert_path).map_err(|source| AgentError::TrustMaterialMissing {
        path: cert_path.to_path_buf(),
        source,
    })?;

    let anchors = Certificate::from_pem_bundle(&pem).map_err(|_| AgentError::TrustMaterialInvalid {
        path: cert_path.to_path_buf(),
    })?;
    if anchors.is_empty() {
        return Err(AgentError::TrustMaterialInvalid {
            path: cert_path.to_path_buf(),
        });
    }

    let mut builder = Client::builder().tls_built_in_root_certs(false);
    for anchor in anchors {
        builder = builder.add_root_certificate(anchor);
    }

    builder.build().map_err(|source| AgentError::Transport {
        url: server.to_string(),
        source,
    })
}

fn is_https(server: &str) -> bool {
    Url::parse(server)
        .map(|u| u.scheme() == "https")
        .unwrap_or(false)
}
