use std::fs;
use std::io::{BufRead, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::error::AgentError;

const CONFIG_FILE: &str = "client.json";
const CERT_FILE: &str = "cert.pem";

/// Persistent agent identity, one per installation. `id` is derived once
/// at provisioning and never changes afterwards.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub server: String,
    pub key: String,
}

/// Directory holding `client.json` and the optional `cert.pem` trust
/// bundle. `STATHUB_AGENT_DIR` overrides the default `~/.stathub`.
pub fn agent_dir() -> anyhow::Result<PathBuf> {
    let dir = match std::env::var_os("STATHUB_AGENT_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("no home directory"))?
            .join(".stathub"),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create agent directory {}", dir.display()))?;
    Ok(dir)
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

pub fn cert_path(dir: &Path) -> PathBuf {
    dir.join(CERT_FILE)
}

/// Read the persisted config. `Ok(None)` means the agent has not been
/// provisioned yet. An existing file that fails to parse is fatal; the
/// agent never silently re-provisions over it.
pub fn load(path: &Path) -> anyhow::Result<Option<AgentConfig>> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("cannot read {}", path.display()))
        }
    };

    let cfg = serde_json::from_slice(&raw).map_err(|source| AgentError::ConfigCorrupt {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(cfg))
}

pub fn store(path: &Path, cfg: &AgentConfig) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(cfg)?;
    fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

/// First-run interactive provisioning. Prompts for a display name
/// (defaulting to the host-reported hostname), the collector URL and the
/// shared key, derives the node id from the key and a pid+timestamp
/// nonce, and persists the result to `path`.
///
/// Generic over reader/writer so the prompt flow is testable without a
/// terminal; `main` passes locked stdin/stdout.
pub fn provision<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    default_name: &str,
    now: i64,
    path: &Path,
) -> anyhow::Result<AgentConfig> {
    let name = prompt(
        input,
        out,
        &format!("> Please enter the NAME of THIS node [{default_name}]: "),
    )?;
    let name = if name.is_empty() {
        default_name.to_string()
    } else {
        name
    };

    let server = prompt_required(input, out, "> Please enter the URL of SERVER: ")?;
    let key = prompt_required(input, out, "> Please enter the KEY of SERVER: ")?;

    // The nonce only needs to be unique in practice across simultaneous
    // first runs, not unguessable.
    let seed = format!("{}{}", std::process::id(), now);

    let cfg = AgentConfig {
        id: auth::token(&key, seed.as_bytes()),
        name,
        server: normalize_server_url(&server),
        key,
    };

    store(path, &cfg)?;

    Ok(cfg)
}

/// Scheme defaulting and trailing-slash stripping for the collector URL:
/// no recognizable `http://`/`https://` prefix gets `http://` prepended,
/// and exactly one trailing `/` is removed if present.
pub fn normalize_server_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();

    let mut url = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    if url.ends_with('/') {
        url.pop();
    }

    url
}

fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, text: &str) -> anyhow::Result<String> {
    write!(out, "{text}")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    Ok(line.trim().to_string())
}

fn prompt_required<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    text: &str,
) -> anyhow::Result<String> {
    loop {
        write!(out, "{text}")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            anyhow::bail!("unexpected end of input during provisioning");
        }

        let value = line.trim();
        if !value.is_empty() {
            return Ok(value.to_string());
        }
    }
}
