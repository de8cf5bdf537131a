//! stathub-agent: one-shot host-monitoring client.
//!
//! Each invocation collects a snapshot of local machine health and
//! POSTs it to a collector, authenticated with an HMAC token derived
//! from a shared key. First run provisions a persistent identity
//! interactively.

pub mod auth;
pub mod config;
pub mod error;
pub mod probe;
pub mod stat;
pub mod transport;

pub use config::AgentConfig;
pub use stat::StatRecord;
