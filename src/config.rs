//! GRIP settings from the process environment.

use grip_core::{parse_grip_uri, GripProxy};

use crate::error::FaasError;

pub mod env_vars {
    /// JSON array of proxy entries (`control_uri`, `control_iss`, `key`).
    pub const GRIP_PROXIES: &str = "GRIP_PROXIES";
    /// A single GRIP URI, appended after `GRIP_PROXIES`.
    pub const GRIP_URL: &str = "GRIP_URL";
    /// Prefix applied to every channel name.
    pub const GRIP_PREFIX: &str = "GRIP_PREFIX";
}

/// Proxy list built from `GRIP_PROXIES` then `GRIP_URL`.
pub fn proxies_from_env() -> Result<Vec<GripProxy>, FaasError> {
    proxies_from_lookup(|name| std::env::var(name).ok())
}

/// Same as [`proxies_from_env`] with a custom variable source.
pub fn proxies_from_lookup<F>(lookup: F) -> Result<Vec<GripProxy>, FaasError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut proxies = Vec::new();

    if let Some(raw) = non_empty(lookup(env_vars::GRIP_PROXIES)) {
        let entries: Vec<GripProxy> = serde_json::from_str(&raw)
            .map_err(|e| FaasError::Config(format!("{}: {e}", env_vars::GRIP_PROXIES)))?;
        proxies.extend(entries);
    }

    if let Some(uri) = non_empty(lookup(env_vars::GRIP_URL)) {
        proxies.push(parse_grip_uri(&uri)?);
    }

    Ok(proxies)
}

/// Channel prefix, empty when unset. Read on every call.
pub fn grip_prefix() -> String {
    prefix_from_lookup(|name| std::env::var(name).ok())
}

pub fn prefix_from_lookup<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(env_vars::GRIP_PREFIX).unwrap_or_default()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
