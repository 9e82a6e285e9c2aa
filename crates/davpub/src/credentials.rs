use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use davpub_dav::Credentials;
use serde::Deserialize;

pub const USERNAME_ENV: &str = "DAVPUB_USERNAME";
pub const PASSWORD_ENV: &str = "DAVPUB_PASSWORD";

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    servers: Vec<ServerEntry>,
}

#[derive(Debug, Deserialize)]
struct ServerEntry {
    username: String,
    password: String,
}

/// Resolve the credentials used for every request of a run.
///
/// Resolution order:
/// 1) `DAVPUB_USERNAME` and `DAVPUB_PASSWORD`, when both are set and non-empty
/// 2) the first `[[servers]]` entry of the TOML file at `path`
pub fn load_credentials(path: &Path) -> Result<Credentials> {
    if let Some(credentials) = credentials_from_env() {
        return Ok(credentials);
    }
    credentials_from_file(path)
}

fn credentials_from_env() -> Option<Credentials> {
    let username = env::var(USERNAME_ENV).ok()?;
    let password = env::var(PASSWORD_ENV).ok()?;
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return None;
    }
    Some(Credentials::new(username, password))
}

pub fn credentials_from_file(path: &Path) -> Result<Credentials> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read credentials file at {}", path.display()))?;

    let file: CredentialsFile = toml::from_str(&content).with_context(|| {
        format!(
            "failed to parse credentials file as TOML: {}",
            path.display()
        )
    })?;

    let Some(server) = file.servers.into_iter().next() else {
        bail!("no [[servers]] entry in credentials file {}", path.display());
    };
    Ok(Credentials::new(server.username, server.password))
}
