use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use davpub_dav::http::DEFAULT_TIMEOUT_SECS;
use davpub_dav::{Credentials, CurlTransport, DavClient, HttpTransport};
use davpub_retry::RetryStrategyConfig;
use serde::{Deserialize, Serialize};

/// Name of the configuration file looked up in the project root.
pub const CONFIG_FILE: &str = "davpub.toml";

/// Where incremental builds are published unless configured otherwise.
pub const DEFAULT_INCREMENTAL_BASE_URL: &str =
    "https://repository-projectodd.forge.cloudbees.com/incremental/immutant";

/// Configuration loaded from `davpub.toml`.
///
/// Every table is optional; absent keys take the values of [`Config::default`].
/// The defaults describe an Immutant build, including its slim to bin alias.
/// An explicit `[[aliases]]` list replaces that alias; `aliases = []` disables it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub retry: RetryStrategyConfig,
    pub layout: LayoutConfig,
    pub release: ReleaseConfig,
    pub aliases: Vec<AliasConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            retry: RetryStrategyConfig::default(),
            layout: LayoutConfig::default(),
            release: ReleaseConfig::default(),
            aliases: vec![AliasConfig {
                from: "immutant-dist-slim.zip".to_string(),
                to: "immutant-dist-bin.zip".to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// In-process HTTP client.
    #[default]
    Http,
    /// External `curl` process per request.
    Curl,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Http => "http",
            TransportKind::Curl => "curl",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub incremental_base_url: String,
    /// Per-request timeout of the HTTP transport.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub transport: TransportKind,
    /// Overrides the curl executable; `DAVPUB_CURL_BIN` is used when unset.
    pub curl_program: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            incremental_base_url: DEFAULT_INCREMENTAL_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            transport: TransportKind::Http,
            curl_program: None,
        }
    }
}

/// Local inputs, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Directory holding the distribution files.
    pub dist_dir: PathBuf,
    /// Tracked distribution file names inside `dist_dir`.
    pub dist_files: Vec<String>,
    /// Generated HTML documentation, uploaded under `html-docs`.
    pub docs_tree: Option<PathBuf>,
    /// Documentation archives published by release runs.
    pub doc_files: Vec<PathBuf>,
    /// Local copy of the ledger written at the end of a run.
    pub ledger_file: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            dist_dir: PathBuf::from("build/dist/target"),
            dist_files: [
                "immutant-dist-slim.zip",
                "immutant-dist-full.zip",
                "immutant-dist-modules.zip",
                "build-metadata.json",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            docs_tree: Some(PathBuf::from("docs/target/html")),
            doc_files: vec![PathBuf::from("docs/target/immutant-docs-bin.zip")],
            ledger_file: PathBuf::from("build/incremental/target/published-artifacts.json"),
        }
    }
}

/// Naming used by release runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Leading name segment after which the version is inserted.
    pub name_prefix: String,
    pub dist_namespace: String,
    pub docs_namespace: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            name_prefix: "immutant".to_string(),
            dist_namespace: "org/immutant/immutant-dist".to_string(),
            docs_namespace: "org/immutant/immutant-docs".to_string(),
        }
    }
}

/// Server-side copy of one published leaf to another leaf of the same root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasConfig {
    pub from: String,
    pub to: String,
}

impl Config {
    /// Build the WebDAV client described by `[remote]` and `[retry]`.
    pub fn dav_client(&self, credentials: Credentials) -> Result<DavClient> {
        let client = match self.remote.transport {
            TransportKind::Http => {
                let transport = HttpTransport::with_timeout(self.remote.timeout)?;
                DavClient::new(credentials, transport)
            }
            TransportKind::Curl => {
                let transport = match &self.remote.curl_program {
                    Some(program) => CurlTransport::with_program(program.clone()),
                    None => CurlTransport::new(),
                };
                DavClient::new(credentials, transport)
            }
        };
        Ok(client.with_retry(self.retry.clone()))
    }
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// Load `davpub.toml` from `dir`; a missing file yields the defaults.
pub fn load_config(dir: &Path) -> Result<Config> {
    load_config_from_file(&config_path(dir))
}

/// Load configuration from a specific file path; a missing file yields the defaults.
pub fn load_config_from_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    Ok(config)
}
