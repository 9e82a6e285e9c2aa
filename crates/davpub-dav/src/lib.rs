//! WebDAV client for davpub.
//!
//! This crate issues the handful of WebDAV operations a build publisher needs
//! (`MKCOL`, `PUT`, `DELETE`, `COPY` and a `HEAD` probe) and returns the final
//! status of each as a plain [`DavResponse`] value. HTTP-level failures are
//! never errors: a `404` or a `503` comes back as a response and the caller
//! decides what it means. Only the inability to perform the exchange at all
//! (connection refused, missing local file, no `curl` binary) is an `Err`.
//!
//! Every request is attempted up to six times. A retry happens only when the
//! status code is in the server-error class (`5xx`, which includes the
//! `500 Unknown` sentinel); the request is replayed verbatim.
//!
//! # Example
//!
//! ```no_run
//! use davpub_dav::{Credentials, DavClient, Depth};
//!
//! let client = DavClient::http(Credentials::new("deploy", "secret"))?;
//! let created = client.create_collection("https://dav.example.com/builds/42")?;
//! println!("MKCOL: {created}");
//!
//! let promoted = client.copy(
//!     "https://dav.example.com/builds/42/",
//!     "https://dav.example.com/builds/LATEST/",
//!     Some(Depth::Infinity),
//! )?;
//! assert!(!promoted.is_server_error());
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use davpub_retry::{RetryExecutor, RetryStrategyConfig};

pub mod curl;
pub mod http;
pub mod status;

pub use curl::CurlTransport;
pub use http::HttpTransport;

/// Content type sent with `MKCOL` and `DELETE`.
pub const XML_CONTENT_TYPE: &str = "text/xml; charset=\"utf-8\"";

/// Status code of the sentinel response.
pub const UNKNOWN_STATUS: &str = "500";

/// Reason phrase of the sentinel response.
pub const UNKNOWN_MESSAGE: &str = "Unknown";

/// Basic-auth credentials, fixed for the lifetime of a client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// WebDAV methods issued by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DavMethod {
    Mkcol,
    Put,
    Delete,
    Copy,
    Head,
}

impl DavMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DavMethod::Mkcol => "MKCOL",
            DavMethod::Put => "PUT",
            DavMethod::Delete => "DELETE",
            DavMethod::Copy => "COPY",
            DavMethod::Head => "HEAD",
        }
    }
}

impl fmt::Display for DavMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of the `Depth` header on a `COPY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Depth {
    Zero,
    One,
    Infinity,
}

impl Depth {
    pub fn header_value(&self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
        }
    }
}

/// One WebDAV request, independent of how it is carried over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavRequest {
    pub method: DavMethod,
    pub url: String,
    /// Local file streamed as the request body (`PUT` only).
    pub body: Option<PathBuf>,
    /// `Destination` header (`COPY` only).
    pub destination: Option<String>,
    pub depth: Option<Depth>,
}

impl DavRequest {
    fn bare(method: DavMethod, url: &str) -> Self {
        Self {
            method,
            url: url.to_string(),
            body: None,
            destination: None,
            depth: None,
        }
    }

    pub fn mkcol(url: &str) -> Self {
        Self::bare(DavMethod::Mkcol, url)
    }

    pub fn put(url: &str, local_file: &Path) -> Self {
        Self {
            body: Some(local_file.to_path_buf()),
            ..Self::bare(DavMethod::Put, url)
        }
    }

    pub fn delete(url: &str) -> Self {
        Self::bare(DavMethod::Delete, url)
    }

    /// The destination travels in a header; only the source is in the request line.
    pub fn copy(src: &str, dest: &str, depth: Option<Depth>) -> Self {
        Self {
            destination: Some(dest.to_string()),
            depth,
            ..Self::bare(DavMethod::Copy, src)
        }
    }

    pub fn head(url: &str) -> Self {
        Self::bare(DavMethod::Head, url)
    }

    pub fn sends_xml_content_type(&self) -> bool {
        matches!(self.method, DavMethod::Mkcol | DavMethod::Delete)
    }
}

/// Final status of a request: a three-digit code and its reason phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavResponse {
    pub status: String,
    pub message: String,
    /// Number of attempts the client made to obtain this response.
    pub attempts: u32,
}

impl DavResponse {
    pub fn new(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
            attempts: 1,
        }
    }

    /// The `500 Unknown` sentinel used when no final status could be determined.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_STATUS, UNKNOWN_MESSAGE)
    }

    pub fn is_unknown(&self) -> bool {
        self.status == UNKNOWN_STATUS && self.message == UNKNOWN_MESSAGE
    }

    /// Server-error class: the status code starts with `5`.
    pub fn is_server_error(&self) -> bool {
        self.status.starts_with('5')
    }

    pub fn is_success(&self) -> bool {
        self.status.starts_with('2')
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status.parse().ok()
    }

    fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

impl fmt::Display for DavResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.status, self.message)
    }
}

/// Carries a single request to the server and reports its final status.
///
/// Implementations do not retry; [`DavClient`] owns the retry policy.
pub trait Transport: Send + Sync {
    fn execute(&self, credentials: &Credentials, request: &DavRequest) -> Result<DavResponse>;

    fn name(&self) -> &'static str;
}

/// WebDAV client: credentials, a transport and the retry policy.
pub struct DavClient {
    credentials: Credentials,
    transport: Box<dyn Transport>,
    retry: RetryExecutor,
}

impl fmt::Debug for DavClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DavClient")
            .field("credentials", &self.credentials)
            .field("transport", &self.transport.name())
            .field("retry", self.retry.config())
            .finish()
    }
}

impl DavClient {
    pub fn new(credentials: Credentials, transport: impl Transport + 'static) -> Self {
        Self::from_boxed(credentials, Box::new(transport))
    }

    pub fn from_boxed(credentials: Credentials, transport: Box<dyn Transport>) -> Self {
        Self {
            credentials,
            transport,
            retry: RetryExecutor::default(),
        }
    }

    /// Client over the default HTTP transport.
    pub fn http(credentials: Credentials) -> Result<Self> {
        Ok(Self::new(credentials, HttpTransport::new()?))
    }

    pub fn with_retry(mut self, config: RetryStrategyConfig) -> Self {
        self.retry = RetryExecutor::new(config);
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    pub fn retry_config(&self) -> &RetryStrategyConfig {
        self.retry.config()
    }

    /// `MKCOL`. Creating a collection that already exists is not an error here.
    pub fn create_collection(&self, url: &str) -> Result<DavResponse> {
        self.send(&DavRequest::mkcol(url))
    }

    /// `PUT` the whole content of `local_file`, replacing whatever is at `url`.
    pub fn store(&self, url: &str, local_file: &Path) -> Result<DavResponse> {
        if !local_file.is_file() {
            bail!(
                "cannot upload {} to {url}: local file not found",
                local_file.display()
            );
        }
        self.send(&DavRequest::put(url, local_file))
    }

    /// `DELETE`. Not recursive-safe: the caller must know exactly what `url` is.
    pub fn delete(&self, url: &str) -> Result<DavResponse> {
        self.send(&DavRequest::delete(url))
    }

    /// Server-side `COPY` of `src` to `dest`.
    pub fn copy(&self, src: &str, dest: &str, depth: Option<Depth>) -> Result<DavResponse> {
        self.send(&DavRequest::copy(src, dest, depth))
    }

    /// `HEAD` existence probe.
    pub fn probe_head(&self, url: &str) -> Result<DavResponse> {
        self.send(&DavRequest::head(url))
    }

    /// Execute `request`, replaying it while the server answers `5xx`.
    pub fn send(&self, request: &DavRequest) -> Result<DavResponse> {
        let mut attempts = 0;
        let response = self
            .retry
            .run_with_classification(|attempt| {
                attempts = attempt;
                let response = self.transport.execute(&self.credentials, request)?;
                let retry = response.is_server_error();
                Ok::<_, anyhow::Error>((response, retry))
            })
            .with_context(|| {
                format!(
                    "{} {} failed via {}",
                    request.method,
                    request.url,
                    self.transport.name()
                )
            })?;
        Ok(response.with_attempts(attempts))
    }
}
