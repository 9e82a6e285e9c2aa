//! HTTP transport over a blocking `reqwest` client.

use std::fs::File;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Method;
use reqwest::blocking::{Body, Client};
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect;

use crate::{Credentials, DavRequest, DavResponse, Transport, XML_CONTENT_TYPE};

/// Default timeout for a single request, uploads included.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("davpub/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct HttpTransport {
    timeout: Duration,
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::none())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { timeout, client })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Transport for HttpTransport {
    fn execute(&self, credentials: &Credentials, request: &DavRequest) -> Result<DavResponse> {
        let method = Method::from_bytes(request.method.as_str().as_bytes())
            .with_context(|| format!("invalid HTTP method {}", request.method))?;

        let mut builder = self
            .client
            .request(method, request.url.as_str())
            .basic_auth(credentials.username(), Some(credentials.password()));

        if request.sends_xml_content_type() {
            builder = builder.header(CONTENT_TYPE, XML_CONTENT_TYPE);
        }
        if let Some(destination) = &request.destination {
            builder = builder.header("Destination", destination.as_str());
        }
        if let Some(depth) = request.depth {
            builder = builder.header("Depth", depth.header_value());
        }
        if let Some(path) = &request.body {
            let file = File::open(path)
                .with_context(|| format!("failed to open {} for upload", path.display()))?;
            let len = file
                .metadata()
                .with_context(|| format!("failed to stat {}", path.display()))?
                .len();
            builder = builder.body(Body::sized(file, len));
        }

        let response = builder
            .send()
            .with_context(|| format!("{} {} request failed", request.method, request.url))?;

        let status = response.status();
        Ok(DavResponse::new(
            status.as_str(),
            status.canonical_reason().unwrap_or(crate::UNKNOWN_MESSAGE),
        ))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
