//! # davpub
//!
//! Publishes the artifacts of a build (distribution archives, their digest
//! sidecars, documentation) to a WebDAV store, proves every upload is
//! fetchable, and promotes the build to a stable alias.
//!
//! ## Pipeline
//!
//! A run is linear and stops at the first failed verification:
//!
//! 1. create the remote build root(s)
//! 2. upload every tracked file and its `.sha1` / `.md5` sidecars
//! 3. `HEAD` each upload and require a `200`
//! 4. upload documentation archives and the HTML documentation tree
//! 5. write the ledger of published URLs and upload it
//! 6. server-side `COPY` of the build root onto `LATEST` (incremental builds)
//! 7. verify the distribution again under the alias
//!
//! Already-published files are never rolled back and promotion never deletes
//! the build root, so a failed run leaves its remote state for inspection.
//!
//! ## Modules
//!
//! - [`publisher`]: the run orchestration for incremental and release builds
//! - [`toolkit`]: directory creation, tree upload, verification, digest discovery
//! - [`ledger`]: the ordered record of published URLs
//! - [`config`]: `davpub.toml` loading and client construction
//! - [`credentials`]: credentials file and environment lookup
//! - [`reporter`]: progress reporting seam
//! - [`error`]: fatal, matchable failures

/// Configuration file (`davpub.toml`) loading and client construction.
pub mod config;

/// Credentials file and environment lookup.
pub mod credentials;

/// Fatal, matchable run failures.
pub mod error;

/// Ordered record of every URL published during a run.
pub mod ledger;

/// Incremental and release publish runs.
pub mod publisher;

/// Progress reporting seam.
pub mod reporter;

/// Directory, tree and verification operations over the WebDAV client.
pub mod toolkit;

/// WebDAV client and transports.
/// Re-exported from the davpub-dav microcrate.
pub use davpub_dav as dav;

/// Retry strategies.
/// Re-exported from the davpub-retry microcrate.
pub use davpub_retry as retry;
