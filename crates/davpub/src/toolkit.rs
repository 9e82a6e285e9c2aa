use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use davpub_dav::{DavClient, DavResponse, Depth};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use walkdir::WalkDir;

use crate::error::PublishError;
use crate::ledger::Ledger;
use crate::reporter::Reporter;

/// Digest sidecar extensions, in publication order.
pub const DIGEST_SUFFIXES: [&str; 2] = ["sha1", "md5"];

/// Bytes escaped in a path segment: everything except RFC 3986 unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Join a URL and a relative leaf with exactly one `/` between them.
///
/// Each `/`-separated segment of `leaf` is percent-encoded; `base` is used as given.
pub fn join_url(base: &str, leaf: &str) -> String {
    let leaf = leaf
        .trim_start_matches('/')
        .split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{leaf}", base.trim_end_matches('/'))
}

/// `url` with exactly one trailing `/`, as collection copies require.
pub fn collection_url(url: &str) -> String {
    format!("{}/", url.trim_end_matches('/'))
}

/// `path` plus `.<suffix>` appended to the whole file name.
pub fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Each input followed by whichever of its `.sha1` / `.md5` sidecars exist.
///
/// Sidecar discovery is a point-in-time check of the local filesystem.
pub fn enumerate_with_digests(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut out = Vec::with_capacity(paths.len() * 3);
    for path in paths {
        out.push(path.clone());
        for suffix in DIGEST_SUFFIXES {
            let sidecar = sidecar_path(path, suffix);
            if sidecar.is_file() {
                out.push(sidecar);
            }
        }
    }
    out
}

/// Final path component as a string, for building remote leaf names.
pub fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("path has no file name: {}", path.display()))
}

/// Relative path joined with `/`, dropping `.` components.
fn relative_url_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Outcome of [`Toolkit::upload_tree`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeUpload {
    pub directories: usize,
    pub files: usize,
    /// Remote URLs whose final status was not `2xx`.
    pub failed: Vec<String>,
}

/// Publishing primitives built on [`DavClient`], each logged through a [`Reporter`].
///
/// None of them interpret HTTP failures except [`Toolkit::verify_fetchable`];
/// results are logged and returned as values.
pub struct Toolkit {
    dav: DavClient,
}

impl Toolkit {
    pub fn new(dav: DavClient) -> Self {
        Self { dav }
    }

    pub fn dav(&self) -> &DavClient {
        &self.dav
    }

    /// `MKCOL url`. An existing collection is not an error.
    pub fn ensure_remote_dir(&self, url: &str, reporter: &mut dyn Reporter) -> Result<DavResponse> {
        reporter.info(&format!("MKCOL {url}"));
        let response = self.dav.create_collection(url)?;
        report_result(reporter, &response);
        Ok(response)
    }

    /// `PUT local_file` to `url`, recording `url` in the ledger when asked to
    /// and the final status is not a server error.
    pub fn publish_file(
        &self,
        url: &str,
        local_file: &Path,
        remember: bool,
        ledger: &mut Ledger,
        reporter: &mut dyn Reporter,
    ) -> Result<DavResponse> {
        reporter.info(&format!("PUT {} -> {url}", local_file.display()));
        let response = self.dav.store(url, local_file)?;
        report_result(reporter, &response);
        if remember && !response.is_server_error() {
            ledger.record(url);
        }
        Ok(response)
    }

    /// Server-side copy of a single resource; the destination is recorded on
    /// any status that is not a server error.
    pub fn copy_file(
        &self,
        src: &str,
        dest: &str,
        depth: Option<Depth>,
        ledger: &mut Ledger,
        reporter: &mut dyn Reporter,
    ) -> Result<DavResponse> {
        reporter.info(&format!("COPY {src} -> {dest}"));
        let response = self.dav.copy(src, dest, depth)?;
        report_result(reporter, &response);
        if !response.is_server_error() {
            ledger.record(dest);
        }
        Ok(response)
    }

    /// Recursive server-side copy of the collection `src_root` onto `dest_root`.
    ///
    /// Destination contents are replaced; the source is left in place.
    pub fn promote_tree(
        &self,
        src_root: &str,
        dest_root: &str,
        reporter: &mut dyn Reporter,
    ) -> Result<DavResponse> {
        let src = collection_url(src_root);
        let dest = collection_url(dest_root);
        reporter.info(&format!("COPY {src} -> {dest} (depth infinity)"));
        let response = self.dav.copy(&src, &dest, Some(Depth::Infinity))?;
        report_result(reporter, &response);
        Ok(response)
    }

    /// Mirror the local directory `local_root` under `dest_root`.
    ///
    /// Directories become collections and files are uploaded in a
    /// deterministic walk order (parents before children, siblings by name).
    /// Only `dest_root` itself is recorded in the ledger.
    pub fn upload_tree(
        &self,
        dest_root: &str,
        local_root: &Path,
        ledger: &mut Ledger,
        reporter: &mut dyn Reporter,
    ) -> Result<TreeUpload> {
        let mut summary = TreeUpload::default();

        for entry in WalkDir::new(local_root).min_depth(1).sort_by_file_name() {
            let entry = entry.with_context(|| format!("failed to walk {}", local_root.display()))?;
            let relative = entry.path().strip_prefix(local_root).with_context(|| {
                format!(
                    "{} is not under {}",
                    entry.path().display(),
                    local_root.display()
                )
            })?;
            let url = join_url(dest_root, &relative_url_path(relative));

            if entry.file_type().is_dir() {
                self.ensure_remote_dir(&url, reporter)?;
                summary.directories += 1;
            } else if entry.path().is_file() {
                let response = self.publish_file(&url, entry.path(), false, ledger, reporter)?;
                summary.files += 1;
                if !response.is_success() {
                    summary.failed.push(url);
                }
            } else {
                reporter.warn(&format!("skipping {}: not a regular file", entry.path().display()));
            }
        }

        ledger.record(dest_root);
        Ok(summary)
    }

    /// `HEAD base_url/file_name`; anything but `200` is a [`PublishError::Verification`].
    pub fn verify_fetchable(
        &self,
        base_url: &str,
        file_name: &str,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        let url = join_url(base_url, file_name);
        reporter.info(&format!("HEAD {url}"));
        let response = self.dav.probe_head(&url)?;
        report_result(reporter, &response);

        if response.status_code() != Some(200) {
            let err = PublishError::Verification {
                artifact: file_name.to_string(),
                status: response.status,
                message: response.message,
            };
            reporter.error(&err.to_string());
            return Err(err.into());
        }
        Ok(())
    }
}

fn report_result(reporter: &mut dyn Reporter, response: &DavResponse) {
    if response.attempts > 1 {
        reporter.warn(&format!(
            "needed {} attempts (final: {response})",
            response.attempts
        ));
    }
    if response.is_server_error() {
        reporter.warn(&format!("Result: {response}"));
    } else {
        reporter.info(&format!("Result: {response}"));
    }
}
