use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use davpub_dav::{DavClient, Depth};
use serde::{Deserialize, Serialize};

use crate::config::{AliasConfig, Config, ReleaseConfig};
use crate::error::PublishError;
use crate::ledger::{LEDGER_FILE_NAME, Ledger};
use crate::reporter::Reporter;
use crate::toolkit::{DIGEST_SUFFIXES, Toolkit, enumerate_with_digests, file_name, join_url};

/// Alias collection that incremental builds are promoted onto.
pub const LATEST_ALIAS: &str = "LATEST";

/// Collection under the docs root that receives the HTML documentation tree.
pub const DOCS_DIR_NAME: &str = "html-docs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PublishMode {
    /// Build `<base>/<build_number>`, promoted to `<base>/LATEST`.
    Incremental { build_number: u64 },
    /// Versioned namespaces, file names rewritten with the version, no promotion.
    Release { version: String },
}

/// Progress of a run. `Failed` is terminal and keeps already-published files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Init,
    RootCreated,
    DistributionPublished,
    DistributionVerified,
    DocsPublished,
    LedgerWritten,
    Promoted,
    PromotionVerified,
    Done,
    Failed,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Init => "init",
            RunStage::RootCreated => "root_created",
            RunStage::DistributionPublished => "distribution_published",
            RunStage::DistributionVerified => "distribution_verified",
            RunStage::DocsPublished => "docs_published",
            RunStage::LedgerWritten => "ledger_written",
            RunStage::Promoted => "promoted",
            RunStage::PromotionVerified => "promotion_verified",
            RunStage::Done => "done",
            RunStage::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote roots of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destinations {
    pub dist_root: String,
    /// Equal to `dist_root` for incremental builds.
    pub docs_root: String,
    /// Promotion target; only incremental builds have one.
    pub alias_root: Option<String>,
}

impl Destinations {
    pub fn incremental(base_url: &str, build_number: u64) -> Self {
        let dist_root = join_url(base_url, &build_number.to_string());
        Self {
            docs_root: dist_root.clone(),
            dist_root,
            alias_root: Some(join_url(base_url, LATEST_ALIAS)),
        }
    }

    pub fn release(base_url: &str, version: &str, release: &ReleaseConfig) -> Self {
        let dist_ns = join_url(base_url, &release.dist_namespace);
        let docs_ns = join_url(base_url, &release.docs_namespace);
        Self {
            dist_root: join_url(&dist_ns, version),
            docs_root: join_url(&docs_ns, version),
            alias_root: None,
        }
    }

    pub fn for_mode(mode: &PublishMode, base_url: &str, release: &ReleaseConfig) -> Self {
        match mode {
            PublishMode::Incremental { build_number } => Self::incremental(base_url, *build_number),
            PublishMode::Release { version } => Self::release(base_url, version, release),
        }
    }
}

/// Insert `-<version>` after the first name segment following `<prefix>-`.
///
/// `immutant-dist-slim.zip` becomes `immutant-dist-1.2.0-slim.zip`; names
/// that do not start with `<prefix>-` are returned unchanged.
pub fn versioned_file_name(name: &str, prefix: &str, version: &str) -> String {
    let Some(rest) = name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
    else {
        return name.to_string();
    };
    let stem_len = rest.find(['-', '.']).unwrap_or(rest.len());
    let (stem, tail) = rest.split_at(stem_len);
    format!("{prefix}-{stem}-{version}{tail}")
}

/// Local inputs of a run, resolved against the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishLayout {
    pub dist_files: Vec<PathBuf>,
    pub doc_files: Vec<PathBuf>,
    pub docs_tree: Option<PathBuf>,
    /// Incremental runs always publish the docs tree; release runs only when present.
    pub docs_tree_required: bool,
    pub ledger_path: PathBuf,
    pub aliases: Vec<AliasConfig>,
    pub name_prefix: String,
}

impl PublishLayout {
    pub fn from_config(root: &Path, config: &Config, mode: &PublishMode) -> Self {
        let release = matches!(mode, PublishMode::Release { .. });
        let dist_dir = root.join(&config.layout.dist_dir);
        Self {
            dist_files: config
                .layout
                .dist_files
                .iter()
                .map(|f| dist_dir.join(f))
                .collect(),
            doc_files: if release {
                config.layout.doc_files.iter().map(|f| root.join(f)).collect()
            } else {
                Vec::new()
            },
            docs_tree: config.layout.docs_tree.as_ref().map(|d| root.join(d)),
            docs_tree_required: !release,
            ledger_path: root.join(&config.layout.ledger_file),
            aliases: config.aliases.clone(),
            name_prefix: config.release.name_prefix.clone(),
        }
    }

    /// Every primary tracked file (and a required docs tree) must exist locally.
    pub fn check_preconditions(&self) -> Result<(), PublishError> {
        let missing: Vec<PathBuf> = self
            .dist_files
            .iter()
            .chain(&self.doc_files)
            .filter(|p| !p.is_file())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PublishError::MissingArtifacts { paths: missing });
        }
        if self.docs_tree_required
            && let Some(tree) = &self.docs_tree
            && !tree.is_dir()
        {
            return Err(PublishError::MissingDocs { path: tree.clone() });
        }
        Ok(())
    }

    fn docs_tree_to_publish(&self) -> Option<PathBuf> {
        self.docs_tree.clone().filter(|tree| tree.is_dir())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Distribution,
    Documentation,
}

/// One local file and where it will be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedUpload {
    pub section: Section,
    pub local: PathBuf,
    /// Remote file name, after version rewriting.
    pub leaf: String,
    pub url: String,
}

fn remote_name(mode: &PublishMode, prefix: &str, name: &str) -> String {
    match mode {
        PublishMode::Incremental { .. } => name.to_string(),
        PublishMode::Release { version } => versioned_file_name(name, prefix, version),
    }
}

/// Uploads a run would perform, digests included, without touching the server.
pub fn plan_uploads(
    mode: &PublishMode,
    destinations: &Destinations,
    layout: &PublishLayout,
) -> Result<Vec<PlannedUpload>> {
    let sections = [
        (Section::Distribution, &layout.dist_files, &destinations.dist_root),
        (Section::Documentation, &layout.doc_files, &destinations.docs_root),
    ];

    let mut planned = Vec::new();
    for (section, files, root) in sections {
        for local in enumerate_with_digests(files) {
            let leaf = remote_name(mode, &layout.name_prefix, &file_name(&local)?);
            planned.push(PlannedUpload {
                section,
                url: join_url(root, &leaf),
                local,
                leaf,
            });
        }
    }
    Ok(planned)
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReceipt {
    pub mode: PublishMode,
    pub destinations: Destinations,
    pub stage: RunStage,
    pub ledger: Vec<String>,
    pub ledger_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Runs the publish sequence for one build.
///
/// A publisher owns the ledger of its run; every call to
/// [`Publisher::publish_all`] starts from an empty ledger.
pub struct Publisher {
    toolkit: Toolkit,
    mode: PublishMode,
    destinations: Destinations,
    layout: PublishLayout,
    ledger: Ledger,
    stage: RunStage,
}

impl Publisher {
    pub fn new(
        toolkit: Toolkit,
        mode: PublishMode,
        destinations: Destinations,
        layout: PublishLayout,
    ) -> Self {
        Self {
            toolkit,
            mode,
            destinations,
            layout,
            ledger: Ledger::new(),
            stage: RunStage::Init,
        }
    }

    /// Assemble a publisher for `mode` from the configuration of the project at `root`.
    pub fn from_config(
        root: &Path,
        config: &Config,
        mode: PublishMode,
        base_url: &str,
        dav: DavClient,
    ) -> Self {
        let destinations = Destinations::for_mode(&mode, base_url, &config.release);
        let layout = PublishLayout::from_config(root, config, &mode);
        Self::new(Toolkit::new(dav), mode, destinations, layout)
    }

    pub fn mode(&self) -> &PublishMode {
        &self.mode
    }

    pub fn destinations(&self) -> &Destinations {
        &self.destinations
    }

    pub fn layout(&self) -> &PublishLayout {
        &self.layout
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    pub fn plan(&self) -> Result<Vec<PlannedUpload>> {
        plan_uploads(&self.mode, &self.destinations, &self.layout)
    }

    /// Publish, verify and (for incremental builds) promote.
    ///
    /// Stops at the first fatal failure with the stage set to
    /// [`RunStage::Failed`]; nothing already published is removed.
    pub fn publish_all(&mut self, reporter: &mut dyn Reporter) -> Result<PublishReceipt> {
        let started_at = Utc::now();
        self.ledger = Ledger::new();
        self.stage = RunStage::Init;

        match self.run(reporter) {
            Ok(()) => {
                self.advance(RunStage::Done, reporter);
                Ok(PublishReceipt {
                    mode: self.mode.clone(),
                    destinations: self.destinations.clone(),
                    stage: self.stage,
                    ledger: self.ledger.entries().to_vec(),
                    ledger_path: self.layout.ledger_path.clone(),
                    started_at,
                    finished_at: Utc::now(),
                })
            }
            Err(err) => {
                let reached = self.stage;
                self.stage = RunStage::Failed;
                reporter.error(&format!("publish failed after stage {reached}: {err:#}"));
                Err(err)
            }
        }
    }

    fn advance(&mut self, stage: RunStage, reporter: &mut dyn Reporter) {
        self.stage = stage;
        reporter.info(&format!("stage: {stage}"));
    }

    fn run(&mut self, reporter: &mut dyn Reporter) -> Result<()> {
        self.layout.check_preconditions()?;

        let (dist, docs): (Vec<_>, Vec<_>) = self
            .plan()?
            .into_iter()
            .partition(|u| u.section == Section::Distribution);
        let dist_root = self.destinations.dist_root.clone();
        let docs_root = self.destinations.docs_root.clone();

        self.toolkit.ensure_remote_dir(&dist_root, reporter)?;
        if docs_root != dist_root {
            self.toolkit.ensure_remote_dir(&docs_root, reporter)?;
        }
        self.advance(RunStage::RootCreated, reporter);

        for upload in &dist {
            self.toolkit
                .publish_file(&upload.url, &upload.local, true, &mut self.ledger, reporter)?;
        }
        self.advance(RunStage::DistributionPublished, reporter);

        for upload in &dist {
            self.toolkit
                .verify_fetchable(&dist_root, &upload.leaf, reporter)?;
        }
        self.advance(RunStage::DistributionVerified, reporter);

        self.publish_documentation(&docs, &docs_root, reporter)?;
        self.advance(RunStage::DocsPublished, reporter);

        self.copy_aliases(&dist, &dist_root, reporter)?;
        self.publish_ledger(&dist_root, reporter)?;
        self.advance(RunStage::LedgerWritten, reporter);

        if let Some(alias_root) = self.destinations.alias_root.clone() {
            self.toolkit.promote_tree(&dist_root, &alias_root, reporter)?;
            self.advance(RunStage::Promoted, reporter);

            for upload in &dist {
                self.toolkit
                    .verify_fetchable(&alias_root, &upload.leaf, reporter)?;
            }
            self.advance(RunStage::PromotionVerified, reporter);
        }
        Ok(())
    }

    fn publish_documentation(
        &mut self,
        docs: &[PlannedUpload],
        docs_root: &str,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        for upload in docs {
            self.toolkit
                .publish_file(&upload.url, &upload.local, true, &mut self.ledger, reporter)?;
        }
        for upload in docs {
            self.toolkit
                .verify_fetchable(docs_root, &upload.leaf, reporter)?;
        }

        let Some(tree) = self.layout.docs_tree_to_publish() else {
            return Ok(());
        };
        let html_root = join_url(docs_root, DOCS_DIR_NAME);
        self.toolkit.ensure_remote_dir(&html_root, reporter)?;
        let summary = self
            .toolkit
            .upload_tree(&html_root, &tree, &mut self.ledger, reporter)?;
        reporter.info(&format!(
            "documentation: {} directories, {} files under {html_root}",
            summary.directories, summary.files
        ));
        if !summary.failed.is_empty() {
            reporter.warn(&format!(
                "{} documentation file(s) not stored: {}",
                summary.failed.len(),
                summary.failed.join(", ")
            ));
        }
        Ok(())
    }

    fn copy_aliases(
        &mut self,
        dist: &[PlannedUpload],
        dist_root: &str,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        let depth = match self.mode {
            PublishMode::Incremental { .. } => Some(Depth::One),
            PublishMode::Release { .. } => None,
        };
        let published = |leaf: &str| dist.iter().any(|u| u.leaf == leaf);

        for alias in &self.layout.aliases {
            let from = remote_name(&self.mode, &self.layout.name_prefix, &alias.from);
            let to = remote_name(&self.mode, &self.layout.name_prefix, &alias.to);
            if !published(&from) {
                reporter.warn(&format!("alias source {from} was not published; skipping"));
                continue;
            }

            let mut pairs = vec![(from.clone(), to.clone())];
            for suffix in DIGEST_SUFFIXES {
                let sidecar = format!("{from}.{suffix}");
                if published(&sidecar) {
                    pairs.push((sidecar, format!("{to}.{suffix}")));
                }
            }
            for (src, dest) in pairs {
                self.toolkit.copy_file(
                    &join_url(dist_root, &src),
                    &join_url(dist_root, &dest),
                    depth,
                    &mut self.ledger,
                    reporter,
                )?;
            }
        }
        Ok(())
    }

    fn publish_ledger(&mut self, dist_root: &str, reporter: &mut dyn Reporter) -> Result<()> {
        let path = self.layout.ledger_path.clone();
        self.ledger.write_to(&path)?;
        reporter.info(&format!(
            "wrote {} ledger entries to {}",
            self.ledger.len(),
            path.display()
        ));
        let url = join_url(dist_root, LEDGER_FILE_NAME);
        self.toolkit
            .publish_file(&url, &path, false, &mut self.ledger, reporter)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use davpub_dav::DavMethod;
    use proptest::prelude::*;
    use tempfile::{TempDir, tempdir};

    use super::*;
    use crate::reporter::CollectingReporter;
    use crate::testing::RecordingTransport;

    const BASE: &str = "https://dav.example/releases";

    fn release_project() -> (TempDir, Config) {
        let td = tempdir().expect("tempdir");
        let dist = td.path().join("dist");
        let docs = td.path().join("docs");
        fs::create_dir_all(&dist).expect("mkdir");
        fs::create_dir_all(&docs).expect("mkdir");
        fs::write(dist.join("immutant-dist-slim.zip"), "slim").expect("write");
        fs::write(dist.join("immutant-dist-slim.zip.sha1"), "abc").expect("write");
        fs::write(dist.join("build-metadata.json"), "{}").expect("write");
        fs::write(docs.join("immutant-docs-bin.zip"), "docs").expect("write");

        let mut config = Config::default();
        config.layout.dist_dir = PathBuf::from("dist");
        config.layout.dist_files = vec![
            "immutant-dist-slim.zip".to_string(),
            "build-metadata.json".to_string(),
        ];
        config.layout.doc_files = vec![PathBuf::from("docs/immutant-docs-bin.zip")];
        config.layout.docs_tree = Some(PathBuf::from("docs/html"));
        config.layout.ledger_file = PathBuf::from("out/published-artifacts.json");
        config.aliases = vec![AliasConfig {
            from: "immutant-dist-slim.zip".to_string(),
            to: "immutant-dist-bin.zip".to_string(),
        }];
        (td, config)
    }

    fn release_mode() -> PublishMode {
        PublishMode::Release {
            version: "1.2.0".to_string(),
        }
    }

    #[test]
    fn version_is_inserted_after_the_first_segment() {
        assert_eq!(
            versioned_file_name("immutant-dist-slim.zip", "immutant", "1.2.0"),
            "immutant-dist-1.2.0-slim.zip"
        );
        assert_eq!(
            versioned_file_name("immutant-dist-slim.zip.sha1", "immutant", "1.2.0"),
            "immutant-dist-1.2.0-slim.zip.sha1"
        );
        assert_eq!(
            versioned_file_name("immutant-docs.zip", "immutant", "1.2.0"),
            "immutant-docs-1.2.0.zip"
        );
        assert_eq!(
            versioned_file_name("build-metadata.json", "immutant", "1.2.0"),
            "build-metadata.json"
        );
        assert_eq!(
            versioned_file_name("immutantish.zip", "immutant", "1.2.0"),
            "immutantish.zip"
        );
    }

    #[test]
    fn destinations_per_mode() {
        let inc = Destinations::incremental("https://h/incremental/immutant/", 42);
        assert_eq!(inc.dist_root, "https://h/incremental/immutant/42");
        assert_eq!(inc.docs_root, inc.dist_root);
        assert_eq!(inc.alias_root.as_deref(), Some("https://h/incremental/immutant/LATEST"));

        let rel = Destinations::release("https://h/repo", "1.2.0", &ReleaseConfig::default());
        assert_eq!(rel.dist_root, "https://h/repo/org/immutant/immutant-dist/1.2.0");
        assert_eq!(rel.docs_root, "https://h/repo/org/immutant/immutant-docs/1.2.0");
        assert_eq!(rel.alias_root, None);
    }

    #[test]
    fn plan_lists_versioned_uploads_with_digests() {
        let (td, config) = release_project();
        let mode = release_mode();
        let destinations = Destinations::for_mode(&mode, BASE, &config.release);
        let layout = PublishLayout::from_config(td.path(), &config, &mode);

        let leaves: Vec<_> = plan_uploads(&mode, &destinations, &layout)
            .expect("plan")
            .into_iter()
            .map(|u| (u.section, u.leaf))
            .collect();
        assert_eq!(
            leaves,
            vec![
                (Section::Distribution, "immutant-dist-1.2.0-slim.zip".to_string()),
                (Section::Distribution, "immutant-dist-1.2.0-slim.zip.sha1".to_string()),
                (Section::Distribution, "build-metadata.json".to_string()),
                (Section::Documentation, "immutant-docs-1.2.0-bin.zip".to_string()),
            ]
        );
    }

    #[test]
    fn incremental_layout_skips_doc_archives_and_requires_docs_tree() {
        let (td, config) = release_project();
        let mode = PublishMode::Incremental { build_number: 7 };
        let layout = PublishLayout::from_config(td.path(), &config, &mode);

        assert!(layout.doc_files.is_empty());
        assert_eq!(
            layout.check_preconditions(),
            Err(PublishError::MissingDocs {
                path: td.path().join("docs/html")
            })
        );
    }

    #[test]
    fn release_run_publishes_verifies_and_copies_aliases_in_order() {
        let (td, config) = release_project();
        let transport = RecordingTransport::default();
        let mut publisher =
            Publisher::from_config(td.path(), &config, release_mode(), BASE, transport.client());
        let mut reporter = CollectingReporter::default();

        let receipt = publisher.publish_all(&mut reporter).expect("publish");

        let dist = format!("{BASE}/org/immutant/immutant-dist/1.2.0");
        let docs = format!("{BASE}/org/immutant/immutant-docs/1.2.0");
        assert_eq!(
            transport.calls(),
            vec![
                (DavMethod::Mkcol, dist.clone()),
                (DavMethod::Mkcol, docs.clone()),
                (DavMethod::Put, format!("{dist}/immutant-dist-1.2.0-slim.zip")),
                (DavMethod::Put, format!("{dist}/immutant-dist-1.2.0-slim.zip.sha1")),
                (DavMethod::Put, format!("{dist}/build-metadata.json")),
                (DavMethod::Head, format!("{dist}/immutant-dist-1.2.0-slim.zip")),
                (DavMethod::Head, format!("{dist}/immutant-dist-1.2.0-slim.zip.sha1")),
                (DavMethod::Head, format!("{dist}/build-metadata.json")),
                (DavMethod::Put, format!("{docs}/immutant-docs-1.2.0-bin.zip")),
                (DavMethod::Head, format!("{docs}/immutant-docs-1.2.0-bin.zip")),
                (DavMethod::Copy, format!("{dist}/immutant-dist-1.2.0-slim.zip")),
                (DavMethod::Copy, format!("{dist}/immutant-dist-1.2.0-slim.zip.sha1")),
                (DavMethod::Put, format!("{dist}/{LEDGER_FILE_NAME}")),
            ]
        );

        let copies: Vec<_> = transport
            .seen
            .lock()
            .expect("lock")
            .iter()
            .filter(|r| r.method == DavMethod::Copy)
            .map(|r| (r.destination.clone(), r.depth))
            .collect();
        assert_eq!(
            copies,
            vec![
                (Some(format!("{dist}/immutant-dist-1.2.0-bin.zip")), None),
                (Some(format!("{dist}/immutant-dist-1.2.0-bin.zip.sha1")), None),
            ]
        );

        assert_eq!(receipt.stage, RunStage::Done);
        assert_eq!(publisher.stage(), RunStage::Done);
        assert_eq!(receipt.ledger.len(), 6);
        assert_eq!(receipt.ledger[3], format!("{docs}/immutant-docs-1.2.0-bin.zip"));
        assert_eq!(receipt.ledger[5], format!("{dist}/immutant-dist-1.2.0-bin.zip.sha1"));
        assert!(!receipt.ledger.iter().any(|u| u.ends_with(LEDGER_FILE_NAME)));

        let written = Ledger::load(&td.path().join("out/published-artifacts.json")).expect("load");
        assert_eq!(written.entries(), receipt.ledger.as_slice());
    }

    #[test]
    fn missing_primary_file_fails_before_any_request() {
        let (td, config) = release_project();
        fs::remove_file(td.path().join("dist/build-metadata.json")).expect("rm");
        let transport = RecordingTransport::default();
        let mut publisher =
            Publisher::from_config(td.path(), &config, release_mode(), BASE, transport.client());
        let mut reporter = CollectingReporter::default();

        let err = publisher.publish_all(&mut reporter).expect_err("precondition");

        assert!(matches!(
            err.downcast_ref::<PublishError>(),
            Some(PublishError::MissingArtifacts { paths }) if paths.len() == 1
        ));
        assert!(transport.calls().is_empty());
        assert_eq!(publisher.stage(), RunStage::Failed);
    }

    #[test]
    fn failed_doc_verification_stops_before_aliases_and_ledger() {
        let (td, config) = release_project();
        let transport = RecordingTransport::default();
        transport.respond(
            DavMethod::Head,
            &format!("{BASE}/org/immutant/immutant-docs/1.2.0/immutant-docs-1.2.0-bin.zip"),
            404,
        );
        let mut publisher =
            Publisher::from_config(td.path(), &config, release_mode(), BASE, transport.client());
        let mut reporter = CollectingReporter::default();

        let err = publisher.publish_all(&mut reporter).expect_err("404");

        assert!(err.to_string().contains("immutant-docs-1.2.0-bin.zip - 404"));
        assert_eq!(transport.count(DavMethod::Copy), 0);
        assert!(!td.path().join("out/published-artifacts.json").exists());
        assert_eq!(publisher.stage(), RunStage::Failed);
        assert!(reporter.errors.iter().any(|e| e.contains("distribution_verified")));
    }

    #[test]
    fn alias_whose_source_was_not_published_is_skipped() {
        let (td, mut config) = release_project();
        config.aliases.push(AliasConfig {
            from: "immutant-dist-full.zip".to_string(),
            to: "immutant-dist-all.zip".to_string(),
        });
        let transport = RecordingTransport::default();
        let mut publisher =
            Publisher::from_config(td.path(), &config, release_mode(), BASE, transport.client());
        let mut reporter = CollectingReporter::default();

        publisher.publish_all(&mut reporter).expect("publish");

        assert_eq!(transport.count(DavMethod::Copy), 2);
        assert!(reporter.warns.iter().any(|w| w.contains("immutant-dist-1.2.0-full.zip")));
    }

    proptest! {
        #[test]
        fn names_without_the_prefix_are_untouched(name in "[a-h][a-z.-]{0,20}") {
            prop_assert_eq!(versioned_file_name(&name, "immutant", "9.9"), name);
        }

        #[test]
        fn versioned_names_keep_prefix_and_tail(
            stem in "[a-z]{1,8}",
            tail in "(-[a-z]{1,6})?\\.[a-z]{2,4}",
            version in "[0-9]\\.[0-9]{1,2}\\.[0-9]",
        ) {
            let name = format!("immutant-{stem}{tail}");
            let versioned = versioned_file_name(&name, "immutant", &version);
            prop_assert_eq!(versioned, format!("immutant-{stem}-{version}{tail}"));
        }
    }
}
