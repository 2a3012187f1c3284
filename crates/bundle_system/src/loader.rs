//! The bundle loading pipeline.
//!
//! Scanning -> (Filtering -> Loading)* -> LoadingErrors -> Done
//!
//! Bundles are dispatched one at a time, each `mount` awaited before the
//! next begins. The `_errors` bundle goes last. A failing bundle aborts the
//! run, after its public directory has been mounted.

use crate::error::LoadError;
use crate::source::BundleSources;
use grimm_core::{html_files, register_public, Context, Discovered, FileIndex, Locals};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Directory name of the bundle loaded after all others.
pub const ERRORS_BUNDLE: &str = "_errors";

/// Dispatch order of ordinary bundles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadOrder {
    /// Whatever order the filesystem lists the directories in
    #[default]
    Listing,
    /// Sorted by directory name
    Lexicographic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Scanning,
    Filtering,
    Loading,
    LoadingErrors,
    Done,
    Failed,
}

/// What a completed run did.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Bundle directories in the order they were processed
    pub visited: Vec<String>,
    /// Bundles whose entry point was invoked
    pub dispatched: Vec<String>,
    /// Bundle directories without an entry file
    pub skipped: Vec<String>,
    /// `(prefix, directory)` of every public mount
    pub public_mounts: Vec<(String, PathBuf)>,
    pub phase: LoadPhase,
}

pub struct BundleLoader {
    root: PathBuf,
    sources: BundleSources,
    order: LoadOrder,
}

impl BundleLoader {
    pub fn new(root: impl Into<PathBuf>, sources: BundleSources) -> Self {
        Self {
            root: root.into(),
            sources,
            order: LoadOrder::default(),
        }
    }

    pub fn with_order(mut self, order: LoadOrder) -> Self {
        self.order = order;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists the ordinary bundle directories, in dispatch order.
    pub async fn scan(&self) -> Result<Vec<String>, LoadError> {
        let root_error = |source| LoadError::RootUnreadable {
            path: self.root.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(root_error)?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(root_error)? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name == ERRORS_BUNDLE {
                continue;
            }
            // Follows symlinks, so a linked bundle directory counts.
            let is_dir = tokio::fs::metadata(entry.path())
                .await
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            if is_dir {
                names.push(name);
            } else {
                debug!("Ignoring non-directory {} in bundles root", name);
            }
        }

        if self.order == LoadOrder::Lexicographic {
            names.sort();
        }
        Ok(names)
    }

    /// Runs the whole pipeline against `ctx`.
    pub async fn load_all(&self, ctx: Arc<dyn Context>) -> Result<LoadReport, LoadError> {
        let mut report = LoadReport::default();

        info!("Scanning bundles in {}", self.root.display());
        let names = match self.scan().await {
            Ok(names) => names,
            Err(e) => {
                report.phase = LoadPhase::Failed;
                error!("Bundle loading failed during scan: {}", e);
                ctx.logger()
                    .error(format!("No bundles found at {}", self.root.display()));
                return Err(e);
            }
        };

        info!("Loading {} bundles", names.len());
        for name in &names {
            report.phase = LoadPhase::Filtering;
            self.load_one(ctx.clone(), name, &mut report).await?;
        }

        report.phase = LoadPhase::LoadingErrors;
        let errors_dir = self.root.join(ERRORS_BUNDLE);
        if tokio::fs::metadata(&errors_dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
        {
            self.load_one(ctx.clone(), ERRORS_BUNDLE, &mut report).await?;
        } else {
            debug!("No {} bundle present", ERRORS_BUNDLE);
        }

        report.phase = LoadPhase::Done;
        info!(
            "Bundle loading done: {} dispatched, {} skipped",
            report.dispatched.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    async fn load_one(
        &self,
        ctx: Arc<dyn Context>,
        name: &str,
        report: &mut LoadReport,
    ) -> Result<(), LoadError> {
        let dir = self.root.join(name);
        report.visited.push(name.to_string());

        let outcome = match find_entry_point(&dir).await {
            Some(entry) => {
                if report.phase != LoadPhase::LoadingErrors {
                    report.phase = LoadPhase::Loading;
                }
                let outcome = self.dispatch(ctx.clone(), name, &dir, &entry).await;
                if outcome.is_ok() {
                    report.dispatched.push(name.to_string());
                }
                outcome
            }
            None => {
                debug!("Skipping {}: no index entry file", name);
                report.skipped.push(name.to_string());
                Ok(())
            }
        };

        // Mounted whether or not the bundle had an entry point.
        let prefix = format!("/{}", name);
        if let Discovered::Found(public) =
            register_public(ctx.as_ref(), &prefix, &dir.join("public")).await
        {
            report.public_mounts.push((prefix, public));
        }

        if outcome.is_err() {
            report.phase = LoadPhase::Failed;
        }
        outcome
    }

    async fn dispatch(
        &self,
        ctx: Arc<dyn Context>,
        name: &str,
        dir: &Path,
        entry: &Path,
    ) -> Result<(), LoadError> {
        let bundle = self
            .sources
            .resolve(name, entry)?
            .ok_or_else(|| LoadError::Unresolved {
                name: name.to_string(),
                path: entry.to_path_buf(),
            })?;

        ctx.logger().info(format!("Loading bundle: {}", name));

        let locals = Locals {
            name: name.to_string(),
            views: FileIndex::scan(dir.join("views"), html_files).await,
        };

        bundle
            .mount(ctx, locals)
            .await
            .map_err(|source| LoadError::Bundle {
                name: name.to_string(),
                source,
            })
    }
}

/// First regular file in `dir` whose stem is `index`, by file name.
async fn find_entry_point(dir: &Path) -> Option<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut candidates = Vec::new();

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.file_stem().and_then(|stem| stem.to_str()) != Some("index") {
            continue;
        }
        // Follows symlinks, like `scan`.
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if is_file {
            candidates.push(path);
        }
    }

    candidates.sort();
    candidates.into_iter().next()
}
