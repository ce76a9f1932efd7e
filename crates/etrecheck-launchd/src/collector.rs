//! Collection pass: discover descriptors and build a report.
//!
//! ```text
//! discover_launchd_paths()                      sorted, deduplicated
//!   -> LaunchdFile::prepare() each              concurrent, bounded
//!   -> PreparedFile::finish() in path order     identifiers claimed
//!   -> check_signature + adware + requery each  concurrent, bounded
//!   -> LaunchdReport
//! ```
//!
//! Each record is owned by exactly one task at a time. A path that fails
//! goes to `skipped` and the pass carries on.

use chrono::Utc;
use futures_util::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::adware::{AdwareMatcher, AdwareSignatures};
use crate::config::CheckConfig;
use crate::discovery::discover_launchd_paths;
use crate::file::LaunchdFile;
use crate::registry::IdentifierRegistry;
use crate::report::{LaunchdReport, LaunchdSummary, SkippedPath};
use crate::services::Services;

/// Default number of records processed at once.
pub const DEFAULT_WORKERS: usize = 8;

/// Default threshold below which a file counts as low safety.
pub const DEFAULT_LOW_SAFETY: i32 = 50;

/// Runs collection passes over launchd directories.
#[derive(Clone)]
pub struct LaunchdCollector {
    services: Services,
    adware: Arc<dyn AdwareMatcher>,
    workers: usize,
    low_safety_threshold: i32,
}

impl std::fmt::Debug for LaunchdCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchdCollector")
            .field("services", &self.services)
            .field("workers", &self.workers)
            .field("low_safety_threshold", &self.low_safety_threshold)
            .finish_non_exhaustive()
    }
}

impl LaunchdCollector {
    /// Collector over the given collaborators and adware matcher
    pub fn new(services: Services, adware: Arc<dyn AdwareMatcher>) -> Self {
        Self {
            services,
            adware,
            workers: DEFAULT_WORKERS,
            low_safety_threshold: DEFAULT_LOW_SAFETY,
        }
    }

    /// Collector using the real system collaborators
    #[must_use]
    pub fn from_config(config: &CheckConfig) -> Self {
        Self::new(
            Services::system(config),
            Arc::new(AdwareSignatures::from_config(&config.adware)),
        )
        .with_workers(config.workers)
        .with_low_safety_threshold(config.report.low_safety_threshold)
    }

    /// Set how many records are processed at once (at least one)
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the low-safety threshold used in the summary
    #[must_use]
    pub fn with_low_safety_threshold(mut self, threshold: i32) -> Self {
        self.low_safety_threshold = threshold;
        self
    }

    /// The collaborators records are built with
    #[must_use]
    pub const fn services(&self) -> &Services {
        &self.services
    }

    /// Discover descriptors under `search_paths` and process them.
    pub async fn collect(&self, search_paths: &[PathBuf]) -> LaunchdReport {
        let paths = discover_launchd_paths(search_paths);
        info!(count = paths.len(), "collecting launchd files");
        let mut report = self.collect_paths(paths).await;
        report.search_paths = search_paths.to_vec();
        report
    }

    /// Process an explicit list of descriptor paths.
    pub async fn collect_paths(&self, mut paths: Vec<PathBuf>) -> LaunchdReport {
        paths.sort();
        paths.dedup();

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut skipped = Vec::new();

        // Phase 1: read descriptors
        let handles: Vec<_> = paths
            .iter()
            .cloned()
            .map(|path| {
                let sem = semaphore.clone();
                let services = self.services.clone();
                tokio::spawn(async move {
                    let _permit = sem.acquire().await;
                    LaunchdFile::prepare(path, &services).await
                })
            })
            .collect();

        let mut prepared = Vec::with_capacity(handles.len());
        for (path, joined) in paths.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(Ok(file)) => prepared.push(file),
                Ok(Err(e)) => {
                    debug!(path = %path.display(), error = %e, "skipping path");
                    skipped.push(SkippedPath {
                        path,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "record task failed");
                    skipped.push(SkippedPath {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Phase 2: identifiers, in path order
        let identifiers = IdentifierRegistry::default();
        let records: Vec<LaunchdFile> = prepared
            .into_iter()
            .map(|file| file.finish(&identifiers))
            .collect();

        // Phase 3: verify, match and query
        let order: Vec<PathBuf> = records.iter().map(|r| r.path().to_path_buf()).collect();
        let handles: Vec<_> = records
            .into_iter()
            .map(|mut record| {
                let sem = semaphore.clone();
                let services = self.services.clone();
                let adware = Arc::clone(&self.adware);
                tokio::spawn(async move {
                    let _permit = sem.acquire().await;
                    record.check_signature(&services).await;
                    let executable = record
                        .executable()
                        .map(|p| p.to_string_lossy().into_owned())
                        .or_else(|| record.program().map(str::to_string));
                    let matched = adware.is_adware(record.label(), executable.as_deref());
                    record.set_adware(matched);
                    record.requery(&services).await;
                    record
                })
            })
            .collect();

        let mut files = Vec::with_capacity(handles.len());
        for (path, joined) in order.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(record) => files.push(record),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "record task failed");
                    skipped.push(SkippedPath {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        files.sort_by(|a, b| a.path().cmp(b.path()));
        skipped.sort_by(|a, b| a.path.cmp(&b.path));

        let summary = LaunchdSummary::from_files(&files, self.low_safety_threshold);
        info!(
            total = summary.total,
            adware = summary.adware,
            skipped = skipped.len(),
            "collection finished"
        );

        LaunchdReport {
            collected_at: Utc::now(),
            search_paths: Vec::new(),
            files,
            skipped,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdwareConfig;
    use crate::testing::*;
    use etrecheck_core::{LaunchdContext, LoadStatus, Signature};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn adware() -> Arc<dyn AdwareMatcher> {
        Arc::new(AdwareSignatures::from_config(&AdwareConfig {
            matches: vec!["com.genieo.engine".into()],
            ..AdwareConfig::default()
        }))
    }

    const GENIEO: &str = "/Library/LaunchAgents/com.genieo.engine.plist";
    const DUPLICATE: &str = "/Library/LaunchDaemons/com.vendor.helper.plist";

    fn collector() -> (LaunchdCollector, Harness) {
        let store = FakeStore::default()
            .with(APPLE_DAEMON, agent("com.apple.locationd", "/usr/libexec/locationd"))
            .with(SYSTEM_AGENT, agent("com.vendor.helper", "/usr/local/bin/helper"))
            .with(DUPLICATE, agent("com.vendor.helper", "/usr/local/bin/helper"))
            .with(GENIEO, agent("com.genieo.engine", "/usr/local/bin/genieo"));
        let h = harness(store, FakeVerifier::new(Signature::Developer), FakeController::default());
        let collector = LaunchdCollector::new(h.services.clone(), adware()).with_workers(2);
        (collector, h)
    }

    #[tokio::test]
    async fn collects_every_path_and_skips_strays() {
        let (collector, _h) = collector();
        let report = collector
            .collect_paths(vec![
                PathBuf::from(GENIEO),
                PathBuf::from(USER_AGENT),
                PathBuf::from(APPLE_DAEMON),
                PathBuf::from(SYSTEM_AGENT),
                PathBuf::from(DUPLICATE),
                PathBuf::from("/Library/LaunchAgents/notes.txt"),
                PathBuf::from(SYSTEM_AGENT),
            ])
            .await;

        assert_eq!(report.files.len(), 5);
        assert_eq!(report.skipped.len(), 1);
        let paths: Vec<_> = report.files.iter().map(LaunchdFile::path).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);

        let genieo = report.files.iter().find(|f| f.path() == Path::new(GENIEO)).unwrap();
        assert!(genieo.adware());
        assert_eq!(genieo.safety_score(), collector.services().weights.adware);

        let unreadable = report.files.iter().find(|f| f.path() == Path::new(USER_AGENT)).unwrap();
        assert!(!unreadable.descriptor_accessible());
        assert_eq!(unreadable.status(), LoadStatus::Unknown);

        assert!(report
            .files
            .iter()
            .filter(|f| f.descriptor_accessible())
            .all(|f| f.signature() == Signature::Developer && f.status() == LoadStatus::NotLoaded));

        let s = &report.summary;
        assert_eq!(s.total, 5);
        assert_eq!(s.apple, 1);
        assert_eq!(s.system, 3);
        assert_eq!(s.user, 1);
        assert_eq!(s.adware, 1);
        assert_eq!(s.loaded, 0);
        assert_eq!(s.inaccessible, 1);
    }

    #[tokio::test]
    async fn identifier_collisions_resolve_by_path_order() {
        for workers in [1, 4] {
            let (collector, _h) = collector();
            let report = collector
                .with_workers(workers)
                .collect_paths(vec![PathBuf::from(SYSTEM_AGENT), PathBuf::from(DUPLICATE)])
                .await;
            let ids: Vec<_> = report.files.iter().map(LaunchdFile::identifier).collect();
            // "/Library/LaunchAgents/..." sorts before "/Library/LaunchDaemons/..."
            assert_eq!(ids[0], "com.vendor.helper");
            assert!(ids[1].starts_with("com.vendor.helper_"));
        }
    }

    #[tokio::test]
    async fn collect_walks_directories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("com.a.plist"), "").unwrap();
        fs::write(dir.path().join("ignored.txt"), "").unwrap();

        let (collector, _h) = collector();
        let report = collector.collect(&[dir.path().to_path_buf()]).await;
        assert_eq!(report.search_paths, vec![dir.path().to_path_buf()]);
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].context(), LaunchdContext::Unknown);
        assert!(!report.files[0].descriptor_accessible());
    }

    #[tokio::test]
    async fn hides_apple_files_unless_signature_failed() {
        let (collector, _h) = collector();
        let report = collector
            .collect_paths(vec![PathBuf::from(APPLE_DAEMON), PathBuf::from(SYSTEM_AGENT)])
            .await;

        assert_eq!(report.visible_files(false, false).count(), 2);
        let visible: Vec<_> = report.visible_files(true, false).collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].path(), Path::new(SYSTEM_AGENT));
        // not signed by Apple, so it surfaces as a signature failure
        assert_eq!(report.visible_files(true, true).count(), 2);
    }
}
