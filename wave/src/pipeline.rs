//! Fetch, group and analyze stages of a wave timing run.

use std::fmt;
use std::time::Instant;

use cic_client::{CicClient, CicConfig};
use serde::Serialize;

use crate::config::{Credentials, WaveConfig};
use crate::correlate::{CorrelationError, Selection, Selector, WaveTiming};
use crate::error::{Result, WaveError};
use crate::groups::DeploymentGroups;
use crate::jenkins::JenkinsClient;
use crate::model::{BuildHistory, JobRole};
use crate::sanitize::sanitize;
use crate::snapshot::SnapshotStore;

/// Timing of one selector in the wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaveReport {
    pub selector: Selector,
    /// Upstream version the wave delivered.
    pub version: String,
    #[serde(flatten)]
    pub timing: WaveTiming,
    pub invalid_upstream_builds: usize,
    pub invalid_downstream_builds: usize,
}

impl fmt::Display for WaveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = self.timing.elapsed_minutes;
        match &self.selector {
            Selector::Group(group) => write!(
                f,
                "Total {group} update time for wave {}: {minutes} min",
                self.version
            ),
            Selector::Instance(instance) => write!(
                f,
                "{instance} update time for wave {}: {minutes} min",
                self.version
            ),
        }
    }
}

/// A selector that could not be measured.
#[derive(Debug)]
pub struct SelectorFailure {
    pub selector: Selector,
    pub error: CorrelationError,
}

#[derive(Debug, Default)]
pub struct Analysis {
    pub reports: Vec<WaveReport>,
    pub failures: Vec<SelectorFailure>,
}

impl Analysis {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchSummary {
    pub upstream_builds: usize,
    pub downstream_builds: usize,
    pub removed_parameters: usize,
}

pub struct WavePipeline {
    config: WaveConfig,
    store: SnapshotStore,
}

impl WavePipeline {
    pub fn new(config: WaveConfig) -> Result<Self> {
        let store = SnapshotStore::open(&config.snapshot_dir)?;
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &WaveConfig {
        &self.config
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    fn log_stage(&self, stage: &str, started: Instant) {
        let elapsed = started.elapsed();
        if self.config.print_timings {
            tracing::info!("{stage} took {elapsed:?}");
        } else {
            tracing::debug!("{stage} took {elapsed:?}");
        }
    }

    /// Fetch both job histories concurrently, store the raw and the
    /// sanitized form of each.
    pub async fn fetch(&self, jenkins: &JenkinsClient) -> Result<FetchSummary> {
        let started = Instant::now();
        let (upstream, downstream) = tokio::try_join!(
            jenkins.fetch_history(&self.config.upstream),
            jenkins.fetch_history(&self.config.downstream),
        )?;
        self.log_stage("fetch", started);

        let started = Instant::now();
        let mut summary = FetchSummary::default();
        for (role, raw) in [(JobRole::Upstream, upstream), (JobRole::Downstream, downstream)] {
            let job = self.config.job(role);
            self.store.write_raw_history(&job.snapshot, &raw)?;
            let mut history: BuildHistory =
                serde_json::from_value(raw).map_err(|source| WaveError::Decode {
                    origin: format!("{} build history", job.snapshot),
                    source,
                })?;
            let report = sanitize(&mut history, &self.config.credential_params);
            self.store.write_history(&job.snapshot, &history)?;

            summary.removed_parameters += report.removed_parameters;
            match role {
                JobRole::Upstream => summary.upstream_builds = history.all_builds.len(),
                JobRole::Downstream => summary.downstream_builds = history.all_builds.len(),
            }
        }
        self.log_stage("sanitize", started);
        Ok(summary)
    }

    /// Build the group membership file from the CIC instance listing.
    pub async fn build_groups(&self, cic: &CicClient) -> Result<DeploymentGroups> {
        let started = Instant::now();
        let instances = cic.instance_list().await?;
        let groups = DeploymentGroups::from_instances(&instances, &self.config.known_groups);
        self.store.write_groups(&groups)?;
        tracing::info!(
            "{} instances listed, {} deployment groups kept",
            instances.len(),
            groups.len()
        );
        self.log_stage("groups", started);
        Ok(groups)
    }

    fn selectors(&self) -> Vec<Selector> {
        self.config
            .report_groups
            .iter()
            .cloned()
            .map(Selector::Group)
            .chain(self.config.instances.iter().cloned().map(Selector::Instance))
            .collect()
    }

    /// Measure every configured group and instance from stored snapshots.
    pub fn analyze(&self) -> Result<Analysis> {
        let started = Instant::now();
        let upstream_job = &self.config.upstream;
        let downstream_job = &self.config.downstream;
        let upstream = self.store.read_history(&upstream_job.snapshot)?;
        let downstream = self.store.read_history(&downstream_job.snapshot)?;
        let groups = if self.config.report_groups.is_empty() {
            DeploymentGroups::default()
        } else {
            self.store.read_groups()?
        };

        let mut analysis = Analysis::default();
        for selector in self.selectors() {
            let selection = match Selection::new(
                selector.clone(),
                (&upstream, upstream_job.version.as_str()),
                (&downstream, downstream_job.version.as_str()),
                &groups,
            ) {
                Ok(selection) => selection,
                Err(error) => {
                    analysis.failures.push(SelectorFailure { selector, error });
                    continue;
                }
            };

            let label = selector.name();
            self.store
                .write_filtered(label, &upstream_job.version, &selection.upstream)?;
            self.store
                .write_filtered(label, &downstream_job.version, &selection.downstream)?;

            match selection.measure() {
                Ok(timing) => analysis.reports.push(WaveReport {
                    version: upstream_job.version.clone(),
                    timing,
                    invalid_upstream_builds: selection.upstream.invalid.len(),
                    invalid_downstream_builds: selection.downstream.invalid.len(),
                    selector,
                }),
                Err(error) => {
                    tracing::warn!("{selector}: {error}");
                    analysis.failures.push(SelectorFailure { selector, error });
                }
            }
        }
        self.log_stage("analyze", started);
        Ok(analysis)
    }

    /// Fetch, rebuild groups and analyze in one go.
    pub async fn run(&self, credentials: &Credentials) -> Result<Analysis> {
        let jenkins = JenkinsClient::new(&self.config.jenkins_url, credentials.clone())?;
        let cic_config = CicConfig::new(&credentials.user, &credentials.password)
            .with_base_url(&self.config.cic_url);
        let cic = CicClient::connect(&cic_config).await?;

        let (fetched, groups) = tokio::try_join!(self.fetch(&jenkins), self.build_groups(&cic))?;
        tracing::info!(
            "fetched {} upstream and {} downstream builds, {} groups",
            fetched.upstream_builds,
            fetched.downstream_builds,
            groups.len()
        );
        self.analyze()
    }
}
