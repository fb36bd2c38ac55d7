//! Correlate upstream and downstream builds of a wave.
//!
//! A wave window opens with the earliest start among the selected
//! downstream builds and closes with the latest finish among the selected
//! upstream builds. Both ends are taken in whole epoch seconds and the
//! window is reported in minutes, rounded up.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::groups::DeploymentGroups;
use crate::model::{BuildHistory, BuildRecord, JobRole};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorrelationError {
    #[error("no {role} build found for {selector} at version {version}")]
    EmptyBuildSet {
        role: JobRole,
        selector: String,
        version: String,
    },

    #[error("unknown deployment group '{0}'")]
    UnknownGroup(String),

    #[error("epoch second {0} is out of range")]
    TimestampOutOfRange(i64),
}

/// What a correlation is restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Selector {
    Instance(String),
    Group(String),
}

impl Selector {
    pub fn name(&self) -> &str {
        match self {
            Self::Instance(name) | Self::Group(name) => name,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(name) => write!(f, "instance {name}"),
            Self::Group(name) => write!(f, "group {name}"),
        }
    }
}

/// Instances a selector stands for.
#[derive(Debug, Clone, Copy)]
pub enum Members<'a> {
    One(&'a str),
    Many(&'a [String]),
}

impl Members<'_> {
    pub fn contains(&self, instance: &str) -> bool {
        match self {
            Self::One(name) => *name == instance,
            Self::Many(names) => names.iter().any(|name| name == instance),
        }
    }
}

pub fn resolve<'a>(selector: &'a Selector, groups: &'a DeploymentGroups) -> Result<Members<'a>, CorrelationError> {
    match selector {
        Selector::Instance(name) => Ok(Members::One(name)),
        Selector::Group(group) => groups
            .members(group)
            .map(Members::Many)
            .ok_or_else(|| CorrelationError::UnknownGroup(group.clone())),
    }
}

/// Builds kept by a filter, plus the ones lacking `instance` or `version`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilteredBuilds {
    pub matched: Vec<BuildRecord>,
    pub invalid: Vec<BuildRecord>,
}

/// Copy out the builds of `members` at `version`. The history is left as
/// it was.
pub fn filter_builds(history: &BuildHistory, version: &str, members: Members<'_>) -> FilteredBuilds {
    let mut filtered = FilteredBuilds::default();
    for build in &history.all_builds {
        match (build.instance.as_deref(), build.version.as_deref()) {
            (Some(instance), Some(build_version)) => {
                if build_version == version && members.contains(instance) {
                    filtered.matched.push(build.clone());
                }
            }
            _ => filtered.invalid.push(build.clone()),
        }
    }
    if !filtered.invalid.is_empty() {
        tracing::debug!(
            "{} builds without instance or version set aside",
            filtered.invalid.len()
        );
    }
    filtered
}

/// Earliest start among `builds`, in whole seconds.
pub fn first_started(builds: &[BuildRecord]) -> Option<i64> {
    builds.iter().map(BuildRecord::started_secs).min()
}

/// Latest finish among `builds`, in whole seconds. A build whose end time
/// overflows is reported by its start second.
pub fn last_finished(builds: &[BuildRecord]) -> Result<Option<i64>, CorrelationError> {
    builds.iter().try_fold(None, |latest: Option<i64>, build| {
        let finished = build
            .finished_secs()
            .ok_or_else(|| CorrelationError::TimestampOutOfRange(build.started_secs()))?;
        Ok(Some(latest.map_or(finished, |latest| latest.max(finished))))
    })
}

/// Minutes between two epoch seconds, rounded up.
pub fn elapsed_minutes(first_started: i64, last_finished: i64) -> i64 {
    let seconds = last_finished - first_started;
    seconds.div_euclid(60) + i64::from(seconds.rem_euclid(60) != 0)
}

fn to_datetime(secs: i64) -> Result<DateTime<Utc>, CorrelationError> {
    DateTime::from_timestamp(secs, 0).ok_or(CorrelationError::TimestampOutOfRange(secs))
}

/// Both sides of a wave, filtered for one selector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub selector: Selector,
    pub upstream_version: String,
    pub downstream_version: String,
    pub upstream: FilteredBuilds,
    pub downstream: FilteredBuilds,
}

/// Measured wave window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaveTiming {
    pub first_started: DateTime<Utc>,
    pub last_finished: DateTime<Utc>,
    pub elapsed_minutes: i64,
    pub upstream_builds: usize,
    pub downstream_builds: usize,
}

impl Selection {
    pub fn new(
        selector: Selector,
        upstream: (&BuildHistory, &str),
        downstream: (&BuildHistory, &str),
        groups: &DeploymentGroups,
    ) -> Result<Self, CorrelationError> {
        let members = resolve(&selector, groups)?;
        let upstream_builds = filter_builds(upstream.0, upstream.1, members);
        let downstream_builds = filter_builds(downstream.0, downstream.1, members);
        Ok(Self {
            upstream_version: upstream.1.to_string(),
            downstream_version: downstream.1.to_string(),
            upstream: upstream_builds,
            downstream: downstream_builds,
            selector,
        })
    }

    fn empty(&self, role: JobRole) -> CorrelationError {
        let version = match role {
            JobRole::Upstream => &self.upstream_version,
            JobRole::Downstream => &self.downstream_version,
        };
        CorrelationError::EmptyBuildSet {
            role,
            selector: self.selector.to_string(),
            version: version.clone(),
        }
    }

    /// Measure the window. Fails when either side matched no build.
    pub fn measure(&self) -> Result<WaveTiming, CorrelationError> {
        let first = first_started(&self.downstream.matched)
            .ok_or_else(|| self.empty(JobRole::Downstream))?;
        let last = last_finished(&self.upstream.matched)?
            .ok_or_else(|| self.empty(JobRole::Upstream))?;
        let minutes = elapsed_minutes(first, last);
        if minutes < 0 {
            tracing::warn!(
                "{}: upstream finished before downstream started ({minutes} min)",
                self.selector
            );
        }
        Ok(WaveTiming {
            first_started: to_datetime(first)?,
            last_finished: to_datetime(last)?,
            elapsed_minutes: minutes,
            upstream_builds: self.upstream.matched.len(),
            downstream_builds: self.downstream.matched.len(),
        })
    }
}
