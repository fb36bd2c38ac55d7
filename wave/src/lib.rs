//! Wave update timing.
//!
//! A deployment wave runs one Jenkins job per instance to update the
//! component (downstream) and another to update the application
//! (upstream). The wave time of a group or instance is the span from the
//! earliest downstream start to the latest upstream finish among its
//! builds for the wave's versions.
//!
//! Histories are fetched once, stored as snapshots with credentials
//! removed, and analyzed offline.

pub mod config;
pub mod correlate;
mod error;
pub mod groups;
pub mod jenkins;
pub mod model;
pub mod pipeline;
pub mod sanitize;
pub mod snapshot;

pub use config::{ConfigLoader, Credentials, JobConfig, WaveConfig};
pub use correlate::{CorrelationError, FilteredBuilds, Selection, Selector, WaveTiming};
pub use error::{Result, WaveError};
pub use groups::DeploymentGroups;
pub use jenkins::JenkinsClient;
pub use model::{BuildHistory, BuildRecord, JobRole};
pub use pipeline::{Analysis, FetchSummary, SelectorFailure, WavePipeline, WaveReport};
pub use snapshot::SnapshotStore;
