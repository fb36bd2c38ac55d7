//! Strip credentials from fetched build histories and lift the parameters
//! the correlator filters on.

use crate::model::{BuildHistory, BuildRecord};

/// Parameters that carry passwords in the deployment jobs.
pub const DEFAULT_CREDENTIAL_PARAMS: [&str; 2] = ["SAP_PASSWORD", "HANA_PASSWORD"];

pub const INSTANCE_PARAM: &str = "INSTANCE";
pub const DIRECTORY_PARAM: &str = "FPA_DU_DIR";
pub const VERSION_PARAM: &str = "EPM_VERSION";

/// Counts of what sanitization changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    pub removed_parameters: usize,
    pub dropped_actions: usize,
}

/// Sanitize every build in place.
///
/// Actions without parameters are dropped, parameters named in
/// `credential_params` are removed, and `instance`, `fpa_du_dir`,
/// `epm_version` and the derived `version` are set on each build.
pub fn sanitize(history: &mut BuildHistory, credential_params: &[String]) -> SanitizeReport {
    let mut report = SanitizeReport::default();
    for build in &mut history.all_builds {
        sanitize_build(build, credential_params, &mut report);
    }
    tracing::debug!(
        "sanitized {} builds: removed {} credential parameters, dropped {} actions",
        history.all_builds.len(),
        report.removed_parameters,
        report.dropped_actions
    );
    report
}

fn sanitize_build(build: &mut BuildRecord, credential_params: &[String], report: &mut SanitizeReport) {
    let before = build.actions.len();
    build.actions.retain(|action| action.parameters.is_some());
    report.dropped_actions += before - build.actions.len();

    for parameters in build.actions.iter_mut().filter_map(|a| a.parameters.as_mut()) {
        let before = parameters.len();
        parameters.retain(|p| !credential_params.iter().any(|name| *name == p.name));
        report.removed_parameters += before - parameters.len();
    }

    let mut instance = None;
    let mut directory = None;
    let mut explicit_version = None;
    for parameter in build.parameters() {
        match parameter.name.as_str() {
            INSTANCE_PARAM => instance = Some(parameter.value_text()),
            DIRECTORY_PARAM => directory = Some(parameter.value_text()),
            VERSION_PARAM => explicit_version = Some(parameter.value_text()),
            _ => {}
        }
    }

    let version = derive_version(explicit_version.as_deref(), directory.as_deref());
    if instance.is_some() {
        build.instance = instance;
    }
    if directory.is_some() {
        build.fpa_du_dir = directory;
    }
    if explicit_version.is_some() {
        build.epm_version = explicit_version;
    }
    if version.is_some() {
        build.version = version;
    }
}

/// Version of a build: the explicit version parameter when present,
/// otherwise the last path segment of the drop directory.
pub fn derive_version(explicit: Option<&str>, directory: Option<&str>) -> Option<String> {
    if let Some(version) = explicit {
        return Some(version.to_string());
    }
    directory.map(|dir| match dir.rfind('/') {
        Some(index) => dir[index + 1..].to_string(),
        None => dir.to_string(),
    })
}
