//! Jenkins build history as fetched from `api/json`.
//!
//! Only the fields the analysis reads are typed; everything else Jenkins
//! returns (`_class`, extra action kinds, ...) is kept in `extra` so
//! snapshots round-trip unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tree selector requesting number, timing and parameters of every build.
pub const BUILD_TREE: &str =
    "allBuilds[number,timestamp,duration,actions[parameters[name,value]]]";

/// Which side of a wave a job history stands for.
///
/// The downstream job opens the wave window with its earliest start; the
/// upstream job closes it with its latest finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobRole {
    Upstream,
    Downstream,
}

impl fmt::Display for JobRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream => f.write_str("upstream"),
            Self::Downstream => f.write_str("downstream"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildHistory {
    #[serde(rename = "allBuilds", default)]
    pub all_builds: Vec<BuildRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One execution of a Jenkins job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub number: u64,
    /// Start time, epoch milliseconds.
    pub timestamp: i64,
    /// Run time in milliseconds.
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub actions: Vec<BuildAction>,

    // Lifted by sanitization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fpa_du_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epm_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BuildRecord {
    pub fn new(number: u64, timestamp: i64, duration: i64) -> Self {
        Self {
            number,
            timestamp,
            duration,
            actions: Vec::new(),
            instance: None,
            fpa_du_dir: None,
            epm_version: None,
            version: None,
            extra: Map::new(),
        }
    }

    /// Start time in whole epoch seconds.
    pub fn started_secs(&self) -> i64 {
        self.timestamp.div_euclid(1000)
    }

    /// End time (start + duration) in whole epoch seconds, `None` when the
    /// sum does not fit in an `i64`.
    pub fn finished_secs(&self) -> Option<i64> {
        self.timestamp
            .checked_add(self.duration)
            .map(|end| end.div_euclid(1000))
    }

    pub fn parameters(&self) -> impl Iterator<Item = &BuildParameter> {
        self.actions
            .iter()
            .filter_map(|action| action.parameters.as_ref())
            .flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<BuildParameter>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildParameter {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BuildParameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            extra: Map::new(),
        }
    }

    /// Parameter value as text; strings unquoted, anything else rendered
    /// as JSON.
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_survive_round_trip() {
        let raw = json!({
            "_class": "hudson.model.FreeStyleProject",
            "allBuilds": [{
                "_class": "hudson.model.FreeStyleBuild",
                "number": 7,
                "timestamp": 1_496_000_000_000_i64,
                "duration": 60_000,
                "actions": [
                    {"_class": "hudson.model.CauseAction"},
                    {"_class": "hudson.model.ParametersAction",
                     "parameters": [{"_class": "StringParameterValue", "name": "INSTANCE", "value": "epmprod81"}]}
                ]
            }]
        });
        let history: BuildHistory = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(history.all_builds[0].number, 7);
        assert_eq!(serde_json::to_value(&history).unwrap(), raw);
    }

    #[test]
    fn seconds_are_floored() {
        let build = BuildRecord::new(1, 100_999, 900_500);
        assert_eq!(build.started_secs(), 100);
        assert_eq!(build.finished_secs(), Some(1001));
    }

    #[test]
    fn finish_past_i64_is_none() {
        let build = BuildRecord::new(1, 9_223_372_036_854_775_000, 1_000);
        assert_eq!(build.finished_secs(), None);
    }
}
