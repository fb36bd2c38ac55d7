//! Deployment group membership, built once from the CIC instance listing.

use std::collections::BTreeMap;

use cic_client::InstanceSummary;
use serde::{Deserialize, Serialize};

/// Update group name → member instance names, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentGroups(BTreeMap<String, Vec<String>>);

impl DeploymentGroups {
    /// Group the listed instances by update group, keeping only `known`
    /// groups. Duplicate instance names are listed once.
    pub fn from_instances(instances: &[InstanceSummary], known: &[String]) -> Self {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for instance in instances {
            if !known.contains(&instance.update_group) {
                continue;
            }
            let members = groups.entry(instance.update_group.clone()).or_default();
            if !members.contains(&instance.name) {
                members.push(instance.name.clone());
            }
        }
        Self(groups)
    }

    pub fn members(&self, group: &str) -> Option<&[String]> {
        self.0.get(group).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for DeploymentGroups {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
