use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{invalid_yaml, PackageFile};

/// A representation of the `actions.yaml` file found in charm packages.
///
/// The file maps action names to their definition. It is optional, a package without it simply
/// has no actions.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct Actions {
    /// All actions by name.
    pub action_specs: IndexMap<String, ActionSpec>,
}

/// The definition of a single action.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ActionSpec {
    /// Human readable description of what the action does.
    #[serde(default)]
    pub description: String,

    /// The parameter schema of the action. The schema is kept as-is, its contents are not
    /// interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_yaml::Value>,
}

impl PackageFile for Actions {
    fn package_path() -> &'static Path {
        Path::new("actions.yaml")
    }

    fn from_str(str: &str) -> Result<Self, std::io::Error> {
        if str.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(str).map_err(|e| invalid_yaml(Self::package_path(), e))
    }
}
