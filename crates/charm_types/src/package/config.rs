use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{invalid_yaml, PackageFile};

/// A representation of the `config.yaml` file found in charm packages.
///
/// The file is optional. A package without it has no configuration options, see
/// [`Config::default`].
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// All configuration options by name.
    #[serde(default)]
    pub options: IndexMap<String, ConfigOption>,
}

/// A single option in `config.yaml`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ConfigOption {
    /// The type of value the option accepts.
    #[serde(rename = "type", default)]
    pub option_type: OptionType,

    /// Human readable description of the option.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The value used when the option is not set explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_yaml::Value>,
}

/// The value types a configuration option can have.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Deserialize,
    Serialize,
    Eq,
    PartialEq,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OptionType {
    /// A string value.
    #[default]
    String,
    /// An integer value.
    Int,
    /// A floating point value.
    Float,
    /// A boolean value.
    Boolean,
}

impl PackageFile for Config {
    fn package_path() -> &'static Path {
        Path::new("config.yaml")
    }

    fn from_str(str: &str) -> Result<Self, std::io::Error> {
        if str.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(str).map_err(|e| invalid_yaml(Self::package_path(), e))
    }
}
