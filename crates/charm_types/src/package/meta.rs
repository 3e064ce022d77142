use std::collections::BTreeSet;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{invalid_yaml, PackageFile};

/// Hooks every charm may implement regardless of the relations it declares.
const LIFECYCLE_HOOKS: [&str; 5] = ["install", "start", "config-changed", "upgrade-charm", "stop"];

/// Hooks that are fired for each relation a charm declares.
const RELATION_HOOK_SUFFIXES: [&str; 4] = [
    "relation-joined",
    "relation-changed",
    "relation-departed",
    "relation-broken",
];

/// A representation of the `metadata.yaml` file found in every charm package.
///
/// The `metadata.yaml` file is the only metadata file a package is required to have. Only the
/// `name` is mandatory, all other fields have sensible defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Eq, PartialEq)]
pub struct Meta {
    /// The name of the charm.
    pub name: String,

    /// One line summary of what the charm does.
    #[serde(default)]
    pub summary: String,

    /// Long form description of the charm.
    #[serde(default)]
    pub description: String,

    /// Whether the charm is deployed alongside a principal charm.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub subordinate: bool,

    /// Relations the charm provides to others.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub provides: IndexMap<String, Relation>,

    /// Relations the charm requires from others.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub requires: IndexMap<String, Relation>,

    /// Relations between units of the same charm.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub peers: IndexMap<String, Relation>,

    /// Free form categories.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,

    /// Legacy location of the package revision. Newer packages store it in a separate `revision`
    /// file which takes precedence over this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

impl PackageFile for Meta {
    fn package_path() -> &'static Path {
        Path::new("metadata.yaml")
    }

    fn from_str(str: &str) -> Result<Self, std::io::Error> {
        serde_yaml::from_str(str).map_err(|e| invalid_yaml(Self::package_path(), e))
    }
}

impl Meta {
    /// Iterates over all relations declared by the charm together with their role.
    pub fn relations(&self) -> impl Iterator<Item = (RelationRole, &str, &Relation)> + '_ {
        [
            (RelationRole::Provider, &self.provides),
            (RelationRole::Requirer, &self.requires),
            (RelationRole::Peer, &self.peers),
        ]
        .into_iter()
        .flat_map(|(role, relations)| {
            relations
                .iter()
                .map(move |(name, relation)| (role, name.as_str(), relation))
        })
    }

    /// Returns the names of all hooks the charm may implement: the lifecycle hooks plus four hooks
    /// for every declared relation.
    pub fn hooks(&self) -> BTreeSet<String> {
        let mut hooks: BTreeSet<String> = LIFECYCLE_HOOKS.iter().map(|h| (*h).to_owned()).collect();
        for (_, name, _) in self.relations() {
            hooks.extend(
                RELATION_HOOK_SUFFIXES
                    .iter()
                    .map(|suffix| format!("{name}-{suffix}")),
            );
        }
        hooks
    }
}

/// The role a charm plays in a relation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RelationRole {
    /// Declared under `provides`.
    Provider,
    /// Declared under `requires`.
    Requirer,
    /// Declared under `peers`.
    Peer,
}

/// The scope of a relation.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RelationScope {
    /// Units of both applications see each other.
    #[default]
    Global,
    /// Only units in the same container see each other.
    Container,
}

/// A relation declaration. In `metadata.yaml` a relation is either written as a bare interface
/// name or as a mapping with additional settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Eq, PartialEq)]
#[serde(from = "RawRelation")]
pub struct Relation {
    /// The interface spoken over the relation.
    pub interface: String,

    /// Whether the charm can function without the relation.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,

    /// Maximum number of established relations, if limited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// The scope of the relation.
    pub scope: RelationScope,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRelation {
    Interface(String),
    Full {
        interface: String,
        #[serde(default)]
        optional: bool,
        #[serde(default)]
        limit: Option<u32>,
        #[serde(default)]
        scope: RelationScope,
    },
}

impl From<RawRelation> for Relation {
    fn from(raw: RawRelation) -> Self {
        match raw {
            RawRelation::Interface(interface) => Relation {
                interface,
                ..Relation::default()
            },
            RawRelation::Full {
                interface,
                optional,
                limit,
                scope,
            } => Relation {
                interface,
                optional,
                limit,
                scope,
            },
        }
    }
}
