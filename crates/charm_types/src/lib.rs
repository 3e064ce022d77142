#![deny(missing_docs)]
//! `charm_types` contains data models for the metadata files found within a charm package:
//! `metadata.yaml`, `config.yaml` and `actions.yaml`. The library itself doesnt provide any
//! functionality besides parsing the data types. Reading them from a package archive is done by
//! the `charm_archive` crate through the [`package::PackageFile`] trait.

pub mod package;

pub use package::{Actions, Config, Meta, PackageFile};
