//! Country identifiers of the map geometry.
//!
//! Only the identifier space of the boundary file matters to the pipeline: the
//! choropleth layers are joined to the geometry on `feature.properties.name`.

use crate::errors::{GhgError, GhgResult};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: FeatureProperties,
}

#[derive(Deserialize, Default)]
struct FeatureProperties {
    name: Option<String>,
}

/// Set of country names known to the map geometry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeometryIndex {
    names: BTreeSet<String>,
}

impl GeometryIndex {
    pub fn from_names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Load the identifiers from a GeoJSON feature collection
    pub fn from_path(path: impl AsRef<Path>) -> GhgResult<Self> {
        let path = path.as_ref();
        let index = Self::from_reader(BufReader::new(File::open(path)?))?;
        info!(
            path = %path.display(),
            countries = index.len(),
            "Loaded map geometry identifiers"
        );
        Ok(index)
    }

    /// Parse the identifiers from GeoJSON.
    ///
    /// Features without a `name` property are skipped. A collection without any named
    /// feature is rejected, since every join against it would fail.
    pub fn from_reader<R: Read>(reader: R) -> GhgResult<Self> {
        let collection: FeatureCollection = serde_json::from_reader(reader)?;
        let index = Self::from_names(
            collection
                .features
                .into_iter()
                .filter_map(|feature| feature.properties.name),
        );
        if index.is_empty() {
            return Err(GhgError::Error(
                "Map geometry does not contain any named features".to_string(),
            ));
        }
        Ok(index)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
