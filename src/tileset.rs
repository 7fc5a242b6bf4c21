//! Loading of OpenMapTiles-style tileset definitions.
//!
//! A tileset is a YAML file listing layer files. Each layer file describes one
//! layer of the vector tile and carries the SQL query producing its features.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::{InspectError, InspectResult};

/// Substitution point in a layer query that expands to the localized name columns.
pub const NAME_LANGUAGES_TOKEN: &str = "{name_languages}";

/// Column that replaces the localized name columns when they are hidden.
pub const HIDDEN_NAMES_COLUMN: &str = "_hidden_names_";

#[derive(Deserialize)]
struct TilesetFile {
    tileset: TilesetSection,
}

#[derive(Deserialize)]
struct TilesetSection {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    languages: Vec<String>,
    #[serde(default)]
    minzoom: u8,
    #[serde(default = "default_max_zoom")]
    maxzoom: u8,
    layers: Vec<LayerRef>,
}

fn default_max_zoom() -> u8 {
    14
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LayerRef {
    Path(PathBuf),
    File { file: PathBuf },
}

impl LayerRef {
    fn path(&self) -> &Path {
        match self {
            LayerRef::Path(p) | LayerRef::File { file: p } => p,
        }
    }
}

#[derive(Deserialize)]
struct LayerFile {
    layer: LayerSection,
}

#[derive(Deserialize)]
struct LayerSection {
    id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    buffer_size: u32,
    #[serde(default)]
    minzoom: Option<u8>,
    #[serde(default)]
    maxzoom: Option<u8>,
    #[serde(default)]
    fields: serde_yaml::Mapping,
    datasource: DatasourceSection,
}

#[derive(Deserialize)]
struct DatasourceSection {
    query: String,
    #[serde(default = "default_geometry_field")]
    geometry_field: String,
    #[serde(default)]
    key_field: Option<String>,
    #[serde(default, deserialize_with = "deserialize_yes_no")]
    key_field_as_attribute: bool,
}

fn default_geometry_field() -> String {
    "geometry".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YamlBool {
    Bool(bool),
    Text(String),
}

/// Layer files are written with YAML 1.1 booleans (`yes`/`no`), which a YAML 1.2 parser reads as strings.
fn deserialize_yes_no<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match YamlBool::deserialize(deserializer)? {
        YamlBool::Bool(v) => Ok(v),
        YamlBool::Text(text) => match text.to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" | "on" => Ok(true),
            "no" | "n" | "false" | "off" => Ok(false),
            _ => Err(D::Error::custom(format!("expected yes or no, got '{text}'"))),
        },
    }
}

/// A single layer of a tileset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDefinition {
    /// Layer identifier, unique within the tileset.
    pub id: String,
    /// Human readable description.
    pub description: String,
    /// Buffer around the tile, in pixels of a 256px tile.
    pub buffer_size: u32,
    /// First zoom level the layer has data for.
    pub min_zoom: Option<u8>,
    /// Last zoom level the layer has data for.
    pub max_zoom: Option<u8>,
    /// Documented attribute columns, in declaration order.
    pub fields: Vec<String>,
    /// Name of the geometry column produced by the query.
    pub geometry_field: String,
    /// Name of the primary key column, if any.
    pub key_field: Option<String>,
    /// Whether the key is kept as a regular attribute instead of the feature id.
    pub key_field_as_attribute: bool,
    /// Query template, `(SELECT ...) AS t`, with `!token!` substitution points.
    pub query: String,
}

impl LayerDefinition {
    /// Parses a single layer file.
    pub fn from_yaml(yaml: &str) -> InspectResult<Self> {
        let LayerFile { layer } = serde_yaml::from_str(yaml)?;
        let fields = layer
            .fields
            .keys()
            .filter_map(|key| key.as_str().map(str::to_string))
            .collect();

        Ok(Self {
            id: layer.id,
            description: layer.description.trim().to_string(),
            buffer_size: layer.buffer_size,
            min_zoom: layer.minzoom,
            max_zoom: layer.maxzoom,
            fields,
            geometry_field: layer.datasource.geometry_field,
            key_field: layer.datasource.key_field,
            key_field_as_attribute: layer.datasource.key_field_as_attribute,
            query: layer.datasource.query.trim().to_string(),
        })
    }

    /// True if the query expands localized name columns.
    #[must_use]
    pub fn has_localized_names(&self) -> bool {
        self.query.contains(NAME_LANGUAGES_TOKEN)
    }

    /// Returns a copy of this layer with the localized name columns replaced by a single null column.
    #[must_use]
    pub fn with_localized_names_suppressed(&self) -> LayerDefinition {
        LayerDefinition {
            query: self
                .query
                .replace(NAME_LANGUAGES_TOKEN, &format!("NULL AS {HIDDEN_NAMES_COLUMN}")),
            ..self.clone()
        }
    }

    /// False if the layer declares a zoom range that excludes `zoom`.
    #[must_use]
    pub fn is_visible_at(&self, zoom: u8) -> bool {
        self.min_zoom.is_none_or(|min| zoom >= min) && self.max_zoom.is_none_or(|max| zoom <= max)
    }
}

/// Which layers of a tileset to inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerSelection {
    ids: Vec<String>,
    exclude: bool,
}

impl LayerSelection {
    /// Selects the given layers, or every layer except them if `exclude` is set.
    ///
    /// An empty list selects everything, unless `exclude` is set, which is an error.
    pub fn new(ids: Vec<String>, exclude: bool) -> InspectResult<Self> {
        if exclude && ids.is_empty() {
            return Err(InspectError::Configuration(
                "excluding layers requires at least one layer id".to_string(),
            ));
        }
        Ok(Self { ids, exclude })
    }

    /// Selects every layer.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    fn includes(&self, id: &str) -> bool {
        if self.ids.is_empty() {
            return true;
        }
        self.ids.iter().any(|v| v == id) != self.exclude
    }
}

/// A parsed tileset: ordered layers plus the settings shared by all of them.
#[derive(Debug, Clone)]
pub struct TilesetDefinition {
    /// Tileset name
    pub name: String,
    /// Tileset version, if declared
    pub version: Option<String>,
    /// Language codes expanded by the `{name_languages}` substitution point.
    pub languages: Vec<String>,
    /// Minimum zoom of the tileset
    pub min_zoom: u8,
    /// Maximum zoom of the tileset
    pub max_zoom: u8,
    /// Layers in declaration order
    pub layers: Vec<LayerDefinition>,
}

impl TilesetDefinition {
    /// Loads a tileset file and all layer files it references.
    ///
    /// Layer paths are relative to the directory of the tileset file.
    pub fn load<P: AsRef<Path>>(path: P) -> InspectResult<Self> {
        let path = path.as_ref();
        debug!("Loading tileset {}", path.display());
        let TilesetFile { tileset } = serde_yaml::from_str(&fs::read_to_string(path)?)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));

        let mut layers = Vec::with_capacity(tileset.layers.len());
        let mut seen = HashSet::new();
        for layer_ref in &tileset.layers {
            let layer_path = base.join(layer_ref.path());
            debug!("Loading layer {}", layer_path.display());
            let layer = LayerDefinition::from_yaml(&fs::read_to_string(&layer_path)?)?;
            if !seen.insert(layer.id.clone()) {
                return Err(InspectError::Configuration(format!(
                    "layer '{}' is defined more than once",
                    layer.id
                )));
            }
            layers.push(layer);
        }

        Ok(Self {
            name: tileset.name,
            version: tileset.version,
            languages: tileset.languages,
            min_zoom: tileset.minzoom,
            max_zoom: tileset.maxzoom,
            layers,
        })
    }

    /// Returns the selected layers in tileset order.
    ///
    /// Every id named by the selection must exist in the tileset.
    pub fn select_layers(&self, selection: &LayerSelection) -> InspectResult<Vec<&LayerDefinition>> {
        if let Some(unknown) = selection
            .ids
            .iter()
            .find(|id| !self.layers.iter().any(|l| &l.id == *id))
        {
            return Err(InspectError::UnknownLayer(unknown.clone()));
        }

        Ok(self
            .layers
            .iter()
            .filter(|l| selection.includes(&l.id))
            .collect())
    }

    /// Column names produced by the `{name_languages}` substitution point.
    #[must_use]
    pub fn language_columns(&self) -> Vec<String> {
        self.languages.iter().map(|l| format!("name:{l}")).collect()
    }
}
