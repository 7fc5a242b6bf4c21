//! SQL generation for a single layer of a tile.
//!
//! Each layer produces two statements: one exposing every feature row together with
//! its tile-encoded geometry and validity checks, and one computing the encoded
//! layer exactly as it would be served.

use crate::inspect::DisplayOptions;
use crate::tileset::{HIDDEN_NAMES_COLUMN, NAME_LANGUAGES_TOKEN};
use crate::{LayerDefinition, TileCoord, TilesetDefinition};

/// Default MVT extent, in tile-local units.
pub const DEFAULT_EXTENT: u32 = 4096;

/// Geometry clipped and encoded into tile space by `ST_AsMVTGeom`.
pub const MVT_GEOMETRY_COLUMN: &str = "mvtgeometry";
/// `ST_IsValid` of the encoded geometry.
pub const MVT_GEOMETRY_VALID_COLUMN: &str = "_mvtgeom_valid";
/// `ST_IsValid` of the source geometry.
pub const GEOMETRY_VALID_COLUMN: &str = "_geom_valid";

const TILE_PIXELS: u32 = 256;
const WORLD_SCALE_DENOMINATOR: f64 = 559_082_264.028_717;

/// The statements needed to inspect one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerQueries {
    /// Per-feature rows, honouring the display options.
    pub rows: String,
    /// A single `bytea` value with the complete encoded layer.
    pub layer_bytes: String,
}

/// Quotes an SQL identifier.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes an SQL string literal.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn tile_envelope(coord: TileCoord) -> String {
    format!("ST_TileEnvelope({}, {}, {})", coord.z(), coord.x(), coord.y())
}

/// Builds layer queries for one tileset.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    tileset: &'a TilesetDefinition,
    extent: u32,
}

impl<'a> QueryBuilder<'a> {
    /// Creates a builder using [`DEFAULT_EXTENT`].
    #[must_use]
    pub fn new(tileset: &'a TilesetDefinition) -> Self {
        Self {
            tileset,
            extent: DEFAULT_EXTENT,
        }
    }

    /// Overrides the tile extent.
    #[must_use]
    pub fn with_extent(mut self, extent: u32) -> Self {
        self.extent = extent;
        self
    }

    /// Returns the tile extent used for encoding.
    #[must_use]
    pub fn extent(&self) -> u32 {
        self.extent
    }

    /// Builds both queries for a layer.
    ///
    /// Localized names are hidden from the row query unless `options.show_names` is set.
    /// The layer bytes query always uses the layer as defined.
    #[must_use]
    pub fn layer_queries(
        &self,
        layer: &LayerDefinition,
        coord: TileCoord,
        options: &DisplayOptions,
    ) -> LayerQueries {
        let rows = if !options.show_names && layer.has_localized_names() {
            self.row_query(&layer.with_localized_names_suppressed(), coord, options)
        } else {
            self.row_query(layer, coord, options)
        };

        LayerQueries {
            rows,
            layer_bytes: self.layer_bytes_query(layer, coord),
        }
    }

    /// Substitutes the template tokens of the layer query for the given tile.
    #[must_use]
    pub fn layer_source(&self, layer: &LayerDefinition, coord: TileCoord) -> String {
        let bbox = if layer.buffer_size == 0 {
            tile_envelope(coord)
        } else {
            let margin = f64::from(layer.buffer_size) / f64::from(TILE_PIXELS);
            format!(
                "ST_TileEnvelope({}, {}, {}, margin => {margin})",
                coord.z(),
                coord.x(),
                coord.y()
            )
        };
        let scale_denominator = WORLD_SCALE_DENOMINATOR / 2_f64.powi(i32::from(coord.z()));

        layer
            .query
            .replace(NAME_LANGUAGES_TOKEN, &self.name_languages())
            .replace("!bbox!", &bbox)
            .replace("!zoom_level!", &coord.z().to_string())
            .replace("!scale_denominator!", &scale_denominator.to_string())
            .replace("!pixel_width!", &TILE_PIXELS.to_string())
            .replace("!pixel_height!", &TILE_PIXELS.to_string())
    }

    fn name_languages(&self) -> String {
        if self.tileset.languages.is_empty() {
            return format!("NULL AS {HIDDEN_NAMES_COLUMN}");
        }
        self.tileset
            .language_columns()
            .iter()
            .map(|column| {
                format!(
                    "NULLIF(tags->{}, '') AS {}",
                    quote_literal(column),
                    quote_ident(column)
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn mvt_geometry(&self, layer: &LayerDefinition, coord: TileCoord) -> String {
        format!(
            "ST_AsMVTGeom({}, {}, {}, {}, true)",
            quote_ident(&layer.geometry_field),
            tile_envelope(coord),
            self.extent,
            u64::from(layer.buffer_size) * u64::from(self.extent) / u64::from(TILE_PIXELS)
        )
    }

    fn zoom_guard(layer: &LayerDefinition, coord: TileCoord) -> &'static str {
        if layer.is_visible_at(coord.z()) {
            ""
        } else {
            " WHERE FALSE"
        }
    }

    /// Query returning one row per feature with all source columns plus the inspection columns.
    #[must_use]
    pub fn row_query(
        &self,
        layer: &LayerDefinition,
        coord: TileCoord,
        options: &DisplayOptions,
    ) -> String {
        let mut encoded = String::new();
        if options.include_encoded_geometry {
            encoded = format!(
                ", {} AS {MVT_GEOMETRY_COLUMN}",
                self.mvt_geometry(layer, coord)
            );
        }

        let mut checks = String::new();
        if options.validate_geometry {
            if options.include_encoded_geometry {
                checks.push_str(&format!(
                    ", ST_IsValid({MVT_GEOMETRY_COLUMN}) AS {MVT_GEOMETRY_VALID_COLUMN}"
                ));
            }
            checks.push_str(&format!(
                ", ST_IsValid({}) AS {GEOMETRY_VALID_COLUMN}",
                quote_ident(&layer.geometry_field)
            ));
        }

        let projection = match &options.columns {
            Some(columns) => columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", "),
            None => "*".to_string(),
        };

        format!(
            "SELECT {projection}\nFROM (\n  SELECT *{checks}\n  FROM (\n    SELECT *{encoded}\n    FROM {source}{guard}\n  ) AS mvt_rows\n) AS inspect_rows",
            source = self.layer_source(layer, coord),
            guard = Self::zoom_guard(layer, coord),
        )
    }

    /// Query returning the complete encoded layer as a single `bytea` value.
    #[must_use]
    pub fn layer_bytes_query(&self, layer: &LayerDefinition, coord: TileCoord) -> String {
        let mut names: Vec<String> = Vec::new();
        if let Some(key) = &layer.key_field {
            names.push(key.clone());
        }
        let languages = if layer.has_localized_names() {
            self.tileset.language_columns()
        } else {
            Vec::new()
        };
        for field in layer.fields.iter().chain(&languages) {
            if !names.contains(field) {
                names.push(field.clone());
            }
        }

        let mut columns: Vec<String> = names.iter().map(|n| quote_ident(n)).collect();
        columns.push(format!(
            "{} AS {MVT_GEOMETRY_COLUMN}",
            self.mvt_geometry(layer, coord)
        ));

        let feature_id = match &layer.key_field {
            Some(key) if !layer.key_field_as_attribute => format!(", {}", quote_literal(key)),
            _ => String::new(),
        };

        format!(
            "SELECT ST_AsMVT(tile, {name}, {extent}, {geom}{feature_id}) AS mvt\nFROM (\n  SELECT {columns}\n  FROM {source}{guard}\n) AS tile\nWHERE {MVT_GEOMETRY_COLUMN} IS NOT NULL",
            name = quote_literal(&layer.id),
            extent = self.extent,
            geom = quote_literal(MVT_GEOMETRY_COLUMN),
            columns = columns.join(", "),
            source = self.layer_source(layer, coord),
            guard = Self::zoom_guard(layer, coord),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::TILESET_FILE;

    fn tileset() -> TilesetDefinition {
        TilesetDefinition::load(TILESET_FILE).unwrap()
    }

    fn layer<'a>(tileset: &'a TilesetDefinition, id: &str) -> &'a LayerDefinition {
        tileset.layers.iter().find(|l| l.id == id).unwrap()
    }

    #[test]
    fn quoting() {
        assert_eq!(quote_ident("name:en"), "\"name:en\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn template_substitution() {
        let ts = tileset();
        let builder = QueryBuilder::new(&ts);
        let source = builder.layer_source(layer(&ts, "place"), TileCoord::new(0, 0, 0));

        assert!(source.contains("ST_TileEnvelope(0, 0, 0, margin => 1)"));
        assert!(!source.contains("!zoom_level!"));
        assert!(source.contains("559082264.028717"));
        assert!(source.contains(", 256, "));
        assert!(source.contains(
            "NULLIF(tags->'name:en', '') AS \"name:en\", NULLIF(tags->'name:de', '') AS \"name:de\""
        ));

        let water = builder.layer_source(layer(&ts, "water"), TileCoord::new(10, 4, 8));
        assert!(water.contains("layer_water(ST_TileEnvelope(10, 4, 8, margin => 0.015625), 10)"));
    }

    #[test]
    fn row_query_default_options() {
        let ts = tileset();
        let builder = QueryBuilder::new(&ts);
        let sql = builder.row_query(
            layer(&ts, "water"),
            TileCoord::new(10, 4, 8),
            &DisplayOptions::default(),
        );

        assert!(sql.starts_with("SELECT *\n"));
        assert!(sql.contains(
            "ST_AsMVTGeom(\"geometry\", ST_TileEnvelope(10, 4, 8), 4096, 64, true) AS mvtgeometry"
        ));
        assert!(sql.contains("ST_IsValid(mvtgeometry) AS _mvtgeom_valid"));
        assert!(sql.contains("ST_IsValid(\"geometry\") AS _geom_valid"));
        assert!(!sql.contains("WHERE FALSE"));
    }

    #[test]
    fn row_query_without_encoded_geometry_or_validation() {
        let ts = tileset();
        let builder = QueryBuilder::new(&ts);
        let options = DisplayOptions {
            include_encoded_geometry: false,
            ..DisplayOptions::default()
        };
        let sql = builder.row_query(layer(&ts, "water"), TileCoord::new(10, 4, 8), &options);
        assert!(!sql.contains("ST_AsMVTGeom"));
        assert!(!sql.contains("_mvtgeom_valid"));
        assert!(sql.contains("_geom_valid"));

        let options = DisplayOptions {
            validate_geometry: false,
            ..DisplayOptions::default()
        };
        let sql = builder.row_query(layer(&ts, "water"), TileCoord::new(10, 4, 8), &options);
        assert!(sql.contains("ST_AsMVTGeom"));
        assert!(!sql.contains("ST_IsValid"));
    }

    #[test]
    fn row_query_column_filter_keeps_order() {
        let ts = tileset();
        let options = DisplayOptions {
            columns: Some(vec!["name".into(), "class".into(), "name:en".into()]),
            ..DisplayOptions::default()
        };
        let sql = QueryBuilder::new(&ts).row_query(
            layer(&ts, "place"),
            TileCoord::new(5, 1, 2),
            &options,
        );
        assert!(sql.starts_with("SELECT \"name\", \"class\", \"name:en\"\n"));
    }

    #[test]
    fn row_query_hides_names_by_default() {
        let ts = tileset();
        let builder = QueryBuilder::new(&ts);
        let place = layer(&ts, "place");
        let coord = TileCoord::new(5, 1, 2);

        let queries = builder.layer_queries(place, coord, &DisplayOptions::default());
        assert!(queries.rows.contains("NULL AS _hidden_names_"));
        assert!(!queries.rows.contains("name:en"));
        assert!(queries.layer_bytes.contains("\"name:en\""));

        let shown = DisplayOptions {
            show_names: true,
            ..DisplayOptions::default()
        };
        let queries = builder.layer_queries(place, coord, &shown);
        assert!(!queries.rows.contains("_hidden_names_"));
        assert!(queries.rows.contains("AS \"name:de\""));
    }

    #[test]
    fn layer_bytes_query() {
        let ts = tileset();
        let builder = QueryBuilder::new(&ts).with_extent(512);
        let coord = TileCoord::new(10, 4, 8);

        let water = builder.layer_bytes_query(layer(&ts, "water"), coord);
        assert!(water.starts_with(
            "SELECT ST_AsMVT(tile, 'water', 512, 'mvtgeometry', 'osm_id') AS mvt\n"
        ));
        assert!(water.contains(
            "SELECT \"osm_id\", \"class\", \"intermittent\", ST_AsMVTGeom(\"geometry\", ST_TileEnvelope(10, 4, 8), 512, 8, true) AS mvtgeometry"
        ));
        assert!(water.ends_with("WHERE mvtgeometry IS NOT NULL"));

        let place = builder.layer_bytes_query(layer(&ts, "place"), coord);
        assert!(place.starts_with("SELECT ST_AsMVT(tile, 'place', 512, 'mvtgeometry') AS mvt\n"));
        assert!(place.contains("\"osm_id\", \"name\", \"class\", \"rank\", \"name:en\", \"name:de\""));
    }

    #[test]
    fn layer_outside_zoom_range() {
        let ts = tileset();
        let builder = QueryBuilder::new(&ts);
        let roads = layer(&ts, "roads");

        let queries = builder.layer_queries(roads, TileCoord::new(3, 1, 1), &DisplayOptions::default());
        assert!(queries.rows.contains(") AS t WHERE FALSE"));
        assert!(queries.layer_bytes.contains(") AS t WHERE FALSE"));

        let queries = builder.layer_queries(roads, TileCoord::new(4, 1, 1), &DisplayOptions::default());
        assert!(!queries.rows.contains("WHERE FALSE"));
    }

    #[test]
    fn large_buffer_and_extent_do_not_overflow() {
        let ts = tileset();
        let coord = TileCoord::new(10, 4, 8);

        let builder = QueryBuilder::new(&ts).with_extent(1 << 30);
        let sql = builder.row_query(layer(&ts, "water"), coord, &DisplayOptions::default());
        assert!(sql.contains("ST_TileEnvelope(10, 4, 8), 1073741824, 16777216, true)"));

        let mut wide = layer(&ts, "water").clone();
        wide.buffer_size = 2_000_000;
        let sql = QueryBuilder::new(&ts).layer_bytes_query(&wide, coord);
        assert!(sql.contains("ST_TileEnvelope(10, 4, 8), 4096, 32000000, true)"));
    }
}
