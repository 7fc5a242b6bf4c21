//! Runs the layer queries of a tile and turns the results into displayable reports.

use log::debug;
use serde::ser::SerializeMap as _;
use serde::{Serialize, Serializer};

use crate::geometry::{GeometrySummary, decode_hex, ewkb_to_wkt};
use crate::mvt::{MvtLayerSummary, decode_layers};
use crate::query::{
    GEOMETRY_VALID_COLUMN, MVT_GEOMETRY_COLUMN, MVT_GEOMETRY_VALID_COLUMN, QueryBuilder,
};
use crate::source::{DataSource, Record, Warning};
use crate::tileset::HIDDEN_NAMES_COLUMN;
use crate::{InspectError, InspectResult, LayerDefinition, LayerSelection, TileCoord, TilesetDefinition};

/// Controls which columns are queried and how values are shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Keep localized name columns instead of replacing them with a single hidden column.
    pub show_names: bool,
    /// Show geometries as WKT instead of type and size.
    pub show_geometry: bool,
    /// Include the tile-encoded geometry and its validity flag.
    pub include_encoded_geometry: bool,
    /// Check every geometry with `ST_IsValid`.
    pub validate_geometry: bool,
    /// Show a placeholder for every null value, not only for pinned columns.
    pub show_nulls: bool,
    /// Query exactly these columns, in this order.
    pub columns: Option<Vec<String>>,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_names: false,
            show_geometry: false,
            include_encoded_geometry: true,
            validate_geometry: true,
            show_nulls: false,
            columns: None,
        }
    }
}

/// Columns shown after all other columns, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PinnedColumn {
    /// The layer key
    Key,
    /// Validity of the encoded geometry
    EncodedGeometryValid,
    /// The encoded geometry
    EncodedGeometry,
    /// Validity of the source geometry
    GeometryValid,
    /// The source geometry
    Geometry,
}

impl PinnedColumn {
    /// Returns the role of `column` within `layer`, if it is pinned.
    #[must_use]
    pub fn of(column: &str, layer: &LayerDefinition) -> Option<Self> {
        if layer.key_field.as_deref() == Some(column) {
            Some(Self::Key)
        } else if column == MVT_GEOMETRY_VALID_COLUMN {
            Some(Self::EncodedGeometryValid)
        } else if column == MVT_GEOMETRY_COLUMN {
            Some(Self::EncodedGeometry)
        } else if column == GEOMETRY_VALID_COLUMN {
            Some(Self::GeometryValid)
        } else if column == layer.geometry_field {
            Some(Self::Geometry)
        } else {
            None
        }
    }

    fn is_geometry(self) -> bool {
        matches!(self, Self::EncodedGeometry | Self::Geometry)
    }

    fn is_validity(self) -> bool {
        matches!(self, Self::EncodedGeometryValid | Self::GeometryValid)
    }
}

/// A single displayed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    /// A value as returned by the database.
    Text(String),
    /// A null shown as a placeholder.
    Null,
    /// A null that is not highlighted.
    Absent,
    /// A geometry, summarized or as WKT.
    Geometry(String),
}

/// Placeholder text for [`CellValue::Null`].
pub const NULL_PLACEHOLDER: &str = "NULL";

impl CellValue {
    /// Text shown in the table.
    #[must_use]
    pub fn as_display(&self) -> &str {
        match self {
            CellValue::Text(v) | CellValue::Geometry(v) => v,
            CellValue::Null => NULL_PLACEHOLDER,
            CellValue::Absent => "",
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(v) | CellValue::Geometry(v) => serializer.serialize_str(v),
            CellValue::Null | CellValue::Absent => serializer.serialize_none(),
        }
    }
}

/// One feature row, reconciled for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InspectionRow {
    cells: Vec<(String, CellValue)>,
}

impl Serialize for InspectionRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl InspectionRow {
    /// Value of a column, if the row has it.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(n, _)| n == column).map(|(_, v)| v)
    }

    /// Column names in display order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(n, _)| n.as_str())
    }

    /// Cells in display order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// Result of inspecting one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerReport {
    /// Layer identifier
    pub layer_id: String,
    /// Column names in display order.
    pub columns: Vec<String>,
    /// Feature rows
    pub rows: Vec<InspectionRow>,
    /// Size of the complete encoded layer in bytes, regardless of row filters.
    pub mvt_size: usize,
    /// Decoded summary of the encoded layer, when it could be decoded.
    pub mvt_layer: Option<MvtLayerSummary>,
    /// Localized name columns were removed from the rows.
    pub names_hidden: bool,
    /// Warnings collected while inspecting this layer.
    pub warnings: Vec<Warning>,
}

/// A layer that was not inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLayer {
    /// Layer identifier
    pub layer_id: String,
    /// Why it was skipped
    pub reason: String,
    /// Warnings raised by the failed query.
    pub warnings: Vec<Warning>,
}

/// Outcome for one selected layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LayerOutcome {
    /// The layer was inspected.
    Report(LayerReport),
    /// The layer lacks a requested column.
    Skipped(SkippedLayer),
}

impl LayerOutcome {
    /// Returns the report, if the layer was inspected.
    #[must_use]
    pub fn report(&self) -> Option<&LayerReport> {
        match self {
            LayerOutcome::Report(r) => Some(r),
            LayerOutcome::Skipped(_) => None,
        }
    }
}

/// Inspects layers of a tileset against a data source.
pub struct Inspector<'a, S> {
    source: &'a S,
    tileset: &'a TilesetDefinition,
    builder: QueryBuilder<'a>,
    options: DisplayOptions,
}

impl<'a, S: DataSource + Sync> Inspector<'a, S> {
    /// Creates an inspector with the default tile extent.
    #[must_use]
    pub fn new(source: &'a S, tileset: &'a TilesetDefinition, options: DisplayOptions) -> Self {
        Self {
            source,
            tileset,
            builder: QueryBuilder::new(tileset),
            options,
        }
    }

    /// Replaces the query builder, e.g. to change the extent.
    #[must_use]
    pub fn with_builder(mut self, builder: QueryBuilder<'a>) -> Self {
        self.builder = builder;
        self
    }

    /// Inspects every selected layer in tileset order.
    ///
    /// Layers lacking a requested column are skipped; any other error aborts.
    pub async fn inspect(
        &self,
        coord: TileCoord,
        selection: &LayerSelection,
    ) -> InspectResult<Vec<LayerOutcome>> {
        let layers = self.tileset.select_layers(selection)?;
        let mut outcomes = Vec::with_capacity(layers.len());
        for layer in layers {
            outcomes.push(self.inspect_layer(coord, layer).await?);
        }
        Ok(outcomes)
    }

    /// Inspects a single layer.
    pub async fn inspect_layer(
        &self,
        coord: TileCoord,
        layer: &LayerDefinition,
    ) -> InspectResult<LayerOutcome> {
        let queries = self.builder.layer_queries(layer, coord, &self.options);
        debug!("Layer {} rows query:\n{}", layer.id, queries.rows);

        let records = match self.source.query(&queries.rows).await {
            Ok(records) => records,
            Err(InspectError::ColumnNotFound(reason)) if self.options.columns.is_some() => {
                debug!("Skipping layer {}: {reason}", layer.id);
                return Ok(LayerOutcome::Skipped(SkippedLayer {
                    layer_id: layer.id.clone(),
                    reason,
                    warnings: self.source.drain_warnings(),
                }));
            }
            Err(e) => return Err(e),
        };

        debug!("Layer {} bytes query:\n{}", layer.id, queries.layer_bytes);
        let payload = self.source.query(&queries.layer_bytes).await?;
        let mut warnings = self.source.drain_warnings();

        let mvt = match payload.first().and_then(Record::first) {
            Some(value) => decode_hex(value)?,
            None => Vec::new(),
        };
        let mvt_layer = summarize_payload(&layer.id, &mvt, &mut warnings);
        count_invalid(&records, &mut warnings);

        let rows: Vec<InspectionRow> = records
            .into_iter()
            .map(|r| self.reconcile(r, layer, &mut warnings))
            .collect();

        let mut columns: Vec<String> = Vec::new();
        for name in rows.iter().flat_map(InspectionRow::columns) {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }

        Ok(LayerOutcome::Report(LayerReport {
            layer_id: layer.id.clone(),
            columns,
            rows,
            mvt_size: mvt.len(),
            mvt_layer,
            names_hidden: !self.options.show_names && layer.has_localized_names(),
            warnings,
        }))
    }

    /// Orders the columns of a record and converts its values for display.
    fn reconcile(
        &self,
        record: Record,
        layer: &LayerDefinition,
        warnings: &mut Vec<Warning>,
    ) -> InspectionRow {
        let mut fields: Vec<_> = record
            .into_iter()
            .filter(|(name, _)| name != HIDDEN_NAMES_COLUMN)
            .map(|(name, value)| {
                let role = PinnedColumn::of(&name, layer);
                (name, value, role)
            })
            .collect();

        if self.options.columns.is_none() {
            // stable: unpinned columns keep query order
            fields.sort_by_key(|(_, _, role)| *role);
        }

        let cells = fields
            .into_iter()
            .map(|(name, value, role)| {
                let cell = match value {
                    None if self.options.show_nulls || role.is_some() => CellValue::Null,
                    None => CellValue::Absent,
                    Some(v) if role.is_some_and(PinnedColumn::is_geometry) => {
                        self.format_geometry(&name, v, warnings)
                    }
                    Some(v) if role.is_some_and(PinnedColumn::is_validity) => {
                        CellValue::Text(format_bool(v))
                    }
                    Some(v) => CellValue::Text(v),
                };
                (name, cell)
            })
            .collect();

        InspectionRow { cells }
    }

    fn format_geometry(
        &self,
        column: &str,
        value: String,
        warnings: &mut Vec<Warning>,
    ) -> CellValue {
        let formatted = decode_hex(&value).and_then(|data| {
            if self.options.show_geometry {
                ewkb_to_wkt(&data)
            } else {
                GeometrySummary::try_from_ewkb(&data).map(|s| s.to_string())
            }
        });
        match formatted {
            Ok(text) => CellValue::Geometry(text),
            Err(e) => {
                warnings.push(Warning::validation(format!(
                    "Unable to decode geometry in column {column}: {e}"
                )));
                CellValue::Text(value)
            }
        }
    }
}

/// `PostgreSQL` returns booleans as `t` and `f` in text mode.
fn format_bool(value: String) -> String {
    match value.as_str() {
        "t" => "true".to_string(),
        "f" => "false".to_string(),
        _ => value,
    }
}

fn summarize_payload(
    layer_id: &str,
    mvt: &[u8],
    warnings: &mut Vec<Warning>,
) -> Option<MvtLayerSummary> {
    if mvt.is_empty() {
        return None;
    }
    match decode_layers(mvt) {
        Ok(layers) => {
            if let Some(other) = layers.iter().find(|l| l.name != layer_id) {
                warnings.push(Warning::validation(format!(
                    "Encoded tile contains unexpected layer '{}'",
                    other.name
                )));
            }
            layers.into_iter().find(|l| l.name == layer_id)
        }
        Err(e) => {
            warnings.push(Warning::validation(format!(
                "Unable to decode the encoded layer: {e}"
            )));
            None
        }
    }
}

fn count_invalid(records: &[Record], warnings: &mut Vec<Warning>) {
    for (column, what) in [
        (MVT_GEOMETRY_VALID_COLUMN, "encoded geometries"),
        (GEOMETRY_VALID_COLUMN, "geometries"),
    ] {
        let invalid = records
            .iter()
            .filter(|r| r.get(column) == Some(Some("f")))
            .count();
        if invalid > 0 {
            warnings.push(Warning::validation(format!(
                "{invalid} {what} failed ST_IsValid"
            )));
        }
    }
}
