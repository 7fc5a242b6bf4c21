//! Summaries of the layers in an encoded vector tile.

use geozero::mvt::{Message as _, Tile};
use serde::Serialize;

use crate::{InspectError, InspectResult};

/// Counts and metadata of one encoded layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MvtLayerSummary {
    /// Layer name
    pub name: String,
    /// Vector tile format version
    pub version: u32,
    /// Tile extent
    pub extent: u32,
    /// Number of features
    pub features: usize,
    /// Number of distinct attribute keys
    pub keys: usize,
    /// Number of distinct attribute values
    pub values: usize,
}

/// Summarizes every layer of an uncompressed tile payload, in payload order.
pub fn decode_layers(data: &[u8]) -> InspectResult<Vec<MvtLayerSummary>> {
    let tile = Tile::decode(data).map_err(|e| InspectError::InvalidMvt(e.to_string()))?;

    tile.layers
        .into_iter()
        .map(|layer| {
            if layer.name.is_empty() {
                return Err(InspectError::InvalidMvt("layer without a name".to_string()));
            }
            Ok(MvtLayerSummary {
                extent: layer.extent(),
                version: layer.version,
                features: layer.features.len(),
                keys: layer.keys.len(),
                values: layer.values.len(),
                name: layer.name,
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use geozero::mvt::tile::{Feature, Layer};

    use super::*;

    fn layer(name: &str, features: usize) -> Layer {
        Layer {
            version: 2,
            name: name.to_string(),
            features: vec![
                Feature {
                    id: Some(1),
                    ..Feature::default()
                };
                features
            ],
            keys: vec!["class".to_string()],
            values: vec![],
            extent: Some(4096),
        }
    }

    /// Encodes a tile holding a single layer with empty features.
    pub(crate) fn encode_tile(name: &str, features: usize) -> Vec<u8> {
        Tile {
            layers: vec![layer(name, features)],
        }
        .encode_to_vec()
    }

    #[test]
    fn decode_single_layer() {
        let layers = decode_layers(&encode_tile("water", 3)).unwrap();
        assert_eq!(
            layers,
            vec![MvtLayerSummary {
                name: "water".to_string(),
                version: 2,
                extent: 4096,
                features: 3,
                keys: 1,
                values: 0,
            }]
        );
    }

    #[test]
    fn decode_layers_in_payload_order() {
        let tile = Tile {
            layers: vec![layer("water", 1), layer("roads", 0)],
        };
        let names: Vec<String> = decode_layers(&tile.encode_to_vec())
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, ["water", "roads"]);
    }

    #[test]
    fn missing_extent_defaults_to_4096() {
        let mut water = layer("water", 1);
        water.extent = None;
        let data = Tile { layers: vec![water] }.encode_to_vec();
        assert_eq!(decode_layers(&data).unwrap()[0].extent, 4096);
    }

    #[test]
    fn decode_empty_payload() {
        assert!(decode_layers(&[]).unwrap().is_empty());
    }

    #[test]
    fn decode_truncated_payload() {
        let tile = encode_tile("water", 2);
        let err = decode_layers(&tile[..tile.len() - 3]).unwrap_err();
        assert!(matches!(err, InspectError::InvalidMvt(_)));
    }

    #[test]
    fn decode_unnamed_layer() {
        let data = Tile {
            layers: vec![layer("", 1)],
        }
        .encode_to_vec();
        let err = decode_layers(&data).unwrap_err();
        assert!(matches!(err, InspectError::InvalidMvt(m) if m == "layer without a name"));
    }
}
