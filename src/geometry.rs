//! Geometry values as returned by `PostGIS` in text mode: hex encoded (E)WKB.
//!
//! Values are shown either as a short summary of type and size, or as WKT.

use std::fmt::{Display, Formatter};

use bytes::Buf;
use geozero::ToWkt as _;
use geozero::wkb::Ewkb;

use crate::format::format_thousands;
use crate::{InspectError, InspectResult};

const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;

/// Decodes a hex value as returned by `PostgreSQL` for `geometry` and `bytea` columns.
pub fn decode_hex(text: &str) -> InspectResult<Vec<u8>> {
    let text = text.strip_prefix("\\x").unwrap_or(text);
    Ok(hex::decode(text)?)
}

/// Base geometry type of a WKB value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    /// WKB type 1
    Point,
    /// WKB type 2
    LineString,
    /// WKB type 3
    Polygon,
    /// WKB type 4
    MultiPoint,
    /// WKB type 5
    MultiLineString,
    /// WKB type 6
    MultiPolygon,
    /// WKB type 7
    GeometryCollection,
    /// Any other type code, e.g. curves
    Other(u32),
}

impl From<u32> for GeometryKind {
    fn from(code: u32) -> Self {
        match code {
            1 => GeometryKind::Point,
            2 => GeometryKind::LineString,
            3 => GeometryKind::Polygon,
            4 => GeometryKind::MultiPoint,
            5 => GeometryKind::MultiLineString,
            6 => GeometryKind::MultiPolygon,
            7 => GeometryKind::GeometryCollection,
            v => GeometryKind::Other(v),
        }
    }
}

impl Display for GeometryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryKind::Point => f.write_str("Point"),
            GeometryKind::LineString => f.write_str("LineString"),
            GeometryKind::Polygon => f.write_str("Polygon"),
            GeometryKind::MultiPoint => f.write_str("MultiPoint"),
            GeometryKind::MultiLineString => f.write_str("MultiLineString"),
            GeometryKind::MultiPolygon => f.write_str("MultiPolygon"),
            GeometryKind::GeometryCollection => f.write_str("GeometryCollection"),
            GeometryKind::Other(v) => write!(f, "Geometry#{v}"),
        }
    }
}

/// Type and size of a geometry, shown instead of its full text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometrySummary {
    /// Base type
    pub kind: GeometryKind,
    /// Size of the binary representation in bytes
    pub size: usize,
    /// Spatial reference id, if embedded
    pub srid: Option<i32>,
    /// Has a Z dimension
    pub has_z: bool,
    /// Has an M dimension
    pub has_m: bool,
}

impl GeometrySummary {
    /// Reads the header of a WKB or `PostGIS` EWKB value.
    pub fn try_from_ewkb(data: &[u8]) -> InspectResult<Self> {
        let size = data.len();
        let mut buf = data;
        if buf.remaining() < 5 {
            return Err(InspectError::InvalidGeometry("value is too short"));
        }
        let little_endian = match buf.get_u8() {
            0 => false,
            1 => true,
            _ => return Err(InspectError::InvalidGeometry("unknown byte order")),
        };
        let code = if little_endian {
            buf.get_u32_le()
        } else {
            buf.get_u32()
        };

        let srid = if code & EWKB_SRID == 0 {
            None
        } else if buf.remaining() < 4 {
            return Err(InspectError::InvalidGeometry("missing SRID"));
        } else if little_endian {
            Some(buf.get_i32_le())
        } else {
            Some(buf.get_i32())
        };

        // ISO WKB encodes dimensions as thousands: 1001 is Point Z, 3001 is Point ZM
        let base = code & 0x0FFF_FFFF;
        let iso_dims = base / 1000;

        Ok(Self {
            kind: GeometryKind::from(base % 1000),
            size,
            srid,
            has_z: code & EWKB_Z != 0 || iso_dims == 1 || iso_dims == 3,
            has_m: code & EWKB_M != 0 || iso_dims == 2 || iso_dims == 3,
        })
    }
}

impl Display for GeometrySummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        match (self.has_z, self.has_m) {
            (true, true) => f.write_str(" ZM")?,
            (true, false) => f.write_str(" Z")?,
            (false, true) => f.write_str(" M")?,
            (false, false) => {}
        }
        write!(f, " ({} bytes)", format_thousands(self.size as u64))
    }
}

/// Converts a WKB or EWKB value to WKT.
pub fn ewkb_to_wkt(data: &[u8]) -> InspectResult<String> {
    Ok(Ewkb(data).to_wkt()?)
}
