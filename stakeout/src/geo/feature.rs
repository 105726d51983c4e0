//! GeoJSON-like target features.
//!
//! Features arrive as loosely typed `{geometry: {type, coordinates}, properties}`
//! objects. Classification happens in two steps: the geometry `type` decides
//! whether stakeout supports the feature at all, then the coordinates are
//! decoded into a typed [`Geometry`].
//!
//! Coordinates that do not match the nesting expected for a supported type
//! decode to [`Geometry::Degenerate`] instead of failing. Such a target can
//! still be activated; it simply never yields a nearest point. Multi-part
//! geometries skip malformed parts and are only degenerate when no part
//! decodes.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::LngLat;

/// Geometry kinds stakeout can navigate toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
}

impl GeometryType {
    /// All supported geometry types.
    pub const ALL: [GeometryType; 6] = [
        GeometryType::Point,
        GeometryType::MultiPoint,
        GeometryType::LineString,
        GeometryType::MultiLineString,
        GeometryType::Polygon,
        GeometryType::MultiPolygon,
    ];

    /// Parse a GeoJSON geometry type name. Returns `None` for unsupported kinds.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// GeoJSON name of this geometry type.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryType::Point => "Point",
            GeometryType::MultiPoint => "MultiPoint",
            GeometryType::LineString => "LineString",
            GeometryType::MultiLineString => "MultiLineString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPolygon => "MultiPolygon",
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised while classifying a feature.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The feature carries no geometry.
    #[error("feature has no geometry")]
    Missing,

    /// The geometry type is not one stakeout can navigate toward.
    #[error("unsupported geometry type: {0}")]
    Unsupported(String),

    /// The input was not valid JSON or not a feature object.
    #[error("invalid feature JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Untyped geometry as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGeometry {
    /// GeoJSON geometry type name.
    #[serde(rename = "type")]
    pub kind: String,

    /// Nested coordinate arrays; shape depends on `kind`.
    #[serde(default)]
    pub coordinates: Value,
}

impl RawGeometry {
    /// Create a raw geometry from a type name and coordinate value.
    pub fn new(kind: impl Into<String>, coordinates: Value) -> Self {
        Self {
            kind: kind.into(),
            coordinates,
        }
    }
}

/// Typed geometry decoded from a supported [`RawGeometry`].
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(LngLat),
    MultiPoint(Vec<LngLat>),
    LineString(Vec<LngLat>),
    MultiLineString(Vec<Vec<LngLat>>),
    /// Rings; the first is the outer ring.
    Polygon(Vec<Vec<LngLat>>),
    MultiPolygon(Vec<Vec<Vec<LngLat>>>),
    /// Supported type whose coordinates could not be decoded.
    Degenerate(GeometryType),
}

impl Geometry {
    /// The geometry type this value represents.
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::MultiLineString(_) => GeometryType::MultiLineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
            Geometry::Degenerate(kind) => *kind,
        }
    }

    /// Decode coordinates for a known geometry type.
    pub fn decode(kind: GeometryType, coordinates: &Value) -> Self {
        let decoded = match kind {
            GeometryType::Point => position(coordinates).map(Geometry::Point),
            GeometryType::MultiPoint => {
                parts(kind, coordinates, position).map(Geometry::MultiPoint)
            }
            GeometryType::LineString => positions(coordinates).map(Geometry::LineString),
            GeometryType::MultiLineString => {
                parts(kind, coordinates, positions).map(Geometry::MultiLineString)
            }
            GeometryType::Polygon => rings(coordinates).map(Geometry::Polygon),
            GeometryType::MultiPolygon => {
                parts(kind, coordinates, rings).map(Geometry::MultiPolygon)
            }
        };

        decoded.unwrap_or_else(|| {
            tracing::debug!(geometry_type = %kind, "coordinates do not decode, treating as degenerate");
            Geometry::Degenerate(kind)
        })
    }

    /// Encode back into a wire geometry.
    pub fn to_raw(&self) -> RawGeometry {
        let coordinates = match self {
            Geometry::Point(p) => serde_json::to_value(p),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => serde_json::to_value(ps),
            Geometry::MultiLineString(rs) | Geometry::Polygon(rs) => serde_json::to_value(rs),
            Geometry::MultiPolygon(polys) => serde_json::to_value(polys),
            Geometry::Degenerate(_) => Ok(Value::Null),
        }
        // Plain float arrays always serialize
        .unwrap_or(Value::Null);

        RawGeometry::new(self.geometry_type().as_str(), coordinates)
    }
}

/// A target feature: geometry plus free-form properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Wire geometry; may be absent on malformed input.
    #[serde(default)]
    pub geometry: Option<RawGeometry>,

    /// Feature properties, passed through untouched.
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl Feature {
    /// Create a feature from a typed geometry with no properties.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry.to_raw()),
            properties: None,
        }
    }

    /// Create a feature from a raw geometry.
    pub fn from_raw(geometry: RawGeometry) -> Self {
        Self {
            geometry: Some(geometry),
            properties: None,
        }
    }

    /// Attach a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Parse a feature from JSON.
    ///
    /// Accepts a `Feature` object, or a bare geometry object which is
    /// wrapped into a feature without properties.
    pub fn from_json(json: &str) -> Result<Self, GeometryError> {
        let value: Value = serde_json::from_str(json)?;

        let is_bare_geometry = value.get("geometry").is_none()
            && value
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|t| t != "Feature");

        if is_bare_geometry {
            let raw: RawGeometry = serde_json::from_value(value)?;
            return Ok(Self::from_raw(raw));
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Name of the wire geometry type, if any.
    pub fn geometry_type_name(&self) -> Option<&str> {
        self.geometry.as_ref().map(|g| g.kind.as_str())
    }

    /// Classify and decode the geometry.
    pub fn geometry(&self) -> Result<Geometry, GeometryError> {
        let raw = self.geometry.as_ref().ok_or(GeometryError::Missing)?;
        let kind = GeometryType::parse(&raw.kind)
            .ok_or_else(|| GeometryError::Unsupported(raw.kind.clone()))?;
        Ok(Geometry::decode(kind, &raw.coordinates))
    }

    /// Look up a string property, e.g. a display name.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.as_ref()?.get(key)?.as_str()
    }
}

// Positions may carry altitude as a third element; only lng/lat are kept.
fn position(value: &Value) -> Option<LngLat> {
    let arr = value.as_array()?;
    if arr.len() < 2 {
        return None;
    }
    Some(LngLat::new(arr[0].as_f64()?, arr[1].as_f64()?))
}

fn positions(value: &Value) -> Option<Vec<LngLat>> {
    value.as_array()?.iter().map(position).collect()
}

fn rings(value: &Value) -> Option<Vec<Vec<LngLat>>> {
    value.as_array()?.iter().map(positions).collect()
}

// Keeps the parts that decode. None when parts exist but all are malformed.
fn parts<T>(
    kind: GeometryType,
    value: &Value,
    decode: fn(&Value) -> Option<T>,
) -> Option<Vec<T>> {
    let raw = value.as_array()?;
    let decoded: Vec<T> = raw.iter().filter_map(decode).collect();

    if decoded.len() < raw.len() {
        if decoded.is_empty() {
            return None;
        }
        tracing::debug!(
            geometry_type = %kind,
            skipped = raw.len() - decoded.len(),
            kept = decoded.len(),
            "skipping malformed parts"
        );
    }
    Some(decoded)
}
