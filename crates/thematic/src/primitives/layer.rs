//! Feature and layer representation exchanged with the rendering side.
//!
//! ## Purpose
//!
//! This module defines a minimal feature collection: longitude/latitude
//! geometries (`geo` types) with a flat JSON property map. The engines read
//! only the named numeric properties they were asked for; output layers
//! (isobands, discontinuity lines) use the same representation.
//!
//! ## Key concepts
//!
//! * **Numeric property**: a JSON number, or a string parsing to a number.
//!   Anything else (null, bool, text, missing) reads as `None`.
//! * **Feature id**: optional; engines that need stable ids fall back to the
//!   feature index.

// External dependencies
use core::fmt::{Display, Formatter, Result};
use geo::{BoundingRect, Geometry, Rect};
use serde_json::{Map, Value};

// ============================================================================
// Feature Id
// ============================================================================

/// Identifier of a feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureId {
    /// Integer identifier.
    Number(u64),

    /// Text identifier.
    String(String),
}

impl FeatureId {
    /// JSON representation of the identifier.
    pub fn to_json(&self) -> Value {
        match self {
            FeatureId::Number(n) => Value::from(*n),
            FeatureId::String(s) => Value::from(s.as_str()),
        }
    }
}

impl Display for FeatureId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            FeatureId::Number(n) => write!(f, "{n}"),
            FeatureId::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for FeatureId {
    fn from(value: u64) -> Self {
        FeatureId::Number(value)
    }
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> Self {
        FeatureId::String(value.to_string())
    }
}

impl From<String> for FeatureId {
    fn from(value: String) -> Self {
        FeatureId::String(value)
    }
}

// ============================================================================
// Feature
// ============================================================================

/// A geometry with an optional id and a flat property map.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Optional identifier.
    pub id: Option<FeatureId>,

    /// Geometry in longitude/latitude.
    pub geometry: Geometry<f64>,

    /// Flat property map.
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Create a feature without id nor properties.
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            id: None,
            geometry: geometry.into(),
            properties: Map::new(),
        }
    }

    /// Set the identifier.
    pub fn with_id(mut self, id: impl Into<FeatureId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set a property.
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Read a numeric property.
    pub fn numeric_property(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(numeric_value)
    }
}

/// Interpret a JSON value as a number.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

// ============================================================================
// Feature Collection
// ============================================================================

/// An ordered collection of features.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    /// Features, in layer order.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Wrap a vector of features.
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection holds no feature.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Values of a property, one entry per feature.
    pub fn numeric_series(&self, key: &str) -> Vec<Option<f64>> {
        self.features
            .iter()
            .map(|f| f.numeric_property(key))
            .collect()
    }

    /// Bounding box of every geometry in the collection.
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                    (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
                )
            })
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
