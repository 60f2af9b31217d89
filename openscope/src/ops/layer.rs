// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Joe Pearson
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use geo::{Area, BoundingRect, Geometry, MultiPolygon, Rect};
use geojson::GeoJson;

use crate::error::Error;

/// Attribute value of a [`Feature`].
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Real(r) if r.fract() == 0.0 => Some(*r as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Real(r) => serde_json::Number::from_f64(*r)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Text(s) => serde_json::Value::from(s.as_str()),
        }
    }

    fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Integer(b.into()),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n.as_f64().map_or(Self::Null, Self::Real),
            },
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A geometry with named attributes.
#[derive(Clone, PartialEq, Debug)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub attributes: BTreeMap<String, Value>,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: geometry.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Returns the feature with the attribute set to the value.
    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Returns the feature with the geometry replaced but all attributes kept.
    pub fn with_geometry(&self, geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: geometry.into(),
            attributes: self.attributes.clone(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Returns the planar area in square degrees.
    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }
}

/// Named collection of features.
///
/// Layers are values: operations never edit a layer in place but return a
/// new one, so a layer handed to the next stage can't change underneath it.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct VectorLayer {
    name: String,
    features: Vec<Feature>,
}

impl VectorLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            features: Vec::new(),
        }
    }

    pub fn with_features(name: impl Into<String>, features: Vec<Feature>) -> Self {
        Self {
            name: name.into(),
            features,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the layer with only the features matching the predicate.
    pub fn retain<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Feature) -> bool,
    {
        self.features.retain(f);
        self
    }

    /// Returns the layer without features smaller than `min_area`.
    pub fn without_smaller_than(self, min_area: f64) -> Self {
        self.retain(|feature| feature.area() >= min_area)
    }

    /// Returns the layer with the attribute added to every feature.
    pub fn with_attribute(self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        let features = self
            .features
            .into_iter()
            .map(|feature| feature.with_attribute(name, value.clone()))
            .collect();

        Self {
            name: self.name,
            features,
        }
    }

    /// Returns all polygons of the layer as one multi-polygon.
    ///
    /// The polygons are collected, not dissolved.
    pub fn polygons(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(
            self.features
                .iter()
                .filter_map(|feature| super::vector::as_multi_polygon(&feature.geometry))
                .flat_map(|mp| mp.0)
                .collect(),
        )
    }

    /// Returns the summed area of all features in square degrees.
    pub fn area(&self) -> f64 {
        self.features.iter().map(Feature::area).sum()
    }

    /// Returns the bounding rectangle of all features.
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.features
            .iter()
            .filter_map(|feature| feature.geometry.bounding_rect())
            .reduce(union_rect)
    }

    /// Reads a GeoJSON feature collection.
    pub fn read_geojson(path: &Path, name: impl Into<String>) -> Result<Self, Error> {
        let s = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let geojson: GeoJson = s.parse().map_err(|e: geojson::Error| Error::io(path, e))?;
        let collection =
            geojson::FeatureCollection::try_from(geojson).map_err(|e| Error::io(path, e))?;

        let features = collection
            .features
            .into_iter()
            .filter_map(|feature| {
                let properties = feature.properties.unwrap_or_default();
                let geometry = feature.geometry?;
                Some(Geometry::<f64>::try_from(geometry).map(|geometry| Feature {
                    geometry,
                    attributes: properties
                        .into_iter()
                        .map(|(k, v)| (k, Value::from_json(v)))
                        .collect(),
                }))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::io(path, e))?;

        Ok(Self::with_features(name, features))
    }

    /// Writes the layer as GeoJSON feature collection.
    pub fn write_geojson(&self, path: &Path) -> Result<(), Error> {
        let features = self
            .features
            .iter()
            .map(|feature| geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(
                    &feature.geometry,
                ))),
                id: None,
                properties: Some(
                    feature
                        .attributes
                        .iter()
                        .map(|(k, v)| (k.clone(), v.to_json()))
                        .collect(),
                ),
                foreign_members: None,
            })
            .collect();

        let collection = GeoJson::from(geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        });

        fs::write(path, collection.to_string()).map_err(|e| Error::io(path, e))
    }
}

pub(crate) fn union_rect(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        geo::Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        geo::Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

/// Handle of a raster dataset stored as GeoTIFF.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RasterLayer {
    name: String,
    path: PathBuf,
}

impl RasterLayer {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
