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

//! Feature-wise vector operations of the [`GeoBackend`](super::GeoBackend).

use geo::{
    BooleanOps, Buffer, Geometry, Intersects, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Polygon, Simplify,
};

use super::{Feature, VectorLayer};

/// Returns the polygonal part of the geometry.
pub(crate) fn as_multi_polygon(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
        Geometry::GeometryCollection(gc) => {
            let polygons: Vec<Polygon<f64>> = gc
                .iter()
                .filter_map(as_multi_polygon)
                .flat_map(|mp| mp.0)
                .collect();
            (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
        }
        _ => None,
    }
}

/// Returns the linear part of the geometry.
pub(crate) fn as_multi_line_string(geometry: &Geometry<f64>) -> Option<MultiLineString<f64>> {
    match geometry {
        Geometry::Line(l) => Some(MultiLineString::new(vec![LineString::from(*l)])),
        Geometry::LineString(ls) => Some(MultiLineString::new(vec![ls.clone()])),
        Geometry::MultiLineString(mls) => Some(mls.clone()),
        Geometry::GeometryCollection(gc) => {
            let lines: Vec<LineString<f64>> = gc
                .iter()
                .filter_map(as_multi_line_string)
                .flat_map(|mls| mls.0)
                .collect();
            (!lines.is_empty()).then(|| MultiLineString::new(lines))
        }
        _ => None,
    }
}

/// Dissolves all polygons of the layer into one multi-polygon.
pub(crate) fn dissolve(layer: &VectorLayer) -> MultiPolygon<f64> {
    layer
        .features()
        .iter()
        .filter_map(|feature| as_multi_polygon(&feature.geometry))
        .fold(MultiPolygon::new(Vec::new()), |acc, mp| acc.union(&mp))
}

pub(crate) fn polygons_to_lines(input: &VectorLayer) -> Vec<Feature> {
    input
        .features()
        .iter()
        .filter_map(|feature| {
            let mp = as_multi_polygon(&feature.geometry)?;
            let rings: Vec<LineString<f64>> = mp
                .iter()
                .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
                .cloned()
                .collect();
            Some(feature.with_geometry(MultiLineString::new(rings)))
        })
        .collect()
}

pub(crate) fn buffer(input: &VectorLayer, distance: f64) -> Vec<Feature> {
    input
        .features()
        .iter()
        .map(|feature| feature.with_geometry(feature.geometry.buffer(distance)))
        .filter(|feature| feature.area() > 0.0)
        .collect()
}

fn simplify_geometry(geometry: &Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    match geometry {
        Geometry::LineString(ls) => ls.simplify(tolerance).into(),
        Geometry::MultiLineString(mls) => mls.simplify(tolerance).into(),
        Geometry::Polygon(p) => p.simplify(tolerance).into(),
        Geometry::MultiPolygon(mp) => mp.simplify(tolerance).into(),
        other => other.clone(),
    }
}

pub(crate) fn simplify(input: &VectorLayer, tolerance: f64) -> Vec<Feature> {
    input
        .features()
        .iter()
        .map(|feature| feature.with_geometry(simplify_geometry(&feature.geometry, tolerance)))
        .collect()
}

/// Concatenates the layers, recording the source layer in a `layer` attribute.
pub(crate) fn merge(layers: &[&VectorLayer]) -> Vec<Feature> {
    layers
        .iter()
        .flat_map(|layer| {
            layer
                .features()
                .iter()
                .map(|feature| feature.clone().with_attribute("layer", layer.name()))
        })
        .collect()
}

fn clip_geometry(geometry: &Geometry<f64>, mask: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    if let Some(mp) = as_multi_polygon(geometry) {
        let clipped = mp.intersection(mask);
        return (!clipped.0.is_empty()).then(|| clipped.into());
    }

    if let Some(mls) = as_multi_line_string(geometry) {
        let clipped = mask.clip(&mls, false);
        return (!clipped.0.is_empty()).then(|| clipped.into());
    }

    match geometry {
        Geometry::Point(p) => mask.intersects(p).then(|| geometry.clone()),
        Geometry::MultiPoint(mp) => {
            let points: Vec<_> = mp.iter().filter(|p| mask.intersects(*p)).copied().collect();
            (!points.is_empty()).then(|| MultiPoint::new(points).into())
        }
        _ => None,
    }
}

pub(crate) fn clip(input: &VectorLayer, overlay: &VectorLayer) -> Vec<Feature> {
    let mask = dissolve(overlay);

    input
        .features()
        .iter()
        .filter_map(|feature| {
            clip_geometry(&feature.geometry, &mask).map(|g| feature.with_geometry(g))
        })
        .collect()
}

fn difference_geometry(
    geometry: &Geometry<f64>,
    mask: &MultiPolygon<f64>,
) -> Option<Geometry<f64>> {
    if let Some(mp) = as_multi_polygon(geometry) {
        let remaining = mp.difference(mask);
        return (!remaining.0.is_empty()).then(|| remaining.into());
    }

    if let Some(mls) = as_multi_line_string(geometry) {
        let remaining = mask.clip(&mls, true);
        return (!remaining.0.is_empty()).then(|| remaining.into());
    }

    None
}

pub(crate) fn difference(input: &VectorLayer, overlay: &VectorLayer) -> Vec<Feature> {
    let mask = dissolve(overlay);

    input
        .features()
        .iter()
        .filter_map(|feature| {
            if mask.0.is_empty() {
                return Some(feature.clone());
            }
            difference_geometry(&feature.geometry, &mask).map(|g| feature.with_geometry(g))
        })
        .collect()
}

fn parts(geometry: &Geometry<f64>) -> Vec<Geometry<f64>> {
    match geometry {
        Geometry::MultiPolygon(mp) => mp.iter().cloned().map(Geometry::from).collect(),
        Geometry::MultiLineString(mls) => mls.iter().cloned().map(Geometry::from).collect(),
        Geometry::MultiPoint(mp) => mp.iter().copied().map(Geometry::from).collect(),
        Geometry::GeometryCollection(gc) => gc.iter().flat_map(parts).collect(),
        other => vec![other.clone()],
    }
}

pub(crate) fn multipart_to_singlepart(input: &VectorLayer) -> Vec<Feature> {
    input
        .features()
        .iter()
        .flat_map(|feature| {
            parts(&feature.geometry)
                .into_iter()
                .map(|part| feature.with_geometry(part))
        })
        .collect()
}
