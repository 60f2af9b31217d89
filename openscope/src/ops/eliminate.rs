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

//! Merges small polygons into the neighbour they share the longest boundary
//! with.

use geo::{Area, BooleanOps, BoundingRect, Coord, Intersects, Line, MultiPolygon, Rect};
use log::trace;

use super::vector::as_multi_polygon;
use super::{Feature, VectorLayer};

/// Distance below which two boundaries are considered to touch.
const TOUCH_TOLERANCE: f64 = 1e-7;

fn distance_to_segment(p: Coord<f64>, segment: &Line<f64>) -> f64 {
    let d = segment.delta();
    let len2 = d.x * d.x + d.y * d.y;
    let t = if len2 > 0.0 {
        (((p.x - segment.start.x) * d.x + (p.y - segment.start.y) * d.y) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = segment.start + d * t;
    (p.x - closest.x).hypot(p.y - closest.y)
}

fn segments(mp: &MultiPolygon<f64>) -> impl Iterator<Item = Line<f64>> + '_ {
    mp.iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .flat_map(|ring| ring.lines())
}

/// Length of the boundary of `small` that runs along the boundary of `other`.
fn shared_boundary(small: &MultiPolygon<f64>, other: &MultiPolygon<f64>) -> f64 {
    let other_segments: Vec<Line<f64>> = segments(other).collect();

    segments(small)
        .filter(|segment| {
            let midpoint = segment.start + segment.delta() * 0.5;
            other_segments
                .iter()
                .any(|o| distance_to_segment(midpoint, o) < TOUCH_TOLERANCE)
        })
        .map(|segment| segment.dx().hypot(segment.dy()))
        .sum()
}

fn expand(rect: Rect<f64>, by: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: rect.min().x - by,
            y: rect.min().y - by,
        },
        Coord {
            x: rect.max().x + by,
            y: rect.max().y + by,
        },
    )
}

fn best_neighbour(
    polygon: &MultiPolygon<f64>,
    polygons: &[Option<MultiPolygon<f64>>],
    small: &[bool],
) -> Option<usize> {
    let rect = expand(polygon.bounding_rect()?, TOUCH_TOLERANCE);

    polygons
        .iter()
        .enumerate()
        .filter(|(j, _)| !small[*j])
        .filter_map(|(j, other)| other.as_ref().map(|o| (j, o)))
        .filter(|(_, other)| other.bounding_rect().is_some_and(|r| r.intersects(&rect)))
        .map(|(j, other)| (j, shared_boundary(polygon, other)))
        .filter(|(_, shared)| *shared > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(j, _)| j)
}

/// Merges every polygon smaller than `min_area` into its neighbour with the
/// longest shared boundary. Small polygons without a neighbour are kept.
pub(crate) fn eliminate(input: &VectorLayer, min_area: f64) -> Vec<Feature> {
    let features = input.features();
    let mut polygons: Vec<Option<MultiPolygon<f64>>> = features
        .iter()
        .map(|f| as_multi_polygon(&f.geometry))
        .collect();
    let small: Vec<bool> = polygons
        .iter()
        .map(|p| p.as_ref().is_some_and(|p| p.unsigned_area() < min_area))
        .collect();

    let mut pending: Vec<usize> = (0..features.len()).filter(|&i| small[i]).collect();
    let mut eliminated = vec![false; features.len()];
    let mut grown = vec![false; features.len()];

    // a merge can make a target adjacent to a small polygon it didn't touch
    // before, so repeat until nothing changes
    loop {
        let before = pending.len();

        pending.retain(|&i| {
            let Some(polygon) = polygons[i].clone() else {
                return false;
            };

            match best_neighbour(&polygon, &polygons, &small) {
                Some(j) => {
                    trace!("merging polygon {i} into {j}");
                    polygons[j] = polygons[j].as_ref().map(|target| target.union(&polygon));
                    eliminated[i] = true;
                    grown[j] = true;
                    false
                }
                None => true,
            }
        });

        if pending.is_empty() || pending.len() == before {
            break;
        }
    }

    features
        .iter()
        .zip(polygons)
        .enumerate()
        .filter(|(i, _)| !eliminated[*i])
        .map(|(i, (feature, polygon))| match polygon {
            Some(polygon) if grown[i] => feature.with_geometry(polygon),
            _ => feature.clone(),
        })
        .collect()
}
