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

//! Builds polygons from the faces enclosed by a line network.
//!
//! All segments are noded at their intersections first. Dangling edges and
//! cut edges can't bound a face and are removed before the faces are traced
//! with the face on the left of each half-edge. Counter-clockwise rings are
//! faces; clockwise rings are the outer boundaries of connected components
//! and become holes of the smallest face enclosing them.

use std::collections::{HashMap, HashSet};

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, Contains, Coord, Line, LineString, MultiLineString, Point, Polygon};
use rstar::primitives::GeomWithData;
use rstar::{RTree, RTreeObject};

/// Nodes closer than 1e-9° are the same node.
const SNAP: f64 = 1e9;

type Key = (i64, i64);

fn key(c: Coord<f64>) -> Key {
    ((c.x * SNAP).round() as i64, (c.y * SNAP).round() as i64)
}

/// Splits all segments at their mutual intersections.
fn node(lines: &[MultiLineString<f64>]) -> Vec<Line<f64>> {
    let segments: Vec<Line<f64>> = lines
        .iter()
        .flat_map(|mls| mls.iter())
        .flat_map(|ls| ls.lines())
        .filter(|l| key(l.start) != key(l.end))
        .collect();

    let tree = RTree::bulk_load(
        segments
            .iter()
            .enumerate()
            .map(|(i, l)| GeomWithData::new(*l, i))
            .collect(),
    );

    let mut splits: Vec<Vec<Coord<f64>>> =
        segments.iter().map(|l| vec![l.start, l.end]).collect();

    for (i, segment) in segments.iter().enumerate() {
        for candidate in tree.locate_in_envelope_intersecting(&segment.envelope()) {
            let j = candidate.data;
            if j <= i {
                continue;
            }

            match line_intersection(*segment, segments[j]) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    splits[i].push(intersection);
                    splits[j].push(intersection);
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    for c in [intersection.start, intersection.end] {
                        splits[i].push(c);
                        splits[j].push(c);
                    }
                }
                None => {}
            }
        }
    }

    segments
        .iter()
        .zip(splits)
        .flat_map(|(segment, mut points)| {
            let d = segment.delta();
            let along =
                |c: &Coord<f64>| (c.x - segment.start.x) * d.x + (c.y - segment.start.y) * d.y;
            points.sort_by(|a, b| along(a).total_cmp(&along(b)));
            points.dedup_by_key(|c| key(*c));
            points
                .windows(2)
                .map(|w| Line::new(w[0], w[1]))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Planar graph with the neighbours of each node sorted counter-clockwise.
struct Graph {
    coords: Vec<Coord<f64>>,
    adjacency: Vec<Vec<usize>>,
}

impl Graph {
    fn new(segments: &[Line<f64>]) -> Self {
        let mut ids: HashMap<Key, usize> = HashMap::new();
        let mut coords = Vec::new();
        let mut adjacency: Vec<Vec<usize>> = Vec::new();
        let mut edges = HashSet::new();

        for segment in segments {
            let [a, b] = [segment.start, segment.end].map(|c| {
                *ids.entry(key(c)).or_insert_with(|| {
                    coords.push(c);
                    adjacency.push(Vec::new());
                    coords.len() - 1
                })
            });

            if a == b || !edges.insert((a.min(b), a.max(b))) {
                continue;
            }

            adjacency[a].push(b);
            adjacency[b].push(a);
        }

        let mut graph = Self { coords, adjacency };
        for node in 0..graph.adjacency.len() {
            let mut neighbours = std::mem::take(&mut graph.adjacency[node]);
            neighbours.sort_by(|&a, &b| graph.angle(node, a).total_cmp(&graph.angle(node, b)));
            graph.adjacency[node] = neighbours;
        }

        graph
    }

    fn angle(&self, from: usize, to: usize) -> f64 {
        let (a, b) = (self.coords[from], self.coords[to]);
        (b.y - a.y).atan2(b.x - a.x)
    }

    fn remove_edge(&mut self, a: usize, b: usize) {
        self.adjacency[a].retain(|&n| n != b);
        self.adjacency[b].retain(|&n| n != a);
    }

    fn remove_dangles(&mut self) {
        let mut stack: Vec<usize> = (0..self.adjacency.len())
            .filter(|&n| self.adjacency[n].len() == 1)
            .collect();

        while let Some(node) = stack.pop() {
            if let &[other] = self.adjacency[node].as_slice() {
                self.remove_edge(node, other);
                if self.adjacency[other].len() == 1 {
                    stack.push(other);
                }
            }
        }
    }

    /// Returns the half-edge following `from -> at` with the face on its left.
    fn next(&self, from: usize, at: usize) -> usize {
        let neighbours = &self.adjacency[at];
        let i = neighbours.iter().position(|&n| n == from).unwrap_or(0);
        neighbours[(i + neighbours.len() - 1) % neighbours.len()]
    }

    fn rings(&self) -> Vec<Vec<usize>> {
        let mut visited = HashSet::new();
        let mut rings = Vec::new();

        for start in 0..self.adjacency.len() {
            for &first in &self.adjacency[start] {
                if visited.contains(&(start, first)) {
                    continue;
                }

                let mut ring = Vec::new();
                let (mut from, mut to) = (start, first);
                loop {
                    visited.insert((from, to));
                    ring.push(from);
                    let next = self.next(from, to);
                    (from, to) = (to, next);
                    if (from, to) == (start, first) {
                        break;
                    }
                }

                rings.push(ring);
            }
        }

        rings
    }
}

/// Returns the edges whose two sides belong to the same ring.
fn cut_edges(rings: &[Vec<usize>]) -> Vec<(usize, usize)> {
    let mut ring_of = HashMap::new();
    for (i, ring) in rings.iter().enumerate() {
        for (k, &a) in ring.iter().enumerate() {
            ring_of.insert((a, ring[(k + 1) % ring.len()]), i);
        }
    }

    ring_of
        .iter()
        .filter(|&(&(a, b), &i)| a < b && ring_of.get(&(b, a)) == Some(&i))
        .map(|(&edge, _)| edge)
        .collect()
}

fn assemble(graph: &Graph, rings: Vec<Vec<usize>>) -> Vec<Polygon<f64>> {
    let mut shells: Vec<(Polygon<f64>, f64, Vec<LineString<f64>>)> = Vec::new();
    let mut holes = Vec::new();

    for ring in rings {
        let coords: Vec<Coord<f64>> = ring.iter().map(|&n| graph.coords[n]).collect();
        let polygon = Polygon::new(LineString::new(coords), vec![]);
        let area = polygon.signed_area();

        if area > 0.0 {
            shells.push((polygon, area, Vec::new()));
        } else if area < 0.0 {
            holes.push(polygon.exterior().clone());
        }
    }

    for hole in holes {
        let Some(&probe) = hole.0.first() else {
            continue;
        };
        let probe = Point::from(probe);

        let owner = shells
            .iter_mut()
            .filter(|(shell, _, _)| shell.contains(&probe))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((_, _, interiors)) = owner {
            interiors.push(hole);
        }
    }

    shells
        .into_iter()
        .map(|(shell, _, interiors)| Polygon::new(shell.exterior().clone(), interiors))
        .collect()
}

/// Returns the polygons enclosed by the lines.
pub(crate) fn polygonize(lines: &[MultiLineString<f64>]) -> Vec<Polygon<f64>> {
    let mut graph = Graph::new(&node(lines));

    loop {
        graph.remove_dangles();
        let rings = graph.rings();
        let cut = cut_edges(&rings);

        if cut.is_empty() {
            return assemble(&graph, rings);
        }

        for (a, b) in cut {
            graph.remove_edge(a, b);
        }
    }
}
