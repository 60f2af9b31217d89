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

//! Elevation grids and the raster operations of the
//! [`GeoBackend`](super::GeoBackend).
//!
//! Grids are north-up GeoTIFFs in WGS 84 with a single band. Missing data is
//! held as `NaN` regardless of the nodata value of the source file.

use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::ops::Range;
use std::path::Path;

use geo::{BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Rect};
use log::trace;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tiff::TiffError;

use super::layer::union_rect;
use crate::error::Error;

/// GeoKey directory of a geographic WGS 84 raster (EPSG:4326) whose pixels
/// are areas.
const WGS84_GEO_KEYS: [u16; 16] = [
    1, 1, 0, 3, // header with 3 keys
    1024, 0, 1, 2, // GTModelTypeGeoKey: geographic
    1025, 0, 1, 1, // GTRasterTypeGeoKey: pixel is area
    2048, 0, 1, 4326, // GeographicTypeGeoKey: WGS 84
];

const RASTER_TYPE_GEO_KEY: u16 = 1025;
const RASTER_PIXEL_IS_POINT: u16 = 2;

/// Returns the value of a GeoKey stored inline in the key directory.
fn geo_key(directory: &[u16], key: u16) -> Option<u16> {
    let count = usize::from(*directory.get(3)?);
    directory
        .get(4..)?
        .chunks_exact(4)
        .take(count)
        .find(|entry| entry[0] == key && entry[1] == 0)
        .map(|entry| entry[3])
}

/// A single band elevation grid.
#[derive(Clone, PartialEq, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    /// North-west corner of the raster.
    origin: Coord<f64>,
    /// Cell width and height in degrees, both positive.
    cell_size: (f64, f64),
    /// Row-major values from north to south.
    values: Vec<f64>,
}

impl Grid {
    pub fn new(
        width: usize,
        height: usize,
        origin: Coord<f64>,
        cell_size: (f64, f64),
        values: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(values.len(), width * height);
        Self {
            width,
            height,
            origin,
            cell_size,
            values,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn origin(&self) -> Coord<f64> {
        self.origin
    }

    pub fn cell_size(&self) -> (f64, f64) {
        self.cell_size
    }

    /// Returns the value of a cell or `None` if it's outside or has no data.
    pub fn value(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }

        self.values
            .get(row * self.width + col)
            .copied()
            .filter(|v| !v.is_nan())
    }

    pub fn cell_center(&self, col: usize, row: usize) -> Coord<f64> {
        Coord {
            x: self.origin.x + (col as f64 + 0.5) * self.cell_size.0,
            y: self.origin.y - (row as f64 + 0.5) * self.cell_size.1,
        }
    }

    pub fn bounds(&self) -> Rect<f64> {
        Rect::new(
            self.origin,
            Coord {
                x: self.origin.x + self.width as f64 * self.cell_size.0,
                y: self.origin.y - self.height as f64 * self.cell_size.1,
            },
        )
    }

    /// Returns the value of the cell covering the coordinate.
    pub fn sample(&self, c: Coord<f64>) -> Option<f64> {
        let col = ((c.x - self.origin.x) / self.cell_size.0).floor();
        let row = ((self.origin.y - c.y) / self.cell_size.1).floor();

        if col < 0.0 || row < 0.0 {
            return None;
        }

        self.value(col as usize, row as usize)
    }

    /// Returns the columns and rows of the cells touching the rectangle.
    fn window(&self, rect: &Rect<f64>) -> (Range<usize>, Range<usize>) {
        let (sx, sy) = self.cell_size;
        let clamp = |v: f64, max: usize| (v.max(0.0) as usize).min(max);

        let cols = clamp(((rect.min().x - self.origin.x) / sx).floor(), self.width)
            ..clamp(((rect.max().x - self.origin.x) / sx).ceil(), self.width);
        let rows = clamp(((self.origin.y - rect.max().y) / sy).floor(), self.height)
            ..clamp(((self.origin.y - rect.min().y) / sy).ceil(), self.height);

        (cols, rows)
    }

    fn cells(&self, rect: &Rect<f64>) -> impl Iterator<Item = (usize, usize)> {
        let (cols, rows) = self.window(rect);
        rows.flat_map(move |row| cols.clone().map(move |col| (col, row)))
    }

    /// Reads the first band of a GeoTIFF.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let err = |e: TiffError| Error::io(path, e);

        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut decoder = Decoder::new(BufReader::new(file)).map_err(err)?;

        let (width, height) = decoder.dimensions().map_err(err)?;
        let scale = decoder
            .get_tag_f64_vec(Tag::ModelPixelScaleTag)
            .map_err(err)?;
        let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).map_err(err)?;
        let nodata = decoder
            .get_tag_ascii_string(Tag::GdalNodata)
            .ok()
            .and_then(|s| {
                s.trim_matches(|c: char| c.is_whitespace() || c == '\0')
                    .parse::<f64>()
                    .ok()
            });

        if scale.len() < 2 || tiepoint.len() < 6 {
            return Err(Error::io(path, "incomplete georeferencing"));
        }

        let values: Vec<f64> = match decoder.read_image().map_err(err)? {
            DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::F64(v) => v,
            _ => return Err(Error::io(path, "unsupported sample format")),
        };

        let (width, height) = (width as usize, height as usize);
        if values.len() != width * height {
            return Err(Error::io(path, "expected a single band"));
        }

        let values = values
            .into_iter()
            .map(|v| match nodata {
                Some(nodata) if v == nodata => f64::NAN,
                _ => v,
            })
            .collect();

        let (sx, sy) = (scale[0], scale[1]);
        let mut origin = Coord {
            x: tiepoint[3] - tiepoint[0] * sx,
            y: tiepoint[4] + tiepoint[1] * sy,
        };

        // the tiepoint of a point raster is the center of its first cell
        let raster_type = decoder
            .get_tag_u16_vec(Tag::GeoKeyDirectoryTag)
            .ok()
            .and_then(|keys| geo_key(&keys, RASTER_TYPE_GEO_KEY));
        if raster_type == Some(RASTER_PIXEL_IS_POINT) {
            origin.x -= sx / 2.0;
            origin.y += sy / 2.0;
        }

        trace!("read {width}x{height} grid from {}", path.display());
        Ok(Self::new(width, height, origin, (sx, sy), values))
    }

    /// Writes the grid as 32-bit float GeoTIFF with `nan` as nodata value.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        self.write_with_keys(path, &WGS84_GEO_KEYS)
    }

    fn write_with_keys(&self, path: &Path, geo_keys: &[u16]) -> Result<(), Error> {
        let err = |e: TiffError| Error::io(path, e);

        let width = u32::try_from(self.width).map_err(|e| Error::io(path, e))?;
        let height = u32::try_from(self.height).map_err(|e| Error::io(path, e))?;

        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut encoder = TiffEncoder::new(BufWriter::new(file)).map_err(err)?;
        let mut image = encoder
            .new_image::<colortype::Gray32Float>(width, height)
            .map_err(err)?;

        let (sx, sy) = self.cell_size;
        let directory = image.encoder();
        directory
            .write_tag(Tag::ModelPixelScaleTag, &[sx, sy, 0.0][..])
            .map_err(err)?;
        directory
            .write_tag(
                Tag::ModelTiepointTag,
                &[0.0, 0.0, 0.0, self.origin.x, self.origin.y, 0.0][..],
            )
            .map_err(err)?;
        directory
            .write_tag(Tag::GeoKeyDirectoryTag, geo_keys)
            .map_err(err)?;
        directory.write_tag(Tag::GdalNodata, "nan").map_err(err)?;

        let samples: Vec<f32> = self.values.iter().map(|&v| v as f32).collect();
        image.write_data(&samples).map_err(err)
    }
}

/// Mosaics the grids at the resolution of the first one. Where grids
/// overlap the first grid with data wins.
pub(crate) fn merge(grids: &[Grid]) -> Option<Grid> {
    let first = grids.first()?;
    let bounds = grids.iter().map(Grid::bounds).reduce(union_rect)?;
    let (sx, sy) = first.cell_size;

    let width = (bounds.width() / sx).round() as usize;
    let height = (bounds.height() / sy).round() as usize;
    let origin = Coord {
        x: bounds.min().x,
        y: bounds.max().y,
    };

    let mut merged = Grid::new(width, height, origin, (sx, sy), vec![f64::NAN; width * height]);
    for row in 0..height {
        for col in 0..width {
            let center = merged.cell_center(col, row);
            if let Some(v) = grids.iter().find_map(|g| g.sample(center)) {
                merged.values[row * width + col] = v;
            }
        }
    }

    Some(merged)
}

/// Crops the grid to the mask's bounding box and removes the data of all
/// cells whose center is outside the mask.
pub(crate) fn clip_by_mask(grid: &Grid, mask: &MultiPolygon<f64>) -> Option<Grid> {
    let rect = mask.bounding_rect()?;
    let (cols, rows) = grid.window(&rect);
    if cols.is_empty() || rows.is_empty() {
        return None;
    }

    let (sx, sy) = grid.cell_size;
    let origin = Coord {
        x: grid.origin.x + cols.start as f64 * sx,
        y: grid.origin.y - rows.start as f64 * sy,
    };

    let values = grid
        .cells(&rect)
        .map(|(col, row)| {
            if mask.contains(&Point::from(grid.cell_center(col, row))) {
                grid.value(col, row).unwrap_or(f64::NAN)
            } else {
                f64::NAN
            }
        })
        .collect();

    Some(Grid::new(cols.len(), rows.len(), origin, grid.cell_size, values))
}

/// Mean of all cells whose center is inside the polygon.
pub(crate) fn zonal_mean(grid: &Grid, polygon: &MultiPolygon<f64>) -> Option<f64> {
    let rect = polygon.bounding_rect()?;
    let (sum, count) = grid
        .cells(&rect)
        .filter(|&(col, row)| polygon.contains(&Point::from(grid.cell_center(col, row))))
        .filter_map(|(col, row)| grid.value(col, row))
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    (count > 0).then(|| sum / count as f64)
}

/// Multiples of the interval within the value range of the grid.
pub(crate) fn contour_levels(grid: &Grid, interval: f64) -> Vec<f64> {
    let (min, max) = grid
        .values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
            (min.min(v), max.max(v))
        });

    if min > max {
        return Vec::new();
    }

    let first = (min / interval).ceil() as i64;
    let last = (max / interval).floor() as i64;
    (first..=last).map(|k| k as f64 * interval).collect()
}

/// Traces the contour lines of every level. The progress in percent is
/// reported after each level.
pub(crate) fn contours(
    grid: &Grid,
    interval: f64,
    mut progress: impl FnMut(f64),
) -> Vec<(f64, LineString<f64>)> {
    let levels = contour_levels(grid, interval);
    let mut lines = Vec::new();

    for (i, &level) in levels.iter().enumerate() {
        lines.extend(isolines(grid, level).into_iter().map(|line| (level, line)));
        progress(100.0 * (i + 1) as f64 / levels.len() as f64);
    }

    lines
}

/// Edge between two cell centers. Horizontal edges run east and vertical
/// edges south of the cell.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum Edge {
    Horizontal(usize, usize),
    Vertical(usize, usize),
}

fn edge_point(grid: &Grid, edge: Edge, level: f64) -> Option<Coord<f64>> {
    let ((c0, r0), (c1, r1)) = match edge {
        Edge::Horizontal(col, row) => ((col, row), (col + 1, row)),
        Edge::Vertical(col, row) => ((col, row), (col, row + 1)),
    };

    let (a, b) = (grid.value(c0, r0)?, grid.value(c1, r1)?);
    let t = if a != b {
        ((level - a) / (b - a)).clamp(0.0, 1.0)
    } else {
        0.5
    };

    let (p, q) = (grid.cell_center(c0, r0), grid.cell_center(c1, r1));
    Some(p + (q - p) * t)
}

/// Marching squares over the cell centers. Cells with a corner without data
/// are skipped.
fn isolines(grid: &Grid, level: f64) -> Vec<LineString<f64>> {
    if grid.width < 2 || grid.height < 2 {
        return Vec::new();
    }

    let mut segments: Vec<(Edge, Edge)> = Vec::new();

    for row in 0..grid.height - 1 {
        for col in 0..grid.width - 1 {
            let (Some(tl), Some(tr), Some(br), Some(bl)) = (
                grid.value(col, row),
                grid.value(col + 1, row),
                grid.value(col + 1, row + 1),
                grid.value(col, row + 1),
            ) else {
                continue;
            };

            let case = ((tl >= level) as u8) << 3
                | ((tr >= level) as u8) << 2
                | ((br >= level) as u8) << 1
                | (bl >= level) as u8;

            let top = Edge::Horizontal(col, row);
            let bottom = Edge::Horizontal(col, row + 1);
            let left = Edge::Vertical(col, row);
            let right = Edge::Vertical(col + 1, row);

            // saddles are resolved by the average of the corners
            let center_above = (tl + tr + br + bl) / 4.0 >= level;

            let mut add = |a: Edge, b: Edge| segments.push((a, b));
            match case {
                1 | 14 => add(left, bottom),
                2 | 13 => add(bottom, right),
                3 | 12 => add(left, right),
                4 | 11 => add(top, right),
                6 | 9 => add(top, bottom),
                7 | 8 => add(left, top),
                5 if center_above => {
                    add(left, top);
                    add(bottom, right);
                }
                5 => {
                    add(top, right);
                    add(left, bottom);
                }
                10 if center_above => {
                    add(top, right);
                    add(left, bottom);
                }
                10 => {
                    add(left, top);
                    add(bottom, right);
                }
                _ => {}
            }
        }
    }

    chain(&segments)
        .into_iter()
        .map(|edges| {
            edges
                .into_iter()
                .filter_map(|edge| edge_point(grid, edge, level))
                .collect::<Vec<_>>()
        })
        .filter(|coords| coords.len() >= 2)
        .map(LineString::new)
        .collect()
}

/// Joins segments sharing an edge into the longest possible chains.
fn chain(segments: &[(Edge, Edge)]) -> Vec<VecDeque<Edge>> {
    let mut ends: HashMap<Edge, Vec<usize>> = HashMap::new();
    for (i, &(a, b)) in segments.iter().enumerate() {
        ends.entry(a).or_default().push(i);
        ends.entry(b).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let follow = |used: &mut Vec<bool>, edge: Edge| -> Option<Edge> {
        let &i = ends.get(&edge)?.iter().find(|&&i| !used[i])?;
        used[i] = true;
        let (a, b) = segments[i];
        Some(if a == edge { b } else { a })
    };

    let mut chains = Vec::new();
    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;

        let (a, b) = segments[start];
        let mut edges = VecDeque::from([a, b]);

        while let Some(next) = edges.back().copied().and_then(|e| follow(&mut used, e)) {
            edges.push_back(next);
        }
        while let Some(prev) = edges.front().copied().and_then(|e| follow(&mut used, e)) {
            edges.push_front(prev);
        }

        chains.push(edges);
    }

    chains
}
