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

//! Conversion between the airport file coordinate notation and geometries.
//!
//! Airport files store positions as `[lat, lng]` arrays where each value is
//! either a number or a hemisphere prefixed text like `N52d30m15` or
//! `W000 30`. Geometries use geo's `(x = lng, y = lat)` order, so every
//! function in this module swaps the order when crossing the boundary.
//!
//! Polygons are exchanged as open rings: a closing point is dropped on import
//! and never written on export.

use std::fmt::{Display, Formatter};

use geo::{Coord, LineString, Point};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Number of decimal places written when formatting coordinates.
pub const EXPORT_PRECISION: usize = 5;

const DEGREE_MARKERS: &[char] = &['d', '°', ' '];
const MINUTE_MARKERS: &[char] = &['m', '\'', ' '];
const SECOND_MARKERS: &[char] = &['s', '"'];

/// A single coordinate value as found in an airport file.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordinateValue {
    Number(f64),
    Text(String),
}

impl From<f64> for CoordinateValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for CoordinateValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CoordinateValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl Display for CoordinateValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

struct Scanner<'a> {
    rest: &'a str,
}

impl Scanner<'_> {
    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    /// Consumes `\d+(\.\d+)?`.
    fn number(&mut self) -> Option<f64> {
        let bytes = self.rest.as_bytes();
        let int_len = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
        if int_len == 0 {
            return None;
        }

        let mut len = int_len;
        if bytes.get(len) == Some(&b'.') {
            let frac_len = bytes[len + 1..]
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .count();
            if frac_len > 0 {
                len += 1 + frac_len;
            }
        }

        let (number, rest) = self.rest.split_at(len);
        self.rest = rest;
        number.parse().ok()
    }

    fn marker(&mut self, markers: &[char]) {
        if let Some(c) = self.rest.chars().next() {
            if markers.iter().any(|m| m.eq_ignore_ascii_case(&c)) {
                self.rest = &self.rest[c.len_utf8()..];
            }
        }
    }
}

fn parse_text(s: &str) -> Option<f64> {
    let mut chars = s.chars();
    let sign = match chars.next()?.to_ascii_uppercase() {
        'N' | 'E' => 1.0,
        'S' | 'W' => -1.0,
        _ => return None,
    };

    let mut scanner = Scanner {
        rest: chars.as_str(),
    };

    let mut decimal = scanner.number()?;
    scanner.marker(DEGREE_MARKERS);

    if !scanner.is_empty() {
        decimal += scanner.number()? / 60.0;
        scanner.marker(MINUTE_MARKERS);

        if !scanner.is_empty() {
            decimal += scanner.number()? / 3600.0;
            scanner.marker(SECOND_MARKERS);
        }
    }

    scanner.is_empty().then_some(sign * decimal)
}

/// Parses a coordinate value into signed decimal degrees.
///
/// Numbers are returned unchanged. Text must start with the hemisphere
/// `N`, `E`, `S` or `W` (case-insensitive) followed by the degrees and
/// optionally minutes and seconds, e.g. `N52.5`, `W000 30` or `S1d2m`.
/// Southern and western values are negative.
///
/// # Errors
///
/// Returns [`Error::InvalidCoordinate`] if the text doesn't match the notation.
pub fn parse_coordinate(value: &CoordinateValue) -> Result<f64, Error> {
    match value {
        CoordinateValue::Number(value) => Ok(*value),
        CoordinateValue::Text(text) => parse_coordinate_str(text),
    }
}

/// Parses hemisphere prefixed coordinate text. See [`parse_coordinate`].
pub fn parse_coordinate_str(s: &str) -> Result<f64, Error> {
    parse_text(s).ok_or_else(|| Error::InvalidCoordinate {
        value: s.to_string(),
    })
}

/// Formats a latitude as `N52.50000` or `S05.25000`.
pub fn format_latitude(latitude: f64) -> String {
    let hemisphere = if latitude < 0.0 { 'S' } else { 'N' };
    format!(
        "{hemisphere}{:0width$.prec$}",
        latitude.abs(),
        width = 3 + EXPORT_PRECISION,
        prec = EXPORT_PRECISION
    )
}

/// Formats a longitude as `E001.50000` or `W000.50000`.
pub fn format_longitude(longitude: f64) -> String {
    let hemisphere = if longitude < 0.0 { 'W' } else { 'E' };
    format!(
        "{hemisphere}{:0width$.prec$}",
        longitude.abs(),
        width = 4 + EXPORT_PRECISION,
        prec = EXPORT_PRECISION
    )
}

/// Returns the `[lat, lng]` notation of the point.
pub fn point_to_external(point: &Point<f64>) -> [String; 2] {
    [format_latitude(point.y()), format_longitude(point.x())]
}

/// Reads the point stored as `[lat, lng]` at `offset` of the values.
///
/// # Errors
///
/// Fails if either value is missing or can't be parsed.
pub fn external_to_point(values: &[CoordinateValue], offset: usize) -> Result<Point<f64>, Error> {
    match values.get(offset..offset + 2) {
        Some([lat, lng]) => Ok(Point::new(parse_coordinate(lng)?, parse_coordinate(lat)?)),
        _ => Err(Error::InvalidCoordinate {
            value: values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        }),
    }
}

/// Returns the `[[lat, lng], ...]` notation of the ring.
///
/// A closing point that repeats the first point is not written.
pub fn polygon_to_external(ring: &LineString<f64>) -> Vec<[String; 2]> {
    let mut coords = ring.0.as_slice();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords = &coords[..coords.len() - 1];
    }

    coords
        .iter()
        .map(|&c| point_to_external(&c.into()))
        .collect()
}

/// Reads a `[[lat, lng], ...]` array as an open ring.
///
/// If the array repeats its first point at the end, the duplicate is dropped.
pub fn external_to_polygon<V>(values: &[V]) -> Result<LineString<f64>, Error>
where
    V: AsRef<[CoordinateValue]>,
{
    let mut coords = values
        .iter()
        .map(|v| external_to_point(v.as_ref(), 0).map(Coord::from))
        .collect::<Result<Vec<_>, _>>()?;

    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }

    Ok(LineString::new(coords))
}

/// Returns one `[lat1, lng1, lat2, lng2]` entry for each adjacent point pair.
pub fn polyline_to_external(line: &LineString<f64>) -> Vec<[String; 4]> {
    line.lines()
        .map(|segment| {
            let [lat1, lng1] = point_to_external(&segment.start_point());
            let [lat2, lng2] = point_to_external(&segment.end_point());
            [lat1, lng1, lat2, lng2]
        })
        .collect()
}

/// Flattens the segments of all lines into one list.
pub fn polylines_to_external<'a>(
    lines: impl IntoIterator<Item = &'a LineString<f64>>,
) -> Vec<[String; 4]> {
    lines.into_iter().flat_map(polyline_to_external).collect()
}

/// Reads a list of flat `[lat1, lng1, lat2, lng2, ...]` arrays as lines.
///
/// # Errors
///
/// Returns [`Error::OddPolylineLength`] if an array has an odd number of
/// values and [`Error::InvalidCoordinate`] if a value can't be parsed.
pub fn external_to_polyline_set<V>(values: &[V]) -> Result<Vec<LineString<f64>>, Error>
where
    V: AsRef<[CoordinateValue]>,
{
    values
        .iter()
        .map(|item| {
            let item = item.as_ref();
            if item.len() % 2 != 0 {
                return Err(Error::OddPolylineLength { len: item.len() });
            }

            (0..item.len())
                .step_by(2)
                .map(|i| external_to_point(item, i).map(Coord::from))
                .collect::<Result<Vec<_>, _>>()
                .map(LineString::new)
        })
        .collect()
}
