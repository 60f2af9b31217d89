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

/// Creates a [`geo::Point<f64>`] from latitude and longitude.
///
/// Note: This macro accepts (latitude, longitude) like the airport files do,
/// but creates the point with (longitude, latitude) to match geo's order.
#[macro_export]
macro_rules! coord {
    ($latitude:expr, $longitude:expr) => {
        geo::Point::new($longitude, $latitude)
    };
}

/// Creates a [`geo::Polygon<f64>`] containing the coordinates.
///
/// ```
/// use openscope::polygon;
///
/// let p = polygon![(52.0, 0.0), (52.0, 1.0), (53.0, 1.0), (53.0, 0.0)];
/// assert_eq!(p.exterior().0.len(), 5);
/// ```
///
/// Note: Coordinates are specified as (latitude, longitude) but internally
/// converted to geo's (longitude, latitude) order. The ring is closed by geo.
#[macro_export]
macro_rules! polygon {
    ( $( ($lat:expr, $lon:expr) ),* $(,)? ) => {{
        geo::Polygon::new(
            geo::LineString::from(vec![ $( geo::Coord { x: $lon, y: $lat }, )* ]),
            vec![]
        )
    }};
}

/// Creates an open [`geo::LineString<f64>`] from (latitude, longitude) pairs.
#[macro_export]
macro_rules! linestring {
    ( $( ($lat:expr, $lon:expr) ),* $(,)? ) => {{
        geo::LineString::from(vec![ $( geo::Coord { x: $lon, y: $lat }, )* ])
    }};
}
