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

//! Locating the elevation tiles below an area.

use std::path::PathBuf;

use geo::{BoundingRect, MultiPolygon};
use log::{debug, warn};

use crate::error::Error;

/// Resolves the elevation rasters covering an area.
pub trait DemLocator {
    /// Returns the paths of all raster tiles intersecting the area.
    fn resolve(&self, area: &MultiPolygon<f64>) -> Result<Vec<PathBuf>, Error>;
}

impl<T: DemLocator + ?Sized> DemLocator for &T {
    fn resolve(&self, area: &MultiPolygon<f64>) -> Result<Vec<PathBuf>, Error> {
        (**self).resolve(area)
    }
}

/// Directory of 1°×1° GeoTIFF tiles named after their south-west corner,
/// e.g. `N51W001.tif` for the tile from 51°N 1°W to 52°N 0°.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TileDirectory {
    dir: PathBuf,
    extension: String,
}

impl TileDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: String::from("tif"),
        }
    }

    /// Sets the file extension of the tiles.
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Returns the name of the tile with the south-west corner at the
    /// latitude and longitude.
    pub fn tile_name(lat: i32, lng: i32) -> String {
        format!(
            "{}{:02}{}{:03}",
            if lat >= 0 { 'N' } else { 'S' },
            lat.abs(),
            if lng >= 0 { 'E' } else { 'W' },
            lng.abs()
        )
    }

    /// Returns the names of all tiles intersecting the area.
    pub fn tile_names(area: &MultiPolygon<f64>) -> Vec<String> {
        let Some(rect) = area.bounding_rect() else {
            return Vec::new();
        };

        let min_lat = rect.min().y.floor() as i32;
        let max_lat = rect.max().y.ceil().max(rect.min().y.floor() + 1.0) as i32;
        let min_lng = rect.min().x.floor() as i32;
        let max_lng = rect.max().x.ceil().max(rect.min().x.floor() + 1.0) as i32;

        (min_lat..max_lat)
            .flat_map(|lat| (min_lng..max_lng).map(move |lng| Self::tile_name(lat, lng)))
            .collect()
    }
}

impl DemLocator for TileDirectory {
    /// Returns the existing tiles. Missing tiles are skipped since there
    /// are no tiles over open water, but at least one tile must exist.
    fn resolve(&self, area: &MultiPolygon<f64>) -> Result<Vec<PathBuf>, Error> {
        let names = Self::tile_names(area);
        let mut tiles = Vec::with_capacity(names.len());

        for name in &names {
            let path = self.dir.join(format!("{name}.{}", self.extension));
            if path.is_file() {
                tiles.push(path);
            } else {
                warn!("elevation tile {} is missing", path.display());
            }
        }

        debug!("found {} of {} elevation tiles", tiles.len(), names.len());

        if tiles.is_empty() {
            return Err(Error::MissingResource {
                path: self.dir.clone(),
            });
        }

        Ok(tiles)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn area(lat: (f64, f64), lng: (f64, f64)) -> MultiPolygon<f64> {
        polygon![
            (lat.0, lng.0),
            (lat.0, lng.1),
            (lat.1, lng.1),
            (lat.1, lng.0)
        ]
        .into()
    }

    #[test]
    fn names_follow_the_south_west_corner() {
        assert_eq!(TileDirectory::tile_name(51, -1), "N51W001");
        assert_eq!(TileDirectory::tile_name(-34, 151), "S34E151");
        assert_eq!(TileDirectory::tile_name(0, 0), "N00E000");
    }

    #[test]
    fn tiles_cover_the_area() {
        let names = TileDirectory::tile_names(&area((51.2, 52.3), (-0.7, 0.2)));

        assert_eq!(names, vec!["N51W001", "N51E000", "N52W001", "N52E000"]);
    }

    #[test]
    fn area_on_tile_boundary() {
        let names = TileDirectory::tile_names(&area((51.0, 52.0), (1.0, 2.0)));

        assert_eq!(names, vec!["N51E001"]);
    }

    #[test]
    fn missing_tiles_are_skipped() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        fs::write(dir.path().join("N51E000.tif"), b"").expect("tile should be written");

        let tiles = TileDirectory::new(dir.path())
            .resolve(&area((51.2, 52.3), (-0.7, 0.2)))
            .expect("one tile exists");

        assert_eq!(tiles, vec![dir.path().join("N51E000.tif")]);
    }

    #[test]
    fn no_tiles_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir should be created");

        let result = TileDirectory::new(dir.path())
            .with_extension(".hgt.tif")
            .resolve(&area((51.2, 52.3), (-0.7, 0.2)));

        assert!(matches!(result, Err(Error::MissingResource { .. })));
    }
}
