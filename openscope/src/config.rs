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

//! Settings of the terrain derivation and the working directories.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Directory below the temporary path that holds all working files.
const ROOT_DIR: &str = "qgsopenscope";

/// Coastline of the full resolution GSHHS level 1 (land).
const COASTLINE_FILE: &str = "GSHHS_f_L1.geojson";

/// Shoreline of the full resolution GSHHS level 2 (lakes).
const LAKES_FILE: &str = "GSHHS_f_L2.geojson";

/// Configuration of a project build.
///
/// All distances and areas are in degrees, the contour interval is in metres
/// of the elevation model.
///
/// ```
/// use openscope::Config;
///
/// let config: Config = serde_json::from_str(r#"{ "contour_interval": 500.0 }"#).unwrap();
///
/// assert_eq!(config.contour_interval, 500.0);
/// assert_eq!(config.buffer_distance, Config::default().buffer_distance);
/// ```
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Vertical distance between two contours. Defaults to 1000 ft.
    pub contour_interval: f64,
    /// Distance the airspace is buffered by before terrain and water are
    /// clipped to it.
    pub buffer_distance: f64,
    /// Tolerance of the contour and coastline simplification.
    pub simplify_tolerance: f64,
    /// Contour bands below this area are merged into their neighbours.
    pub contour_min_area: f64,
    /// Islands and water bodies below this area are removed.
    pub water_min_area: f64,
    /// Directory with the GSHHS coastline and lakes.
    pub gshhs_path: Option<PathBuf>,
    /// Root of the working directories.
    pub tmp_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            contour_interval: 304.8,
            buffer_distance: 0.005,
            simplify_tolerance: 0.002,
            contour_min_area: 0.00005,
            water_min_area: 0.00005,
            gshhs_path: None,
            tmp_path: env::temp_dir(),
        }
    }
}

impl Config {
    /// Reads the configuration from a JSON file. Missing keys take their
    /// default value.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let s = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&s).map_err(|e| Error::io(path, e))
    }

    pub fn with_gshhs_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.gshhs_path = Some(path.into());
        self
    }

    pub fn with_tmp_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tmp_path = path.into();
        self
    }

    pub fn with_contour_interval(mut self, interval: f64) -> Self {
        self.contour_interval = interval;
        self
    }

    /// Returns the root of all working directories, creating it if needed.
    pub fn root_dir(&self) -> Result<PathBuf, Error> {
        create(self.tmp_path.join(ROOT_DIR))
    }

    /// Returns the working directory of an airport, creating it if needed.
    pub fn airport_dir(&self, icao: &str) -> Result<PathBuf, Error> {
        create(self.root_dir()?.join(icao.to_uppercase()))
    }

    /// Returns the shared cache of elevation tiles, creating it if needed.
    pub fn dems_dir(&self) -> Result<PathBuf, Error> {
        create(self.root_dir()?.join("dems"))
    }

    pub fn coastline_path(&self) -> Result<PathBuf, Error> {
        self.gshhs_file(COASTLINE_FILE)
    }

    pub fn lakes_path(&self) -> Result<PathBuf, Error> {
        self.gshhs_file(LAKES_FILE)
    }

    fn gshhs_file(&self, name: &str) -> Result<PathBuf, Error> {
        let dir = self.gshhs_path.as_ref().ok_or_else(|| Error::MissingResource {
            path: PathBuf::from(name),
        })?;

        let path = dir.join(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::MissingResource { path })
        }
    }
}

fn create(dir: PathBuf) -> Result<PathBuf, Error> {
    fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
    Ok(dir)
}
