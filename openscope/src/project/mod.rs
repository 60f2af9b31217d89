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

//! The project built from an airport.
//!
//! A [`Project`] is an explicit context with a lifecycle: it's opened for an
//! airport, populated from the airport's model and closed when done. The
//! layers are written to the airport's working directory while the project
//! is populated.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use openscope::airport::{Airport, AirportModel};
//! use openscope::ops::GeoBackend;
//! use openscope::terrain::{TerrainPipeline, TileDirectory};
//! use openscope::{Config, Project};
//!
//! # fn main() -> Result<(), openscope::Error> {
//! let config = Config::default().with_gshhs_path("/data/gshhs");
//! let airport = Airport::read(Path::new("egll.json"))?;
//!
//! let dems = TileDirectory::new(config.dems_dir()?);
//! let terrain = TerrainPipeline::new(GeoBackend, dems, config.clone());
//!
//! let mut project = Project::open(config, airport.icao())?;
//! project.populate(&airport, Some(&terrain))?;
//! let exported = project.export()?;
//! project.close()?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::airport::{
    AirportFile, AirportModel, AirspaceRecord, MapRecord, RestrictedRecord,
};
use crate::config::Config;
use crate::error::Error;
use crate::geom::codec::{point_to_external, polygon_to_external, polylines_to_external};
use crate::geom::CoordinateValue;
use crate::ops::{VectorLayer, Value};
use crate::terrain::TerrainSource;

mod layers;

pub use layers::{
    airspace_layer, fixes_layer, map_layer, restricted_layer, LayerGroup, Node, ProjectLayers,
    AIRSPACE, FIXES, HIDDEN_AIRSPACE, MAPS, RESTRICTED, TERRAIN,
};

/// Caller owned project of one airport.
#[derive(Debug)]
pub struct Project {
    config: Config,
    icao: String,
    dir: PathBuf,
    layers: ProjectLayers,
    terrain_error: Option<Error>,
    open: bool,
}

impl Project {
    /// Opens a project for the airport, creating its working directory.
    pub fn open(config: Config, icao: &str) -> Result<Self, Error> {
        let icao = icao.to_uppercase();
        let dir = config.airport_dir(&icao)?;
        info!("opened project {icao} in {}", dir.display());

        Ok(Self {
            config,
            icao,
            dir,
            layers: ProjectLayers::default(),
            terrain_error: None,
            open: true,
        })
    }

    pub fn icao(&self) -> &str {
        &self.icao
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The working directory of the project.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.open {
            Ok(())
        } else {
            Err(Error::ProjectClosed)
        }
    }

    /// Replaces the project's layers by the layers of the airport.
    ///
    /// The terrain is derived last from the visible airspace. If it fails,
    /// the error is kept as [`Project::terrain_error`] and the terrain group
    /// stays empty while all other layers remain. The layers are kept even
    /// if writing them to the working directory fails.
    pub fn populate<M>(
        &mut self,
        model: &M,
        terrain: Option<&dyn TerrainSource>,
    ) -> Result<&ProjectLayers, Error>
    where
        M: AirportModel + ?Sized,
    {
        self.ensure_open()?;

        if model.icao() != self.icao {
            warn!(
                "populating project {} from airport {}",
                self.icao,
                model.icao()
            );
        }

        self.layers = ProjectLayers::default();
        self.terrain_error = None;

        let airspace = airspace_layer(&model.airspace(false), false);

        let mut maps = LayerGroup::new(MAPS);
        for map in model.maps() {
            maps.add_layer(map_layer(map));
        }

        let mut terrain_group = LayerGroup::new(TERRAIN);
        if let Some(source) = terrain {
            match source.terrain(&airspace, &self.dir) {
                Ok(terrain) => {
                    terrain_group.add_layer(terrain.water);
                    terrain_group.add_layer(terrain.contours);
                }
                Err(e) => {
                    warn!("terrain of {} is skipped: {e}", self.icao);
                    self.terrain_error = Some(e);
                }
            }
        }

        let mut root = LayerGroup::default();
        root.add_layer(fixes_layer(model.fixes()));
        root.add_layer(restricted_layer(model.restricted()));
        root.add_group(maps);
        root.add_group(terrain_group);
        root.add_layer(airspace);
        root.add_layer(airspace_layer(&model.airspace(true), true));
        self.layers = ProjectLayers::new(root);

        info!(
            "populated project {} with {} layers",
            self.icao,
            self.layers.layers().len()
        );

        self.persist()?;
        Ok(&self.layers)
    }

    /// Writes every layer as GeoJSON file named after the layer. Map layers
    /// are prefixed with `Map - `.
    fn persist(&self) -> Result<(), Error> {
        for node in self.layers.nodes() {
            match node {
                Node::Layer(layer) => self.write_layer(layer, layer.name())?,
                Node::Group(group) => {
                    let prefix = if group.name() == MAPS { "Map - " } else { "" };
                    for layer in group.layers() {
                        self.write_layer(layer, &format!("{prefix}{}", layer.name()))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn write_layer(&self, layer: &VectorLayer, name: &str) -> Result<(), Error> {
        let path = self.dir.join(format!("{}.geojson", file_name(name)));
        layer.write_geojson(&path)
    }

    pub fn layers(&self) -> Result<&ProjectLayers, Error> {
        self.ensure_open()?;
        Ok(&self.layers)
    }

    /// Returns why the terrain of the last population failed.
    pub fn terrain_error(&self) -> Option<&Error> {
        self.terrain_error.as_ref()
    }

    /// Writes the project's fixes, airspace, restricted areas and maps back
    /// into the notation of the airport file.
    pub fn export(&self) -> Result<serde_json::Value, Error> {
        let layers = self.layers()?;

        let fixes = layers
            .layer(FIXES)
            .map(|layer| {
                layer
                    .features()
                    .iter()
                    .filter_map(|feature| {
                        let geo::Geometry::Point(point) = &feature.geometry else {
                            return None;
                        };
                        let name = feature.attribute("name")?.as_str()?.to_string();
                        Some((name, values(point_to_external(point))))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut airspace = Vec::new();
        for (name, hidden) in [(AIRSPACE, false), (HIDDEN_AIRSPACE, true)] {
            let Some(layer) = layers.layer(name) else {
                continue;
            };

            for feature in layer.features() {
                let geo::Geometry::Polygon(polygon) = &feature.geometry else {
                    continue;
                };

                airspace.push(AirspaceRecord {
                    name: text(feature.attribute("name")),
                    floor: integer(feature.attribute("floor")),
                    ceiling: integer(feature.attribute("ceiling")),
                    airspace_class: text(feature.attribute("airspace_class")).unwrap_or_default(),
                    poly: rings(polygon),
                    hidden,
                });
            }
        }

        let restricted = layers
            .layer(RESTRICTED)
            .map(|layer| {
                layer
                    .features()
                    .iter()
                    .filter_map(|feature| match &feature.geometry {
                        geo::Geometry::Polygon(polygon) => Some(RestrictedRecord {
                            name: text(feature.attribute("name")).unwrap_or_default(),
                            height: text(feature.attribute("height")).unwrap_or_default(),
                            coordinates: rings(polygon),
                        }),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let maps = layers
            .group(MAPS)
            .map(|group| {
                group
                    .layers()
                    .into_iter()
                    .map(|layer| MapRecord {
                        name: layer.name().to_string(),
                        lines: polylines_to_external(layer.features().iter().filter_map(
                            |feature| match &feature.geometry {
                                geo::Geometry::LineString(line) => Some(line),
                                _ => None,
                            },
                        ))
                        .into_iter()
                        .map(values)
                        .collect(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let file = AirportFile {
            icao: self.icao.clone(),
            name: None,
            fixes,
            airspace,
            restricted,
            maps,
        };

        Ok(serde_json::to_value(file)?)
    }

    /// Closes the project and drops its layers.
    pub fn close(&mut self) -> Result<(), Error> {
        self.ensure_open()?;
        self.open = false;
        self.layers = ProjectLayers::default();
        info!("closed project {}", self.icao);
        Ok(())
    }
}

/// Replaces the characters that can't be part of a file name.
fn file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn values<const N: usize>(texts: [String; N]) -> Vec<CoordinateValue> {
    texts.into_iter().map(CoordinateValue::Text).collect()
}

fn rings(polygon: &geo::Polygon<f64>) -> Vec<Vec<CoordinateValue>> {
    polygon_to_external(polygon.exterior())
        .into_iter()
        .map(values)
        .collect()
}

fn text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn integer(value: Option<&Value>) -> i32 {
    value
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airport::{Airport, Airspace, Fix};

    fn airport() -> Airport {
        Airport::new("EGLL")
            .with_fix(Fix {
                name: String::from("LAM"),
                location: coord!(51.64611, 0.15167),
            })
            .with_airspace(Airspace {
                name: None,
                airspace_class: String::from("D"),
                floor: 0,
                ceiling: 25,
                poly: linestring![(51.3, -0.7), (51.6, -0.7), (51.6, -0.2), (51.3, -0.2)],
                hidden: false,
            })
    }

    #[test]
    fn closed_project_rejects_operations() {
        let tmp = tempfile::tempdir().expect("temp dir should be created");
        let mut project = Project::open(Config::default().with_tmp_path(tmp.path()), "egll")
            .expect("project should open");

        project.close().expect("project should close");

        assert_eq!(project.layers().err(), Some(Error::ProjectClosed));
        assert_eq!(
            project.populate(&airport(), None).err(),
            Some(Error::ProjectClosed)
        );
        assert_eq!(project.close(), Err(Error::ProjectClosed));
    }

    #[test]
    fn layers_are_persisted() {
        let tmp = tempfile::tempdir().expect("temp dir should be created");
        let mut project = Project::open(Config::default().with_tmp_path(tmp.path()), "EGLL")
            .expect("project should open");

        project
            .populate(&airport(), None)
            .expect("project should be populated");

        assert!(project.dir().join("Fixes.geojson").is_file());
        assert!(project.dir().join("Airspace.geojson").is_file());
        assert!(project.dir().join("Airspace (Hidden).geojson").is_file());
        assert!(project.terrain_error().is_none());
    }

    #[test]
    fn file_names_have_no_separators() {
        assert_eq!(file_name("Map - SIDs/STARs"), "Map - SIDs_STARs");
        assert_eq!(file_name("RWY 08R\\26L: ILS?"), "RWY 08R_26L_ ILS_");
        assert_eq!(file_name("Airspace (Hidden)"), "Airspace (Hidden)");
    }
}
