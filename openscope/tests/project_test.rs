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

use std::cell::Cell;
use std::path::{Path, PathBuf};

use openscope::airport::{Airport, AirportModel, Map};
use openscope::ops::{Feature, Value, VectorLayer};
use openscope::project::{Node, AIRSPACE, FIXES, HIDDEN_AIRSPACE, MAPS, RESTRICTED, TERRAIN};
use openscope::terrain::{Terrain, TerrainSource, ELEVATION};
use openscope::{linestring, polygon, Config, Error, Project};

const EGKK: &str = r#"{
    "icao": "egkk",
    "fixes": {
        "BIG": ["N51.33083", "E000.03250"],
        "MAY": ["N51.01722", "E000.11611"]
    },
    "airspace": [
        {
            "floor": 0,
            "ceiling": 25,
            "airspace_class": "D",
            "poly": [
                ["N51.30000", "W000.40000"],
                ["N51.30000", "W000.00000"],
                ["N51.00000", "W000.00000"],
                ["N51.00000", "W000.40000"]
            ]
        },
        {
            "name": "London TMA",
            "floor": 25,
            "ceiling": 245,
            "airspace_class": "A",
            "hidden": true,
            "poly": [
                ["N51.50000", "W000.60000"],
                ["N51.50000", "E000.20000"],
                ["N50.90000", "E000.20000"]
            ]
        }
    ],
    "restricted": [
        {
            "name": "EG R095",
            "height": "2000ft",
            "coordinates": [
                ["N51.10000", "W000.20000"],
                ["N51.12000", "W000.20000"],
                ["N51.12000", "W000.18000"]
            ]
        }
    ],
    "maps": [
        {
            "name": "Runways",
            "lines": [
                ["N51.14806", "W000.19028", "N51.16361", "W000.15972"]
            ]
        }
    ]
}"#;

struct FailingTerrain;

impl TerrainSource for FailingTerrain {
    fn terrain(&self, _airspace: &VectorLayer, _work_dir: &Path) -> Result<Terrain, Error> {
        Err(Error::MissingResource {
            path: PathBuf::from("GSHHS_f_L1.geojson"),
        })
    }
}

#[derive(Default)]
struct CannedTerrain {
    airspace_features: Cell<usize>,
}

impl TerrainSource for CannedTerrain {
    fn terrain(&self, airspace: &VectorLayer, _work_dir: &Path) -> Result<Terrain, Error> {
        self.airspace_features.set(airspace.len());

        let band = Feature::new(polygon![
            (51.0, -0.4),
            (51.3, -0.4),
            (51.3, 0.0),
            (51.0, 0.0)
        ]);

        Ok(Terrain {
            water: VectorLayer::new("Water"),
            contours: VectorLayer::with_features(
                "Contours - Final",
                vec![band.with_attribute(ELEVATION, 304.8)],
            ),
        })
    }
}

/// Removes the project directory before handing back any terrain.
struct VanishingDirectory;

impl TerrainSource for VanishingDirectory {
    fn terrain(&self, airspace: &VectorLayer, work_dir: &Path) -> Result<Terrain, Error> {
        std::fs::remove_dir_all(work_dir).expect("project dir should be removed");
        CannedTerrain::default().terrain(airspace, work_dir)
    }
}

fn open(dir: &Path) -> Project {
    Project::open(Config::default().with_tmp_path(dir), "egkk").expect("project should open")
}

fn airport() -> Airport {
    Airport::from_json(EGKK).expect("airport should be valid")
}

fn names(nodes: &[Node]) -> Vec<&str> {
    nodes
        .iter()
        .map(|node| match node {
            Node::Layer(layer) => layer.name(),
            Node::Group(group) => group.name(),
        })
        .collect()
}

#[test]
fn layers_are_ordered() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let mut project = open(dir.path());

    let layers = project
        .populate(&airport(), None)
        .expect("project should be populated");

    assert_eq!(
        names(layers.nodes()),
        vec![FIXES, RESTRICTED, MAPS, TERRAIN, AIRSPACE, HIDDEN_AIRSPACE]
    );
    assert_eq!(layers.layer(FIXES).map(VectorLayer::len), Some(2));
    assert_eq!(layers.layer(AIRSPACE).map(VectorLayer::len), Some(1));
    assert_eq!(layers.layer(HIDDEN_AIRSPACE).map(VectorLayer::len), Some(1));
    assert_eq!(layers.layer("Runways").map(VectorLayer::len), Some(1));
}

#[test]
fn layers_are_persisted() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let mut project = open(dir.path());
    project
        .populate(&airport(), Some(&CannedTerrain::default()))
        .expect("project should be populated");

    for file in [
        "Fixes",
        "Restricted",
        "Airspace",
        "Airspace (Hidden)",
        "Map - Runways",
        "Water",
        "Contours - Final",
    ] {
        let path = project.dir().join(format!("{file}.geojson"));
        assert!(path.is_file(), "{} is missing", path.display());
    }

    let fixes = VectorLayer::read_geojson(&project.dir().join("Fixes.geojson"), FIXES)
        .expect("fixes should be readable");
    assert_eq!(
        fixes.features()[0].attribute("name"),
        Some(&Value::from("BIG"))
    );
}

#[test]
fn terrain_is_derived_from_visible_airspace() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let mut project = open(dir.path());
    let terrain = CannedTerrain::default();

    let layers = project
        .populate(&airport(), Some(&terrain))
        .expect("project should be populated");

    assert_eq!(terrain.airspace_features.get(), 1);

    let group = layers.group(TERRAIN).expect("terrain group exists");
    let names: Vec<_> = group.layers().iter().map(|layer| layer.name()).collect();
    assert_eq!(names, vec!["Water", "Contours - Final"]);
    assert!(project.terrain_error().is_none());
}

#[test]
fn failed_terrain_keeps_other_layers() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let mut project = open(dir.path());

    let layers = project
        .populate(&airport(), Some(&FailingTerrain))
        .expect("terrain failure should not fail the project");

    let terrain = layers.group(TERRAIN).expect("terrain group exists");
    assert!(terrain.children().is_empty());
    assert!(layers.layer(AIRSPACE).is_some());
    assert!(layers.layer(FIXES).is_some());

    assert!(matches!(
        project.terrain_error(),
        Some(Error::MissingResource { .. })
    ));
}

#[test]
fn map_names_with_separators_are_persisted() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let mut project = open(dir.path());
    let airport = airport().with_map(Map {
        name: String::from("SIDs/STARs"),
        lines: vec![linestring![(51.14806, -0.19028), (51.2, -0.3)]],
    });

    let layers = project
        .populate(&airport, None)
        .expect("project should be populated");

    assert_eq!(layers.layer("SIDs/STARs").map(VectorLayer::len), Some(1));
    assert!(layers.layer(FIXES).is_some());
    assert!(project.dir().join("Map - SIDs_STARs.geojson").is_file());
}

#[test]
fn failed_write_keeps_the_layers() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let mut project = open(dir.path());

    let result = project
        .populate(&airport(), Some(&VanishingDirectory))
        .map(|_| ());
    assert!(matches!(result, Err(Error::Io { .. })));

    let layers = project.layers().expect("project is still open");
    assert_eq!(layers.layer(FIXES).map(VectorLayer::len), Some(2));
    assert_eq!(layers.layer(AIRSPACE).map(VectorLayer::len), Some(1));
    assert!(layers.layer("Contours - Final").is_some());
}

#[test]
fn export_reads_back_as_the_same_airport() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let mut project = open(dir.path());
    let airport = airport();
    project
        .populate(&airport, None)
        .expect("project should be populated");

    let exported = project.export().expect("project should be exported");
    let reimported =
        Airport::from_json(&exported.to_string()).expect("export should be a valid airport");

    assert_eq!(reimported, airport);
    assert_eq!(reimported.icao(), "EGKK");
}

#[test]
fn exported_coordinates_are_hemisphere_text() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let mut project = open(dir.path());
    project
        .populate(&airport(), None)
        .expect("project should be populated");

    let exported = project.export().expect("project should be exported");

    assert_eq!(
        exported["fixes"]["BIG"],
        serde_json::json!(["N51.33083", "E000.03250"])
    );
    assert_eq!(exported["airspace"][1]["hidden"], serde_json::json!(true));
    assert_eq!(exported["airspace"][1]["name"], serde_json::json!("London TMA"));
}

#[test]
fn closed_project_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let mut project = open(dir.path());
    project.close().expect("project should close");

    assert!(!project.is_open());
    assert_eq!(
        project.populate(&airport(), None).map(|_| ()),
        Err(Error::ProjectClosed)
    );
    assert_eq!(project.export(), Err(Error::ProjectClosed));
    assert_eq!(project.close(), Err(Error::ProjectClosed));
}
