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

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use geo::{Area, MultiPolygon};
use openscope::ops::raster::Grid;
use openscope::ops::{Backend, Feature, Feedback, GeoBackend, RasterLayer, Value, VectorLayer};
use openscope::terrain::{
    CancellationToken, DemLocator, Stage, TerrainPipeline, TileDirectory, CLIPPED_FILE,
    ELEVATION, MEAN, MERGED_FILE,
};
use openscope::{polygon, Config, Error, ErrorKind};

const EMPTY_COLLECTION: &str = r#"{ "type": "FeatureCollection", "features": [] }"#;

/// Backend returning canned layers while recording the operations it ran.
#[derive(Default)]
struct CannedBackend {
    operations: RefCell<Vec<&'static str>>,
    bands: Vec<Feature>,
    means: Vec<Option<f64>>,
    cancel_on_contour: Option<CancellationToken>,
}

impl CannedBackend {
    fn new(means: &[Option<f64>]) -> Self {
        let bands = (0..means.len())
            .map(|i| {
                let lat = 51.0 + 0.05 * i as f64;
                Feature::new(polygon![
                    (lat, 0.0),
                    (lat, 0.2),
                    (lat + 0.05, 0.2),
                    (lat + 0.05, 0.0)
                ])
            })
            .collect();

        Self {
            bands,
            means: means.to_vec(),
            ..Default::default()
        }
    }

    fn record(&self, operation: &'static str) {
        self.operations.borrow_mut().push(operation);
    }

    fn operations(&self) -> Vec<&'static str> {
        self.operations.borrow().clone()
    }
}

fn touch(path: &Path) -> Result<(), Error> {
    fs::write(path, b"").map_err(|e| Error::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

impl Backend for CannedBackend {
    fn polygons_to_lines(&self, input: &VectorLayer) -> Result<VectorLayer, Error> {
        self.record("polygons-to-lines");
        Ok(input.clone())
    }

    fn buffer(&self, input: &VectorLayer, _distance: f64) -> Result<VectorLayer, Error> {
        self.record("buffer");
        Ok(input.clone())
    }

    fn simplify(&self, input: &VectorLayer, _tolerance: f64) -> Result<VectorLayer, Error> {
        self.record("simplify");
        Ok(input.clone())
    }

    fn merge_vector_layers(&self, inputs: &[&VectorLayer]) -> Result<VectorLayer, Error> {
        self.record("merge-vector-layers");
        let features = inputs
            .iter()
            .flat_map(|layer| layer.features().iter().cloned())
            .collect();
        Ok(VectorLayer::with_features("merged", features))
    }

    fn polygonize(&self, _input: &VectorLayer) -> Result<VectorLayer, Error> {
        self.record("polygonize");
        Ok(VectorLayer::with_features("faces", self.bands.clone()))
    }

    fn eliminate_small_polygons(
        &self,
        input: &VectorLayer,
        _min_area: f64,
    ) -> Result<VectorLayer, Error> {
        self.record("eliminate-small-polygons");
        Ok(input.clone())
    }

    fn clip(&self, input: &VectorLayer, _overlay: &VectorLayer) -> Result<VectorLayer, Error> {
        self.record("clip");
        Ok(input.clone())
    }

    fn difference(
        &self,
        input: &VectorLayer,
        _overlay: &VectorLayer,
    ) -> Result<VectorLayer, Error> {
        self.record("difference");
        Ok(input.clone())
    }

    fn multipart_to_singlepart(&self, input: &VectorLayer) -> Result<VectorLayer, Error> {
        self.record("multipart-to-singlepart");
        Ok(input.clone())
    }

    fn raster_merge(
        &self,
        _inputs: &[PathBuf],
        output: &Path,
        feedback: &dyn Feedback,
    ) -> Result<RasterLayer, Error> {
        self.record("raster-merge");
        feedback.set_progress(100.0);
        touch(output)?;
        Ok(RasterLayer::new("merged", output))
    }

    fn raster_clip_by_mask(
        &self,
        _input: &RasterLayer,
        _mask: &VectorLayer,
        output: &Path,
    ) -> Result<RasterLayer, Error> {
        self.record("raster-clip-by-mask");
        touch(output)?;
        Ok(RasterLayer::new("clipped", output))
    }

    fn raster_contour(
        &self,
        _input: &RasterLayer,
        _interval: f64,
        output: &Path,
        _feedback: &dyn Feedback,
    ) -> Result<VectorLayer, Error> {
        self.record("raster-contour");
        if let Some(token) = &self.cancel_on_contour {
            token.cancel();
        }
        touch(output)?;
        Ok(VectorLayer::new("contours"))
    }

    fn zonal_statistics(
        &self,
        _raster: &RasterLayer,
        input: &VectorLayer,
        prefix: &str,
    ) -> Result<VectorLayer, Error> {
        self.record("zonal-statistics");
        let attribute = format!("{prefix}mean");
        let features = input
            .features()
            .iter()
            .zip(&self.means)
            .map(|(feature, mean)| feature.clone().with_attribute(&attribute, *mean))
            .collect();
        Ok(VectorLayer::with_features(input.name(), features))
    }
}

struct FixedTiles(Vec<PathBuf>);

impl DemLocator for FixedTiles {
    fn resolve(&self, _area: &MultiPolygon<f64>) -> Result<Vec<PathBuf>, Error> {
        Ok(self.0.clone())
    }
}

fn tiles() -> FixedTiles {
    FixedTiles(vec![PathBuf::from("N51E000.tif")])
}

fn airspace() -> VectorLayer {
    VectorLayer::with_features(
        "Airspace",
        vec![Feature::new(polygon![
            (51.1, 0.1),
            (51.1, 0.3),
            (51.3, 0.3),
            (51.3, 0.1)
        ])],
    )
}

fn gshhs(dir: &Path, coastline: &str, lakes: &str) {
    let gshhs = dir.join("gshhs");
    fs::create_dir_all(&gshhs).expect("gshhs dir should be created");
    fs::write(gshhs.join("GSHHS_f_L1.geojson"), coastline).expect("coastline should be written");
    fs::write(gshhs.join("GSHHS_f_L2.geojson"), lakes).expect("lakes should be written");
}

fn config(dir: &Path) -> Config {
    Config::default()
        .with_gshhs_path(dir.join("gshhs"))
        .with_tmp_path(dir)
}

fn elevations(layer: &VectorLayer) -> Vec<f64> {
    layer
        .features()
        .iter()
        .filter_map(|f| f.attribute(ELEVATION).and_then(Value::as_f64))
        .collect()
}

#[test]
fn stages_run_in_order() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    gshhs(dir.path(), EMPTY_COLLECTION, EMPTY_COLLECTION);

    let backend = CannedBackend::new(&[Some(400.0)]);
    let pipeline = TerrainPipeline::new(&backend, tiles(), config(dir.path()));
    pipeline
        .run(&airspace(), dir.path())
        .expect("terrain should be derived");

    assert_eq!(
        backend.operations(),
        vec![
            // boundary
            "polygons-to-lines",
            "buffer",
            // elevation
            "raster-merge",
            "raster-clip-by-mask",
            "raster-contour",
            // water
            "clip",
            "clip",
            "simplify",
            "difference",
            "merge-vector-layers",
            "clip",
            "multipart-to-singlepart",
            // contours
            "simplify",
            "merge-vector-layers",
            "polygonize",
            "eliminate-small-polygons",
            "clip",
            "multipart-to-singlepart",
            // normalization
            "zonal-statistics",
        ]
    );
}

#[test]
fn water_is_at_sea_level() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    gshhs(dir.path(), EMPTY_COLLECTION, EMPTY_COLLECTION);

    let backend = CannedBackend::new(&[Some(400.0)]);
    let terrain = TerrainPipeline::new(&backend, tiles(), config(dir.path()))
        .run(&airspace(), dir.path())
        .expect("terrain should be derived");

    // without land the whole buffered airspace is sea
    assert_eq!(terrain.water.name(), "Water");
    assert_eq!(terrain.water.len(), 1);
    assert_eq!(elevations(&terrain.water), vec![0.0]);
}

#[test]
fn contour_bands_are_normalized() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    gshhs(dir.path(), EMPTY_COLLECTION, EMPTY_COLLECTION);

    let backend = CannedBackend::new(&[Some(100.0), Some(650.0), None, Some(1000.0)]);
    let terrain = TerrainPipeline::new(&backend, tiles(), config(dir.path()))
        .run(&airspace(), dir.path())
        .expect("terrain should be derived");

    let contours = terrain.contours;
    assert_eq!(contours.name(), "Contours - Final");
    assert_eq!(contours.len(), 2);

    let elevations = elevations(&contours);
    assert!((elevations[0] - 609.6).abs() < 1e-9);
    assert!((elevations[1] - 914.4).abs() < 1e-9);

    for band in contours.features() {
        let mean = band.attribute(MEAN).and_then(Value::as_f64).unwrap();
        let elevation = band.attribute(ELEVATION).and_then(Value::as_f64).unwrap();
        assert!(elevation <= mean);
    }
}

#[test]
fn cancelled_before_first_stage() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    gshhs(dir.path(), EMPTY_COLLECTION, EMPTY_COLLECTION);

    let token = CancellationToken::new();
    token.cancel();

    let backend = CannedBackend::new(&[Some(400.0)]);
    let result = TerrainPipeline::new(&backend, tiles(), config(dir.path()))
        .with_cancellation(token)
        .run(&airspace(), dir.path());

    assert_eq!(
        result,
        Err(Error::Cancelled {
            stage: Stage::Boundary
        })
    );
    assert!(backend.operations().is_empty());
}

#[test]
fn cancelled_between_stages() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    gshhs(dir.path(), EMPTY_COLLECTION, EMPTY_COLLECTION);

    let token = CancellationToken::new();
    let mut backend = CannedBackend::new(&[Some(400.0)]);
    backend.cancel_on_contour = Some(token.clone());

    let result = TerrainPipeline::new(&backend, tiles(), config(dir.path()))
        .with_cancellation(token)
        .run(&airspace(), dir.path());

    // the running stage completes
    assert_eq!(result, Err(Error::Cancelled { stage: Stage::Water }));
    assert_eq!(backend.operations().last(), Some(&"raster-contour"));
}

#[test]
fn empty_polygonize_is_fatal() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    gshhs(dir.path(), EMPTY_COLLECTION, EMPTY_COLLECTION);

    let backend = CannedBackend::new(&[]);
    let result = TerrainPipeline::new(&backend, tiles(), config(dir.path()))
        .run(&airspace(), dir.path());

    assert_eq!(
        result,
        Err(Error::EmptyResult {
            operation: "polygonize"
        })
    );
}

#[test]
fn missing_coastline_is_a_resource_error() {
    let dir = tempfile::tempdir().expect("temp dir should be created");

    let backend = CannedBackend::new(&[Some(400.0)]);
    let result = TerrainPipeline::new(&backend, tiles(), config(dir.path()))
        .run(&airspace(), dir.path());

    let err = result.expect_err("coastline is missing");
    assert_eq!(err.kind(), ErrorKind::Resource);
    // elevation was acquired before the water stage failed
    assert_eq!(backend.operations().last(), Some(&"raster-contour"));
}

#[test]
fn missing_elevation_tiles_are_fatal() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    gshhs(dir.path(), EMPTY_COLLECTION, EMPTY_COLLECTION);

    let backend = CannedBackend::new(&[Some(400.0)]);
    let locator = TileDirectory::new(dir.path().join("dems"));
    let result = TerrainPipeline::new(&backend, locator, config(dir.path()))
        .run(&airspace(), dir.path());

    let err = result.expect_err("no tile exists");
    assert_eq!(err.kind(), ErrorKind::Resource);
    assert_eq!(backend.operations(), vec!["polygons-to-lines", "buffer"]);
}

#[test]
fn non_positive_interval_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    gshhs(dir.path(), EMPTY_COLLECTION, EMPTY_COLLECTION);

    let backend = CannedBackend::new(&[Some(400.0)]);
    let config = config(dir.path()).with_contour_interval(0.0);
    let result = TerrainPipeline::new(&backend, tiles(), config).run(&airspace(), dir.path());

    assert_eq!(
        result.map_err(|e| e.kind()),
        Err(ErrorKind::Operation)
    );
    assert!(backend.operations().is_empty());
}

#[test]
fn stale_rasters_are_replaced() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    gshhs(dir.path(), EMPTY_COLLECTION, EMPTY_COLLECTION);
    fs::write(dir.path().join(MERGED_FILE), "stale").expect("stale file should be written");

    let backend = CannedBackend::new(&[Some(400.0)]);
    TerrainPipeline::new(&backend, tiles(), config(dir.path()))
        .run(&airspace(), dir.path())
        .expect("terrain should be derived");

    let merged = fs::read(dir.path().join(MERGED_FILE)).expect("merged raster exists");
    assert!(merged.is_empty());
    assert!(dir.path().join(CLIPPED_FILE).is_file());
}

#[test]
fn raster_progress_is_reported() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    gshhs(dir.path(), EMPTY_COLLECTION, EMPTY_COLLECTION);

    let progress = RefCell::new(Vec::new());
    let feedback = |percent: f64| progress.borrow_mut().push(percent);

    let backend = CannedBackend::new(&[Some(400.0)]);
    TerrainPipeline::new(&backend, tiles(), config(dir.path()))
        .with_feedback(&feedback)
        .run(&airspace(), dir.path())
        .expect("terrain should be derived");

    assert_eq!(progress.into_inner(), vec![100.0]);
}

/// Writes a cone peaking at 1500 m over 51.2°N 0.2°E into a 1°×1° tile.
fn write_cone(dir: &Path) -> PathBuf {
    let size = 200;
    let cell = 1.0 / size as f64;
    let mut values = Vec::with_capacity(size * size);
    for row in 0..size {
        for col in 0..size {
            let lat = 52.0 - (row as f64 + 0.5) * cell;
            let lng = (col as f64 + 0.5) * cell;
            let d = ((lat - 51.2).powi(2) + (lng - 0.2).powi(2)).sqrt();
            values.push((1500.0 - 5000.0 * d).max(0.0));
        }
    }

    let tiles = dir.join("dems");
    fs::create_dir_all(&tiles).expect("dems dir should be created");
    let path = tiles.join(TileDirectory::tile_name(51, 0) + ".tif");
    Grid::new(size, size, geo::Coord { x: 0.0, y: 52.0 }, (cell, cell), values)
        .write(&path)
        .expect("tile should be written");
    tiles
}

#[test]
fn terrain_of_a_hill_covered_by_land() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let land = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-1.0, 50.0], [2.0, 50.0], [2.0, 53.0], [-1.0, 53.0], [-1.0, 50.0]]]
            }
        }]
    }"#;
    gshhs(dir.path(), land, EMPTY_COLLECTION);
    let tiles = TileDirectory::new(write_cone(dir.path()));

    let airspace = airspace();
    let terrain = TerrainPipeline::new(GeoBackend, tiles, config(dir.path()))
        .run(&airspace, dir.path())
        .expect("terrain should be derived");

    assert!(terrain.water.is_empty());
    assert!(!terrain.contours.is_empty());

    let interval = Config::default().contour_interval;
    for band in terrain.contours.features() {
        let mean = band.attribute(MEAN).and_then(Value::as_f64).unwrap();
        let elevation = band.attribute(ELEVATION).and_then(Value::as_f64).unwrap();

        assert!(elevation >= interval);
        assert!(elevation <= mean);
        let steps = elevation / interval;
        assert!((steps - steps.round()).abs() < 1e-9);
    }

    // the bands partition the airspace
    let area: f64 = terrain
        .contours
        .features()
        .iter()
        .map(|band| band.geometry.unsigned_area())
        .sum();
    assert!((area - airspace.area()).abs() < 1e-6);

    // the peak is in the highest band
    let highest = elevations(&terrain.contours)
        .into_iter()
        .fold(f64::MIN, f64::max);
    assert!((highest - 1219.2).abs() < 1e-9);
}
