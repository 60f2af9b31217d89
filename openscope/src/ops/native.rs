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

use std::path::{Path, PathBuf};

use geo::MultiLineString;
use log::{debug, warn};

use super::raster::{self, Grid};
use super::vector::{self, as_multi_line_string, as_multi_polygon};
use super::{eliminate, polygonize};
use super::{Backend, Feature, Feedback, RasterLayer, VectorLayer};
use crate::error::Error;

/// Geoprocessing backend built on the `geo` crate.
///
/// Vector operations are pure and keep the attributes of their input
/// features. Raster operations read and write GeoTIFF files.
#[derive(Copy, Clone, Debug, Default)]
pub struct GeoBackend;

impl Backend for GeoBackend {
    fn polygons_to_lines(&self, input: &VectorLayer) -> Result<VectorLayer, Error> {
        Ok(VectorLayer::with_features(
            input.name(),
            vector::polygons_to_lines(input),
        ))
    }

    fn buffer(&self, input: &VectorLayer, distance: f64) -> Result<VectorLayer, Error> {
        if !distance.is_finite() {
            return Err(Error::failed("buffer", format!("invalid distance {distance}")));
        }

        Ok(VectorLayer::with_features(
            input.name(),
            vector::buffer(input, distance),
        ))
    }

    fn simplify(&self, input: &VectorLayer, tolerance: f64) -> Result<VectorLayer, Error> {
        if tolerance.is_nan() || tolerance < 0.0 {
            return Err(Error::failed(
                "simplify",
                format!("invalid tolerance {tolerance}"),
            ));
        }

        Ok(VectorLayer::with_features(
            input.name(),
            vector::simplify(input, tolerance),
        ))
    }

    fn merge_vector_layers(&self, inputs: &[&VectorLayer]) -> Result<VectorLayer, Error> {
        Ok(VectorLayer::with_features("merged", vector::merge(inputs)))
    }

    fn polygonize(&self, input: &VectorLayer) -> Result<VectorLayer, Error> {
        let lines: Vec<MultiLineString<f64>> = input
            .features()
            .iter()
            .filter_map(|feature| as_multi_line_string(&feature.geometry))
            .collect();

        let features = polygonize::polygonize(&lines)
            .into_iter()
            .map(Feature::new)
            .collect();

        Ok(VectorLayer::with_features(input.name(), features))
    }

    fn eliminate_small_polygons(
        &self,
        input: &VectorLayer,
        min_area: f64,
    ) -> Result<VectorLayer, Error> {
        Ok(VectorLayer::with_features(
            input.name(),
            eliminate::eliminate(input, min_area),
        ))
    }

    fn clip(&self, input: &VectorLayer, overlay: &VectorLayer) -> Result<VectorLayer, Error> {
        Ok(VectorLayer::with_features(
            input.name(),
            vector::clip(input, overlay),
        ))
    }

    fn difference(
        &self,
        input: &VectorLayer,
        overlay: &VectorLayer,
    ) -> Result<VectorLayer, Error> {
        Ok(VectorLayer::with_features(
            input.name(),
            vector::difference(input, overlay),
        ))
    }

    fn multipart_to_singlepart(&self, input: &VectorLayer) -> Result<VectorLayer, Error> {
        Ok(VectorLayer::with_features(
            input.name(),
            vector::multipart_to_singlepart(input),
        ))
    }

    fn raster_merge(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        feedback: &dyn Feedback,
    ) -> Result<RasterLayer, Error> {
        let mut grids = Vec::with_capacity(inputs.len());
        for (i, path) in inputs.iter().enumerate() {
            grids.push(Grid::read(path)?);
            // reading dominates the merge
            feedback.set_progress(90.0 * (i + 1) as f64 / inputs.len() as f64);
        }

        let merged = raster::merge(&grids).ok_or(Error::EmptyResult {
            operation: "raster-merge",
        })?;
        debug!(
            "merged {} tiles into {}x{} grid",
            grids.len(),
            merged.width(),
            merged.height()
        );

        merged.write(output)?;
        feedback.set_progress(100.0);

        Ok(RasterLayer::new("merged", output))
    }

    fn raster_clip_by_mask(
        &self,
        input: &RasterLayer,
        mask: &VectorLayer,
        output: &Path,
    ) -> Result<RasterLayer, Error> {
        let grid = Grid::read(input.path())?;
        let mask = vector::dissolve(mask);

        let clipped = raster::clip_by_mask(&grid, &mask).ok_or(Error::EmptyResult {
            operation: "raster-clip-by-mask",
        })?;
        clipped.write(output)?;

        Ok(RasterLayer::new("clipped", output))
    }

    fn raster_contour(
        &self,
        input: &RasterLayer,
        interval: f64,
        output: &Path,
        feedback: &dyn Feedback,
    ) -> Result<VectorLayer, Error> {
        if interval.is_nan() || interval <= 0.0 {
            return Err(Error::failed(
                "raster-contour",
                format!("interval must be positive but is {interval}"),
            ));
        }

        let grid = Grid::read(input.path())?;
        let features = raster::contours(&grid, interval, |p| feedback.set_progress(p))
            .into_iter()
            .enumerate()
            .map(|(id, (level, line))| {
                Feature::new(line)
                    .with_attribute("ID", id as i64)
                    .with_attribute("ELEV", level)
            })
            .collect();

        let layer = VectorLayer::with_features("contours", features);
        layer.write_geojson(output)?;

        Ok(layer)
    }

    fn zonal_statistics(
        &self,
        raster: &RasterLayer,
        input: &VectorLayer,
        prefix: &str,
    ) -> Result<VectorLayer, Error> {
        let grid = Grid::read(raster.path())?;
        let attribute = format!("{prefix}mean");

        let features = input
            .features()
            .iter()
            .map(|feature| {
                let mean = as_multi_polygon(&feature.geometry)
                    .and_then(|polygon| raster::zonal_mean(&grid, &polygon));
                if mean.is_none() {
                    warn!("no raster cell inside feature of {}", input.name());
                }
                feature.clone().with_attribute(&attribute, mean)
            })
            .collect();

        Ok(VectorLayer::with_features(input.name(), features))
    }
}
