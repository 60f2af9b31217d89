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

//! Derivation of water and contour bands from an airspace and an elevation
//! model.
//!
//! The [`TerrainPipeline`] runs five strictly sequential [`Stage`]s:
//!
//! 1. The airspace's perimeter and a buffer around it are derived.
//! 2. The elevation tiles below the buffer are merged, clipped to the buffer
//!    and contoured.
//! 3. Open water and lakes are extracted from the GSHHS reference data.
//! 4. The contour lines are cut by the perimeter into polygon bands which
//!    are cleaned from slivers.
//! 5. Every band is normalized to the contour interval below its mean
//!    elevation.
//!
//! Every intermediate layer is owned by a single run. Any failing stage
//! aborts the run and no partial terrain is returned.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, trace};

use crate::config::Config;
use crate::error::Error;
use crate::ops::{
    Backend, Feedback, NoFeedback, Operation, RasterLayer, Runner, Value, VectorLayer,
};

pub mod dem;
mod output;

pub use dem::{DemLocator, TileDirectory};
use output::OutputFile;

/// Prefix of the zonal statistics attributes.
const STATS_PREFIX: &str = "_";

/// Attribute holding the mean elevation of a contour band.
pub const MEAN: &str = "_mean";

/// Attribute holding the normalized elevation of water and contour bands.
pub const ELEVATION: &str = "elevation";

pub const MERGED_FILE: &str = "Elevation - Merged.tif";
pub const CLIPPED_FILE: &str = "Elevation - Clipped.tif";
pub const CONTOURS_FILE: &str = "Contours.geojson";

/// The stages of the [`TerrainPipeline`] in the order they run.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Stage {
    Boundary,
    Elevation,
    Water,
    Contours,
    Normalization,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Boundary => "perimeter and buffer",
            Self::Elevation => "elevation acquisition",
            Self::Water => "water extraction",
            Self::Contours => "contour cleanup",
            Self::Normalization => "normalization",
        };
        write!(f, "{s}")
    }
}

/// Requests a running pipeline to stop before its next stage.
///
/// Clones share the same state, so the token can be handed to another
/// thread while the pipeline runs.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The terrain layers of an airspace.
#[derive(Clone, PartialEq, Debug)]
pub struct Terrain {
    /// Sea and lakes, all at an elevation of 0.
    pub water: VectorLayer,
    /// Contour bands with their normalized elevation.
    pub contours: VectorLayer,
}

/// Anything that derives the terrain of an airspace.
pub trait TerrainSource {
    fn terrain(&self, airspace: &VectorLayer, work_dir: &Path) -> Result<Terrain, Error>;
}

/// Outputs of the [`Stage::Boundary`].
struct Bounds {
    perimeter: VectorLayer,
    buffer: VectorLayer,
}

/// Outputs of the [`Stage::Elevation`].
struct Elevation {
    raster: RasterLayer,
    contours: VectorLayer,
}

/// Derives water and contour bands of an airspace.
pub struct TerrainPipeline<'a, B, D> {
    runner: Runner<B>,
    locator: D,
    config: Config,
    feedback: &'a dyn Feedback,
    cancellation: Option<CancellationToken>,
}

impl<'a, B, D> TerrainPipeline<'a, B, D>
where
    B: Backend,
    D: DemLocator,
{
    pub fn new(backend: B, locator: D, config: Config) -> Self {
        Self {
            runner: Runner::new(backend),
            locator,
            config,
            feedback: &NoFeedback,
            cancellation: None,
        }
    }

    /// Reports the progress of the raster operations to the feedback.
    pub fn with_feedback(mut self, feedback: &'a dyn Feedback) -> Self {
        self.feedback = feedback;
        self
    }

    /// Checks the token before every stage.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs all stages on the airspace, writing the raster files into the
    /// working directory.
    pub fn run(&self, airspace: &VectorLayer, work_dir: &Path) -> Result<Terrain, Error> {
        let interval = self.config.contour_interval;
        if interval.is_nan() || interval <= 0.0 {
            return Err(Error::failed(
                "raster-contour",
                format!("interval must be positive but is {interval}"),
            ));
        }

        if airspace.is_empty() {
            return Err(Error::EmptyResult {
                operation: "polygons-to-lines",
            });
        }

        info!(
            "deriving terrain of {} in {}",
            airspace.name(),
            work_dir.display()
        );

        let bounds = self.stage(Stage::Boundary, || self.boundary(airspace))?;
        let elevation = self.stage(Stage::Elevation, || self.elevation(&bounds, work_dir))?;
        let water = self.stage(Stage::Water, || self.water(airspace, &bounds))?;
        let bands = self.stage(Stage::Contours, || {
            self.contours(airspace, &bounds, &elevation)
        })?;
        let contours = self.stage(Stage::Normalization, || {
            self.normalization(&bands, &elevation)
        })?;

        info!(
            "terrain has {} water and {} contour features",
            water.len(),
            contours.len()
        );

        Ok(Terrain { water, contours })
    }

    fn stage<T>(
        &self,
        stage: Stage,
        f: impl FnOnce() -> Result<T, Error>,
    ) -> Result<T, Error> {
        if self
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            info!("cancelled before {stage}");
            return Err(Error::Cancelled { stage });
        }

        info!("starting {stage}");
        let output = f()?;
        debug!("finished {stage}");
        Ok(output)
    }

    fn vector(&self, operation: Operation<'_>) -> Result<VectorLayer, Error> {
        self.runner
            .run_with_feedback(operation, self.feedback)?
            .into_vector()
    }

    /// Runs the operation and fails if it returns no features.
    fn require(&self, operation: Operation<'_>) -> Result<VectorLayer, Error> {
        let layer = self.vector(operation)?;
        if layer.is_empty() {
            return Err(Error::EmptyResult {
                operation: operation.name(),
            });
        }
        Ok(layer)
    }

    fn boundary(&self, airspace: &VectorLayer) -> Result<Bounds, Error> {
        let perimeter = self
            .require(Operation::PolygonsToLines { input: airspace })?
            .renamed("Perimeter");

        let buffer = self
            .require(Operation::Buffer {
                input: airspace,
                distance: self.config.buffer_distance,
            })?
            .renamed("Buffer");

        Ok(Bounds { perimeter, buffer })
    }

    fn elevation(&self, bounds: &Bounds, work_dir: &Path) -> Result<Elevation, Error> {
        let tiles = self.locator.resolve(&bounds.buffer.polygons())?;
        if tiles.is_empty() {
            return Err(Error::EmptyResult {
                operation: "raster-merge",
            });
        }
        debug!("merging {} elevation tiles", tiles.len());

        let file = OutputFile::acquire(work_dir, MERGED_FILE)?;
        let merged = self
            .runner
            .run_with_feedback(
                Operation::RasterMerge {
                    inputs: &tiles,
                    output: file.path(),
                },
                self.feedback,
            )?
            .into_raster()?;
        file.finish()?;

        let file = OutputFile::acquire(work_dir, CLIPPED_FILE)?;
        let clipped = self
            .runner
            .run(Operation::RasterClipByMask {
                input: &merged,
                mask: &bounds.buffer,
                output: file.path(),
            })?
            .into_raster()?;
        file.finish()?;

        // low terrain may not reach the first contour
        let file = OutputFile::acquire(work_dir, CONTOURS_FILE)?;
        let contours = self.vector(Operation::RasterContour {
            input: &clipped,
            interval: self.config.contour_interval,
            output: file.path(),
        })?;
        file.finish()?;

        Ok(Elevation {
            raster: clipped,
            contours,
        })
    }

    fn water(&self, airspace: &VectorLayer, bounds: &Bounds) -> Result<VectorLayer, Error> {
        let coastline = self.config.coastline_path()?;
        let lakes = self.config.lakes_path()?;
        let min_area = self.config.water_min_area;

        let coastline = VectorLayer::read_geojson(&coastline, "Coastline")?;
        let lakes = VectorLayer::read_geojson(&lakes, "Lakes")?;

        let coastline = self.vector(Operation::Clip {
            input: &coastline,
            overlay: &bounds.buffer,
        })?;
        let lakes = self.vector(Operation::Clip {
            input: &lakes,
            overlay: &bounds.buffer,
        })?;

        let land = self
            .vector(Operation::Simplify {
                input: &coastline,
                tolerance: self.config.simplify_tolerance,
            })?
            .without_smaller_than(min_area);

        let sea = self.vector(Operation::Difference {
            input: &bounds.buffer,
            overlay: &land,
        })?;
        let water = self.vector(Operation::MergeVectorLayers {
            inputs: &[&sea, &lakes],
        })?;
        let water = self.vector(Operation::Clip {
            input: &water,
            overlay: airspace,
        })?;
        let water = self
            .vector(Operation::MultipartToSinglepart { input: &water })?
            .without_smaller_than(min_area);

        Ok(water.with_attribute(ELEVATION, 0.0).renamed("Water"))
    }

    fn contours(
        &self,
        airspace: &VectorLayer,
        bounds: &Bounds,
        elevation: &Elevation,
    ) -> Result<VectorLayer, Error> {
        let min_area = self.config.contour_min_area;

        let simplified = self.vector(Operation::Simplify {
            input: &elevation.contours,
            tolerance: self.config.simplify_tolerance,
        })?;
        let network = self.vector(Operation::MergeVectorLayers {
            inputs: &[&simplified, &bounds.perimeter],
        })?;
        let faces = self.require(Operation::Polygonize { input: &network })?;

        // slivers without a neighbour to merge into survive the elimination
        let cleaned = self
            .vector(Operation::EliminateSmallPolygons {
                input: &faces,
                min_area,
            })?
            .without_smaller_than(min_area);

        let clipped = self.require(Operation::Clip {
            input: &cleaned,
            overlay: airspace,
        })?;

        self.require(Operation::MultipartToSinglepart { input: &clipped })
    }

    fn normalization(
        &self,
        bands: &VectorLayer,
        elevation: &Elevation,
    ) -> Result<VectorLayer, Error> {
        let stats = self.vector(Operation::ZonalStatistics {
            raster: &elevation.raster,
            input: bands,
            prefix: STATS_PREFIX,
        })?;

        Ok(normalize(&stats, self.config.contour_interval).renamed("Contours - Final"))
    }
}

impl<B, D> TerrainSource for TerrainPipeline<'_, B, D>
where
    B: Backend,
    D: DemLocator,
{
    fn terrain(&self, airspace: &VectorLayer, work_dir: &Path) -> Result<Terrain, Error> {
        self.run(airspace, work_dir)
    }
}

/// Drops the bands with a mean elevation below one interval and snaps the
/// others down to a multiple of the interval.
///
/// The normalized elevation is never above the band's mean and never
/// negative.
pub fn normalize(bands: &VectorLayer, interval: f64) -> VectorLayer {
    let features = bands
        .features()
        .iter()
        .filter_map(|band| {
            let mean = band.attribute(MEAN).and_then(Value::as_f64)?;
            if mean < interval {
                trace!("dropping band with mean elevation {mean}");
                return None;
            }

            let elevation = (mean / interval).floor() * interval;
            Some(band.clone().with_attribute(ELEVATION, elevation))
        })
        .collect();

    VectorLayer::with_features(bands.name(), features)
}
