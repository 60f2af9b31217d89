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

//! Named spatial operations on vector and raster layers.
//!
//! An [`Operation`] carries its parameters and inputs, a [`Runner`]
//! dispatches it to a [`Backend`] and names the output deterministically
//! after the inputs and the operation. The [`GeoBackend`] implements all
//! operations in Rust. Other backends, e.g. test doubles returning canned
//! layers, can be plugged into the same runner.
//!
//! ```
//! use openscope::ops::{Feature, GeoBackend, Operation, Runner, VectorLayer};
//! use openscope::polygon;
//!
//! let airspace = VectorLayer::with_features(
//!     "Airspace",
//!     vec![Feature::new(polygon![(52.0, 0.0), (52.0, 1.0), (53.0, 1.0)])],
//! );
//!
//! let runner = Runner::new(GeoBackend);
//! let perimeter = runner
//!     .run(Operation::PolygonsToLines { input: &airspace })
//!     .and_then(|output| output.into_vector())
//!     .expect("airspace has a boundary");
//!
//! assert_eq!(perimeter.name(), "Airspace (polygons-to-lines)");
//! assert_eq!(perimeter.len(), 1);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::Error;

mod eliminate;
mod layer;
mod native;
mod polygonize;
pub mod raster;
pub(crate) mod vector;

pub(crate) use layer::union_rect;
pub use layer::{Feature, RasterLayer, Value, VectorLayer};
pub use native::GeoBackend;

/// Sink for the progress of long running raster operations.
///
/// Progress is advisory only and never changes the outcome of an operation.
pub trait Feedback {
    /// Reports the progress in percent.
    fn set_progress(&self, percent: f64);
}

impl<F> Feedback for F
where
    F: Fn(f64),
{
    fn set_progress(&self, percent: f64) {
        self(percent)
    }
}

/// Feedback that discards all progress.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoFeedback;

impl Feedback for NoFeedback {
    fn set_progress(&self, _percent: f64) {}
}

/// A spatial operation with its inputs and parameters.
#[derive(Clone, Copy, Debug)]
pub enum Operation<'a> {
    /// Converts polygon rings into lines.
    PolygonsToLines { input: &'a VectorLayer },
    /// Buffers every feature by the distance in degrees.
    Buffer {
        input: &'a VectorLayer,
        distance: f64,
    },
    /// Removes vertices closer than the tolerance to the simplified line.
    Simplify {
        input: &'a VectorLayer,
        tolerance: f64,
    },
    /// Concatenates the features of all layers.
    MergeVectorLayers { inputs: &'a [&'a VectorLayer] },
    /// Builds polygons from the faces of a line network.
    Polygonize { input: &'a VectorLayer },
    /// Merges polygons below the area into the neighbour with the longest
    /// shared boundary.
    EliminateSmallPolygons {
        input: &'a VectorLayer,
        min_area: f64,
    },
    /// Intersects every feature with the overlay.
    Clip {
        input: &'a VectorLayer,
        overlay: &'a VectorLayer,
    },
    /// Subtracts the overlay from every feature.
    Difference {
        input: &'a VectorLayer,
        overlay: &'a VectorLayer,
    },
    /// Splits multi geometries into one feature per part.
    MultipartToSinglepart { input: &'a VectorLayer },
    /// Mosaics raster tiles into the output file.
    RasterMerge {
        inputs: &'a [PathBuf],
        output: &'a Path,
    },
    /// Crops a raster to the mask and writes it to the output file.
    RasterClipByMask {
        input: &'a RasterLayer,
        mask: &'a VectorLayer,
        output: &'a Path,
    },
    /// Traces contour lines at multiples of the interval and writes them to
    /// the output file.
    RasterContour {
        input: &'a RasterLayer,
        interval: f64,
        output: &'a Path,
    },
    /// Attaches the mean raster value under every feature as `<prefix>mean`.
    ZonalStatistics {
        raster: &'a RasterLayer,
        input: &'a VectorLayer,
        prefix: &'a str,
    },
}

impl Operation<'_> {
    /// Returns the name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PolygonsToLines { .. } => "polygons-to-lines",
            Self::Buffer { .. } => "buffer",
            Self::Simplify { .. } => "simplify",
            Self::MergeVectorLayers { .. } => "merge-vector-layers",
            Self::Polygonize { .. } => "polygonize",
            Self::EliminateSmallPolygons { .. } => "eliminate-small-polygons",
            Self::Clip { .. } => "clip",
            Self::Difference { .. } => "difference",
            Self::MultipartToSinglepart { .. } => "multipart-to-singlepart",
            Self::RasterMerge { .. } => "raster-merge",
            Self::RasterClipByMask { .. } => "raster-clip-by-mask",
            Self::RasterContour { .. } => "raster-contour",
            Self::ZonalStatistics { .. } => "zonal-statistics",
        }
    }

    /// Returns the name of the operation's output.
    ///
    /// Vector outputs are named after their input and the operation, raster
    /// outputs after the file they are written to.
    pub fn output_name(&self) -> String {
        let input = match self {
            Self::PolygonsToLines { input }
            | Self::Buffer { input, .. }
            | Self::Simplify { input, .. }
            | Self::Polygonize { input }
            | Self::EliminateSmallPolygons { input, .. }
            | Self::Clip { input, .. }
            | Self::Difference { input, .. }
            | Self::MultipartToSinglepart { input }
            | Self::ZonalStatistics { input, .. } => input.name().to_string(),
            Self::MergeVectorLayers { inputs } => inputs
                .iter()
                .map(|layer| layer.name())
                .collect::<Vec<_>>()
                .join(" + "),
            Self::RasterMerge { output, .. }
            | Self::RasterClipByMask { output, .. }
            | Self::RasterContour { output, .. } => match output.file_stem() {
                Some(stem) => stem.to_string_lossy().into_owned(),
                None => return self.name().to_string(),
            },
        };

        format!("{input} ({})", self.name())
    }
}

impl fmt::Display for Operation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The result of an [`Operation`].
#[derive(Clone, PartialEq, Debug)]
pub enum Output {
    Vector(VectorLayer),
    Raster(RasterLayer),
}

impl Output {
    pub fn name(&self) -> &str {
        match self {
            Self::Vector(layer) => layer.name(),
            Self::Raster(layer) => layer.name(),
        }
    }

    pub fn into_vector(self) -> Result<VectorLayer, Error> {
        match self {
            Self::Vector(layer) => Ok(layer),
            Self::Raster(layer) => Err(Error::OperationFailed {
                operation: "output",
                reason: format!("expected vector layer but {} is a raster", layer.name()),
            }),
        }
    }

    pub fn into_raster(self) -> Result<RasterLayer, Error> {
        match self {
            Self::Raster(layer) => Ok(layer),
            Self::Vector(layer) => Err(Error::OperationFailed {
                operation: "output",
                reason: format!("expected raster layer but {} is a vector", layer.name()),
            }),
        }
    }
}

/// Capability interface of a geoprocessing engine.
///
/// Implementations return the output without caring about its name; the
/// [`Runner`] takes care of the naming.
pub trait Backend {
    fn polygons_to_lines(&self, input: &VectorLayer) -> Result<VectorLayer, Error>;

    fn buffer(&self, input: &VectorLayer, distance: f64) -> Result<VectorLayer, Error>;

    fn simplify(&self, input: &VectorLayer, tolerance: f64) -> Result<VectorLayer, Error>;

    fn merge_vector_layers(&self, inputs: &[&VectorLayer]) -> Result<VectorLayer, Error>;

    fn polygonize(&self, input: &VectorLayer) -> Result<VectorLayer, Error>;

    fn eliminate_small_polygons(
        &self,
        input: &VectorLayer,
        min_area: f64,
    ) -> Result<VectorLayer, Error>;

    fn clip(&self, input: &VectorLayer, overlay: &VectorLayer) -> Result<VectorLayer, Error>;

    fn difference(&self, input: &VectorLayer, overlay: &VectorLayer)
        -> Result<VectorLayer, Error>;

    fn multipart_to_singlepart(&self, input: &VectorLayer) -> Result<VectorLayer, Error>;

    fn raster_merge(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        feedback: &dyn Feedback,
    ) -> Result<RasterLayer, Error>;

    fn raster_clip_by_mask(
        &self,
        input: &RasterLayer,
        mask: &VectorLayer,
        output: &Path,
    ) -> Result<RasterLayer, Error>;

    fn raster_contour(
        &self,
        input: &RasterLayer,
        interval: f64,
        output: &Path,
        feedback: &dyn Feedback,
    ) -> Result<VectorLayer, Error>;

    fn zonal_statistics(
        &self,
        raster: &RasterLayer,
        input: &VectorLayer,
        prefix: &str,
    ) -> Result<VectorLayer, Error>;
}

impl<T: Backend + ?Sized> Backend for &T {
    fn polygons_to_lines(&self, input: &VectorLayer) -> Result<VectorLayer, Error> {
        (**self).polygons_to_lines(input)
    }

    fn buffer(&self, input: &VectorLayer, distance: f64) -> Result<VectorLayer, Error> {
        (**self).buffer(input, distance)
    }

    fn simplify(&self, input: &VectorLayer, tolerance: f64) -> Result<VectorLayer, Error> {
        (**self).simplify(input, tolerance)
    }

    fn merge_vector_layers(&self, inputs: &[&VectorLayer]) -> Result<VectorLayer, Error> {
        (**self).merge_vector_layers(inputs)
    }

    fn polygonize(&self, input: &VectorLayer) -> Result<VectorLayer, Error> {
        (**self).polygonize(input)
    }

    fn eliminate_small_polygons(
        &self,
        input: &VectorLayer,
        min_area: f64,
    ) -> Result<VectorLayer, Error> {
        (**self).eliminate_small_polygons(input, min_area)
    }

    fn clip(&self, input: &VectorLayer, overlay: &VectorLayer) -> Result<VectorLayer, Error> {
        (**self).clip(input, overlay)
    }

    fn difference(&self, input: &VectorLayer, overlay: &VectorLayer)
        -> Result<VectorLayer, Error> {
        (**self).difference(input, overlay)
    }

    fn multipart_to_singlepart(&self, input: &VectorLayer) -> Result<VectorLayer, Error> {
        (**self).multipart_to_singlepart(input)
    }

    fn raster_merge(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        feedback: &dyn Feedback,
    ) -> Result<RasterLayer, Error> {
        (**self).raster_merge(inputs, output, feedback)
    }

    fn raster_clip_by_mask(
        &self,
        input: &RasterLayer,
        mask: &VectorLayer,
        output: &Path,
    ) -> Result<RasterLayer, Error> {
        (**self).raster_clip_by_mask(input, mask, output)
    }

    fn raster_contour(
        &self,
        input: &RasterLayer,
        interval: f64,
        output: &Path,
        feedback: &dyn Feedback,
    ) -> Result<VectorLayer, Error> {
        (**self).raster_contour(input, interval, output, feedback)
    }

    fn zonal_statistics(
        &self,
        raster: &RasterLayer,
        input: &VectorLayer,
        prefix: &str,
    ) -> Result<VectorLayer, Error> {
        (**self).zonal_statistics(raster, input, prefix)
    }
}

/// Dispatches operations to a backend.
#[derive(Clone, Debug, Default)]
pub struct Runner<B> {
    backend: B,
}

impl<B: Backend> Runner<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Runs the operation without progress feedback.
    pub fn run(&self, operation: Operation<'_>) -> Result<Output, Error> {
        self.run_with_feedback(operation, &NoFeedback)
    }

    /// Runs the operation and reports the progress of raster operations to
    /// the feedback.
    pub fn run_with_feedback(
        &self,
        operation: Operation<'_>,
        feedback: &dyn Feedback,
    ) -> Result<Output, Error> {
        debug!("running {operation}");
        let b = &self.backend;

        let output = match operation {
            Operation::PolygonsToLines { input } => Output::Vector(b.polygons_to_lines(input)?),
            Operation::Buffer { input, distance } => Output::Vector(b.buffer(input, distance)?),
            Operation::Simplify { input, tolerance } => {
                Output::Vector(b.simplify(input, tolerance)?)
            }
            Operation::MergeVectorLayers { inputs } => {
                Output::Vector(b.merge_vector_layers(inputs)?)
            }
            Operation::Polygonize { input } => Output::Vector(b.polygonize(input)?),
            Operation::EliminateSmallPolygons { input, min_area } => {
                Output::Vector(b.eliminate_small_polygons(input, min_area)?)
            }
            Operation::Clip { input, overlay } => Output::Vector(b.clip(input, overlay)?),
            Operation::Difference { input, overlay } => {
                Output::Vector(b.difference(input, overlay)?)
            }
            Operation::MultipartToSinglepart { input } => {
                Output::Vector(b.multipart_to_singlepart(input)?)
            }
            Operation::RasterMerge { inputs, output } => {
                Output::Raster(b.raster_merge(inputs, output, feedback)?)
            }
            Operation::RasterClipByMask {
                input,
                mask,
                output,
            } => Output::Raster(b.raster_clip_by_mask(input, mask, output)?),
            Operation::RasterContour {
                input,
                interval,
                output,
            } => Output::Vector(b.raster_contour(input, interval, output, feedback)?),
            Operation::ZonalStatistics {
                raster,
                input,
                prefix,
            } => Output::Vector(b.zonal_statistics(raster, input, prefix)?),
        };

        let name = operation.output_name();
        let output = match output {
            Output::Vector(layer) => {
                debug!("{operation} returned {} features", layer.len());
                Output::Vector(layer.renamed(name))
            }
            Output::Raster(layer) => {
                debug!("{operation} wrote {}", layer.path().display());
                Output::Raster(layer.renamed(name))
            }
        };

        Ok(output)
    }
}
