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

//! Builds openScope airport projects.
//!
//! An openScope airport is read into an [`airport::Airport`] from which a
//! [`Project`] assembles layers for fixes, airspace, restricted areas and
//! reference maps. The terrain below the airspace is derived by the
//! [`terrain::TerrainPipeline`] from an elevation model and the GSHHS
//! coastline, using the spatial operations of the [`ops`] module.
//!
//! Coordinates in airport files are written as hemisphere prefixed text,
//! e.g. `N51d28m39s` or `W000.46139`. The [`geom::codec`] converts between
//! this notation and the `geo` types used throughout the crate. Note that
//! airport files write `[lat, lng]` while `geo` points are `(x = lng, y = lat)`.

#[macro_use]
mod macros;

pub mod airport;
mod config;
mod error;
pub mod geom;
pub mod ops;
pub mod project;
pub mod terrain;

pub use config::Config;
pub use error::{Error, ErrorKind};
pub use project::Project;

pub mod prelude {
    pub use crate::airport::{Airport, AirportModel};
    pub use crate::geom::CoordinateValue;
    pub use crate::ops::{Backend, Feature, GeoBackend, Operation, Runner, VectorLayer};
    pub use crate::terrain::{CancellationToken, TerrainPipeline, TileDirectory};
    pub use crate::{Config, Error, Project};
}
