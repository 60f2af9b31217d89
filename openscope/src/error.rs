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

use std::error;
use std::fmt;
use std::path::PathBuf;

use crate::terrain::Stage;

/// The category of an [`Error`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorKind {
    /// Malformed external input (coordinate text, polyline arrays, airport files).
    Parse,
    /// A spatial or raster operation produced no usable output.
    Operation,
    /// Reference data or a working file is missing or unreadable.
    Resource,
    /// The pipeline was cancelled between two stages.
    Cancelled,
    /// The project context was used outside of its lifecycle.
    Project,
}

#[derive(Clone, PartialEq, Debug)]
pub enum Error {
    /// The coordinate text doesn't follow the hemisphere notation.
    InvalidCoordinate { value: String },
    /// A polyline array has an odd number of coordinate values.
    OddPolylineLength { len: usize },
    /// The airport file is not valid JSON or misses required members.
    InvalidAirport { error: String },
    /// A spatial operation failed in the backend.
    OperationFailed {
        operation: &'static str,
        reason: String,
    },
    /// A spatial operation returned no features.
    EmptyResult { operation: &'static str },
    /// A required file or directory doesn't exist.
    MissingResource { path: PathBuf },
    /// Reading or writing a working file failed.
    Io { path: PathBuf, error: String },
    /// The pipeline was cancelled before the stage could start.
    Cancelled { stage: Stage },
    /// The project was already closed.
    ProjectClosed,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCoordinate { .. }
            | Self::OddPolylineLength { .. }
            | Self::InvalidAirport { .. } => ErrorKind::Parse,
            Self::OperationFailed { .. } | Self::EmptyResult { .. } => ErrorKind::Operation,
            Self::MissingResource { .. } | Self::Io { .. } => ErrorKind::Resource,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::ProjectClosed => ErrorKind::Project,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, e: impl fmt::Display) -> Self {
        Self::Io {
            path: path.into(),
            error: e.to_string(),
        }
    }

    pub(crate) fn failed(operation: &'static str, reason: impl fmt::Display) -> Self {
        Self::OperationFailed {
            operation,
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCoordinate { value } => {
                write!(f, "cannot parse \"{value}\" as coordinate")
            }
            Self::OddPolylineLength { len } => {
                write!(f, "polyline should have an even number of values but has {len}")
            }
            Self::InvalidAirport { error } => write!(f, "invalid airport: {error}"),
            Self::OperationFailed { operation, reason } => {
                write!(f, "{operation} failed: {reason}")
            }
            Self::EmptyResult { operation } => write!(f, "{operation} returned no features"),
            Self::MissingResource { path } => {
                write!(f, "missing resource: {}", path.display())
            }
            Self::Io { path, error } => write!(f, "{}: {error}", path.display()),
            Self::Cancelled { stage } => write!(f, "cancelled before {stage}"),
            Self::ProjectClosed => write!(f, "project is closed"),
        }
    }
}

impl error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidAirport {
            error: e.to_string(),
        }
    }
}
