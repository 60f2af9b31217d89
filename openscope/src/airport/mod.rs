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

//! The airport an openScope project is built from.
//!
//! Geometry is held the way the [codec](crate::geom::codec) reads it: points
//! with `x = lng` and `y = lat`, polygons as open rings.

use geo::{LineString, Point};

mod json;

pub(crate) use json::{AirportFile, AirspaceRecord, MapRecord, RestrictedRecord};

/// A named navigation fix.
#[derive(Clone, PartialEq, Debug)]
pub struct Fix {
    pub name: String,
    pub location: Point<f64>,
}

/// A volume of controlled airspace.
#[derive(Clone, PartialEq, Debug)]
pub struct Airspace {
    pub name: Option<String>,
    pub airspace_class: String,
    /// Lower limit as flight level.
    pub floor: i32,
    /// Upper limit as flight level.
    pub ceiling: i32,
    /// The lateral boundary as open ring.
    pub poly: LineString<f64>,
    /// Hidden airspace is not shown to the controller.
    pub hidden: bool,
}

/// A restricted area.
#[derive(Clone, PartialEq, Debug)]
pub struct Restricted {
    pub name: String,
    /// Height as written in the airport file, e.g. `5000ft`.
    pub height: String,
    /// The boundary as open ring.
    pub coordinates: LineString<f64>,
}

/// A reference map drawn as lines, e.g. the runway layout.
#[derive(Clone, PartialEq, Debug)]
pub struct Map {
    pub name: String,
    pub lines: Vec<LineString<f64>>,
}

/// Read access to an airport.
pub trait AirportModel {
    /// The ICAO code of the airport.
    fn icao(&self) -> &str;

    fn fixes(&self) -> &[Fix];

    /// Returns either the visible or the hidden airspace.
    fn airspace(&self, hidden: bool) -> Vec<&Airspace>;

    fn restricted(&self) -> &[Restricted];

    fn maps(&self) -> &[Map];
}

/// An airport read from an openScope airport file.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Airport {
    icao: String,
    name: Option<String>,
    fixes: Vec<Fix>,
    airspace: Vec<Airspace>,
    restricted: Vec<Restricted>,
    maps: Vec<Map>,
}

impl Airport {
    pub fn new(icao: impl Into<String>) -> Self {
        Self {
            icao: icao.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fixes.push(fix);
        self
    }

    pub fn with_airspace(mut self, airspace: Airspace) -> Self {
        self.airspace.push(airspace);
        self
    }

    pub fn with_restricted(mut self, restricted: Restricted) -> Self {
        self.restricted.push(restricted);
        self
    }

    pub fn with_map(mut self, map: Map) -> Self {
        self.maps.push(map);
        self
    }
}

impl AirportModel for Airport {
    fn icao(&self) -> &str {
        &self.icao
    }

    fn fixes(&self) -> &[Fix] {
        &self.fixes
    }

    fn airspace(&self, hidden: bool) -> Vec<&Airspace> {
        self.airspace
            .iter()
            .filter(|airspace| airspace.hidden == hidden)
            .collect()
    }

    fn restricted(&self) -> &[Restricted] {
        &self.restricted
    }

    fn maps(&self) -> &[Map] {
        &self.maps
    }
}
