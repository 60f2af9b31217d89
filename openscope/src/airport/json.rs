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

//! The openScope airport file.
//!
//! Only the members needed for a project are read, all others are ignored:
//!
//! ```json
//! {
//!     "icao": "EGLL",
//!     "fixes": { "LAM": ["N51.64611", "E000.15167"] },
//!     "airspace": [
//!         { "floor": 0, "ceiling": 25, "airspace_class": "D", "poly": [["N51.5", "W000.5"], ...] }
//!     ],
//!     "restricted": [{ "name": "EG R157", "height": "2500ft", "coordinates": [[...], ...] }],
//!     "maps": [{ "name": "Runways", "lines": [["N51.5", "W000.5", "N51.5", "W000.4"], ...] }]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use super::{Airport, Airspace, Fix, Map, Restricted};
use crate::error::Error;
use crate::geom::codec::{external_to_point, external_to_polygon, external_to_polyline_set};
use crate::geom::CoordinateValue;

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub(crate) struct AirportFile {
    pub icao: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fixes: BTreeMap<String, Vec<CoordinateValue>>,
    #[serde(default)]
    pub airspace: Vec<AirspaceRecord>,
    #[serde(default)]
    pub restricted: Vec<RestrictedRecord>,
    #[serde(default)]
    pub maps: Vec<MapRecord>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub(crate) struct AirspaceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub floor: i32,
    pub ceiling: i32,
    pub airspace_class: String,
    pub poly: Vec<Vec<CoordinateValue>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub(crate) struct RestrictedRecord {
    pub name: String,
    #[serde(default)]
    pub height: String,
    pub coordinates: Vec<Vec<CoordinateValue>>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub(crate) struct MapRecord {
    pub name: String,
    pub lines: Vec<Vec<CoordinateValue>>,
}

fn is_false(b: &bool) -> bool {
    !b
}

impl TryFrom<AirportFile> for Airport {
    type Error = Error;

    fn try_from(file: AirportFile) -> Result<Self, Self::Error> {
        let fixes = file
            .fixes
            .into_iter()
            .map(|(name, location)| -> Result<Fix, Error> {
                Ok(Fix {
                    location: external_to_point(&location, 0)?,
                    name,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let airspace = file
            .airspace
            .into_iter()
            .map(|record| -> Result<Airspace, Error> {
                Ok(Airspace {
                    poly: external_to_polygon(&record.poly)?,
                    name: record.name,
                    airspace_class: record.airspace_class,
                    floor: record.floor,
                    ceiling: record.ceiling,
                    hidden: record.hidden,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let restricted = file
            .restricted
            .into_iter()
            .map(|record| -> Result<Restricted, Error> {
                Ok(Restricted {
                    coordinates: external_to_polygon(&record.coordinates)?,
                    name: record.name,
                    height: record.height,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let maps = file
            .maps
            .into_iter()
            .map(|record| -> Result<Map, Error> {
                Ok(Map {
                    lines: external_to_polyline_set(&record.lines)?,
                    name: record.name,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            icao: file.icao.to_uppercase(),
            name: file.name,
            fixes,
            airspace,
            restricted,
            maps,
        })
    }
}

impl Airport {
    /// Parses an openScope airport file.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidAirport`] if the JSON is malformed and
    /// with a parse error of the codec if a coordinate is malformed.
    pub fn from_json(s: &str) -> Result<Self, Error> {
        let file: AirportFile = serde_json::from_str(s)?;
        let airport = Self::try_from(file)?;

        debug!(
            "read airport {} with {} fixes and {} airspaces",
            airport.icao,
            airport.fixes.len(),
            airport.airspace.len()
        );

        Ok(airport)
    }

    /// Reads an openScope airport file.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let s = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airport::AirportModel;

    const EGLL: &str = r#"{
        "icao": "egll",
        "name": "London Heathrow",
        "magnetic_north": -1.9,
        "fixes": {
            "LAM": ["N51d38m46s", "E000d09m06s"],
            "BIG": ["N51.33083", "E000.03250"]
        },
        "airspace": [
            {
                "floor": 0,
                "ceiling": 25,
                "airspace_class": "D",
                "poly": [
                    ["N51.6", "W000.7"],
                    ["N51.6", "W000.2"],
                    ["N51.3", "W000.2"],
                    ["N51.3", "W000.7"],
                    ["N51.6", "W000.7"]
                ]
            },
            {
                "floor": 0,
                "ceiling": 100,
                "airspace_class": "A",
                "hidden": true,
                "poly": [[51.0, -1.0], [52.0, -1.0], [52.0, 0.0]]
            }
        ],
        "restricted": [
            {
                "name": "EG R157",
                "height": "2500ft",
                "coordinates": [["N51.5", "W000.1"], ["N51.51", "W000.1"], ["N51.51", "W000.09"]]
            }
        ],
        "maps": [
            {
                "name": "Runways",
                "lines": [
                    ["N51.4775", "W000.4850", "N51.4777", "W000.4333"],
                    ["N51.4647", "W000.4823", "N51.4650", "W000.4340", "N51.4700", "W000.4300"]
                ]
            }
        ]
    }"#;

    #[test]
    fn reads_airport_file() {
        let airport = Airport::from_json(EGLL).expect("airport should be valid");

        assert_eq!(airport.icao(), "EGLL");
        assert_eq!(airport.name(), Some("London Heathrow"));

        // fixes are sorted by name
        assert_eq!(airport.fixes()[0].name, "BIG");
        assert_eq!(airport.fixes()[1].name, "LAM");
        assert_eq!(airport.fixes()[0].location, coord!(51.33083, 0.0325));

        let visible = airport.airspace(false);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].airspace_class, "D");
        assert_eq!(visible[0].poly.0.len(), 4, "closing point is dropped");

        let hidden = airport.airspace(true);
        assert_eq!(hidden.len(), 1);
        assert_eq!(hidden[0].ceiling, 100);

        assert_eq!(airport.restricted()[0].height, "2500ft");
        assert_eq!(airport.maps()[0].lines.len(), 2);
        assert_eq!(airport.maps()[0].lines[1].0.len(), 3);
    }

    #[test]
    fn malformed_json_is_invalid_airport() {
        assert!(matches!(
            Airport::from_json(r#"{ "fixes": {} }"#),
            Err(Error::InvalidAirport { .. })
        ));
    }

    #[test]
    fn malformed_coordinate_is_reported() {
        let json = r#"{ "icao": "EGLL", "fixes": { "LAM": ["X51.5", "E000.1"] } }"#;

        assert_eq!(
            Airport::from_json(json),
            Err(Error::InvalidCoordinate {
                value: String::from("X51.5")
            })
        );
    }

    #[test]
    fn odd_map_line_is_reported() {
        let json = r#"{
            "icao": "EGLL",
            "maps": [{ "name": "Runways", "lines": [["N51.5", "W000.1", "N51.6"]] }]
        }"#;

        assert_eq!(
            Airport::from_json(json),
            Err(Error::OddPolylineLength { len: 3 })
        );
    }
}
