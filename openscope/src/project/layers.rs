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

//! Builds the project layers from the airport and arranges them in groups.

use geo::{Polygon, Rect};

use crate::airport::{Airspace, Fix, Map, Restricted};
use crate::ops::{union_rect, Feature, VectorLayer};

pub const FIXES: &str = "Fixes";
pub const RESTRICTED: &str = "Restricted";
pub const AIRSPACE: &str = "Airspace";
pub const HIDDEN_AIRSPACE: &str = "Airspace (Hidden)";
pub const MAPS: &str = "Maps";
pub const TERRAIN: &str = "Terrain";

pub fn fixes_layer(fixes: &[Fix]) -> VectorLayer {
    VectorLayer::with_features(
        FIXES,
        fixes
            .iter()
            .map(|fix| Feature::new(fix.location).with_attribute("name", fix.name.as_str()))
            .collect(),
    )
}

/// Builds the visible or hidden airspace layer with the name, class, floor
/// and ceiling of every airspace.
pub fn airspace_layer(airspace: &[&Airspace], hidden: bool) -> VectorLayer {
    VectorLayer::with_features(
        if hidden { HIDDEN_AIRSPACE } else { AIRSPACE },
        airspace
            .iter()
            .map(|a| {
                Feature::new(Polygon::new(a.poly.clone(), vec![]))
                    .with_attribute("name", a.name.as_deref())
                    .with_attribute("airspace_class", a.airspace_class.as_str())
                    .with_attribute("floor", a.floor)
                    .with_attribute("ceiling", a.ceiling)
            })
            .collect(),
    )
}

pub fn restricted_layer(restricted: &[Restricted]) -> VectorLayer {
    VectorLayer::with_features(
        RESTRICTED,
        restricted
            .iter()
            .map(|r| {
                Feature::new(Polygon::new(r.coordinates.clone(), vec![]))
                    .with_attribute("name", r.name.as_str())
                    .with_attribute("height", r.height.as_str())
            })
            .collect(),
    )
}

/// Builds a layer named after the map with one feature per line.
pub fn map_layer(map: &Map) -> VectorLayer {
    VectorLayer::with_features(
        map.name.as_str(),
        map.lines.iter().cloned().map(Feature::new).collect(),
    )
}

/// A layer or a group of layers of the project's layer tree.
#[derive(Clone, PartialEq, Debug)]
pub enum Node {
    Layer(VectorLayer),
    Group(LayerGroup),
}

/// Named group of layers and nested groups.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct LayerGroup {
    name: String,
    children: Vec<Node>,
}

impl LayerGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn add_layer(&mut self, layer: VectorLayer) {
        self.children.push(Node::Layer(layer));
    }

    pub fn add_group(&mut self, group: LayerGroup) {
        self.children.push(Node::Group(group));
    }

    /// Returns all layers of the group and its subgroups depth first.
    pub fn layers(&self) -> Vec<&VectorLayer> {
        self.children
            .iter()
            .flat_map(|node| match node {
                Node::Layer(layer) => vec![layer],
                Node::Group(group) => group.layers(),
            })
            .collect()
    }

    /// Finds a layer by name in the group or its subgroups.
    pub fn layer(&self, name: &str) -> Option<&VectorLayer> {
        self.layers().into_iter().find(|layer| layer.name() == name)
    }

    /// Finds a group by name in the group or its subgroups.
    pub fn group(&self, name: &str) -> Option<&LayerGroup> {
        self.children.iter().find_map(|node| match node {
            Node::Group(group) if group.name == name => Some(group),
            Node::Group(group) => group.group(name),
            Node::Layer(_) => None,
        })
    }
}

/// The layer tree of a populated project.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct ProjectLayers {
    root: LayerGroup,
}

impl ProjectLayers {
    pub(crate) fn new(root: LayerGroup) -> Self {
        Self { root }
    }

    /// Returns the top level of the tree.
    pub fn nodes(&self) -> &[Node] {
        self.root.children()
    }

    pub fn layers(&self) -> Vec<&VectorLayer> {
        self.root.layers()
    }

    pub fn layer(&self, name: &str) -> Option<&VectorLayer> {
        self.root.layer(name)
    }

    pub fn group(&self, name: &str) -> Option<&LayerGroup> {
        self.root.group(name)
    }

    /// Returns the rectangle enclosing all layers. Empty layers are ignored.
    pub fn extent(&self) -> Option<Rect<f64>> {
        self.layers()
            .into_iter()
            .filter_map(VectorLayer::bounding_rect)
            .reduce(union_rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Value;

    fn airspace() -> Airspace {
        Airspace {
            name: Some(String::from("London CTR")),
            airspace_class: String::from("D"),
            floor: 0,
            ceiling: 25,
            poly: linestring![(51.3, -0.7), (51.6, -0.7), (51.6, -0.2), (51.3, -0.2)],
            hidden: false,
        }
    }

    #[test]
    fn airspace_carries_its_limits() {
        let a = airspace();
        let layer = airspace_layer(&[&a], false);

        assert_eq!(layer.name(), AIRSPACE);
        let feature = &layer.features()[0];
        assert_eq!(feature.attribute("floor"), Some(&Value::Integer(0)));
        assert_eq!(feature.attribute("ceiling"), Some(&Value::Integer(25)));
        assert_eq!(
            feature.attribute("name"),
            Some(&Value::Text(String::from("London CTR")))
        );
    }

    #[test]
    fn unnamed_airspace_has_null_name() {
        let a = Airspace {
            name: None,
            ..airspace()
        };
        let layer = airspace_layer(&[&a], true);

        assert_eq!(layer.name(), HIDDEN_AIRSPACE);
        assert_eq!(layer.features()[0].attribute("name"), Some(&Value::Null));
    }

    #[test]
    fn groups_are_searched_recursively() {
        let mut maps = LayerGroup::new(MAPS);
        maps.add_layer(VectorLayer::new("Runways"));
        let mut root = LayerGroup::default();
        root.add_layer(VectorLayer::new(FIXES));
        root.add_group(maps);
        root.add_group(LayerGroup::new(TERRAIN));
        let layers = ProjectLayers::new(root);

        assert!(layers.layer("Runways").is_some());
        assert!(layers.group(TERRAIN).is_some());
        assert_eq!(layers.layers().len(), 2);
        assert_eq!(layers.extent(), None);
    }

    #[test]
    fn extent_encloses_all_layers() {
        let a = airspace();
        let mut root = LayerGroup::default();
        root.add_layer(airspace_layer(&[&a], false));
        root.add_layer(fixes_layer(&[Fix {
            name: String::from("LAM"),
            location: coord!(51.64611, 0.15167),
        }]));

        let extent = ProjectLayers::new(root).extent().expect("layers have features");

        assert_eq!(extent.min().x, -0.7);
        assert_eq!(extent.max().x, 0.15167);
        assert_eq!(extent.max().y, 51.64611);
    }
}
