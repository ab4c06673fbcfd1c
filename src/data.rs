use std::collections::HashMap;

use self::osm::{Bounds, Node, OsmId, Way};

pub mod geo;
pub mod osm;
pub mod scene;
pub mod semantic;

/// Map data as defined in the .osm payload. Relations are discarded, everything
/// else is kept without any processing.
#[derive(Debug, Default, Clone)]
pub struct OsmMapData {
    pub bounds: Bounds,
    pub nodes: HashMap<OsmId, Node>,
    pub ways: Vec<Way>,
}

impl OsmMapData {
    /// Resolves the node references of `way`, in order. A reference to a node
    /// missing from the payload fails the whole way.
    pub fn resolve_way<'a>(
        &'a self,
        way: &Way,
    ) -> Result<Vec<&'a Node>, crate::errors::ParseError> {
        way.node_refs
            .iter()
            .map(|node_ref| {
                self.nodes.get(node_ref).ok_or_else(|| {
                    crate::errors::ParseError::DanglingReference {
                        way: way.id.clone(),
                        node: node_ref.clone(),
                    }
                })
            })
            .collect()
    }
}
