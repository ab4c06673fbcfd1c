use std::collections::BTreeMap;

use super::geo::GeoPoint;

/// OSM ids are kept verbatim as they appear in the payload.
pub type OsmId = String;

pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: OsmId,
    pub point: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Way {
    pub id: OsmId,
    pub node_refs: Vec<OsmId>,
    pub tags: Tags,
}

impl Way {
    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }

    /// A way whose first and last reference are the same node describes a ring.
    pub fn is_closed(&self) -> bool {
        self.node_refs.len() > 2 && self.node_refs.first() == self.node_refs.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl Bounds {
    pub fn min_corner(&self) -> GeoPoint {
        GeoPoint::new(self.min_lat, self.min_lon)
    }

    pub fn max_corner(&self) -> GeoPoint {
        GeoPoint::new(self.max_lat, self.max_lon)
    }
}
