use std::sync::OnceLock;

use log::{debug, info, warn};
use regex::Regex;

use crate::{
    data::{
        geo::{GeoPoint, PlanePoint},
        osm::{Tags, Way},
        semantic::{Classification, ClassifiedWay, LandUseKind},
        OsmMapData,
    },
    elevation::{elevation_key, ElevationClient},
    errors::ParseError,
    progress::Progress,
    projection::TransverseMercator,
};

use super::STATUS_TRANSFORMING;

/// Storey height assumed when only `building:levels` is known.
pub const METRES_PER_LEVEL: f64 = 3.0;

fn leading_number(value: &str) -> Option<f64> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| Regex::new(r"^\s*(?<number>[0-9]+(?:\.[0-9]+)?)").unwrap());
    re.captures(value)?.name("number")?.as_str().parse().ok()
}

/// Height in metres from `building:height`, else `building:levels`, else 0.
pub fn building_height(tags: &Tags) -> f64 {
    if let Some(height) = tags.get("building:height").and_then(|v| leading_number(v)) {
        return height;
    }
    if let Some(levels) = tags.get("building:levels").and_then(|v| leading_number(v)) {
        return levels * METRES_PER_LEVEL;
    }
    0.0
}

/// First match wins: building, then landuse, then highway.
pub fn classify(tags: &Tags) -> Classification {
    if tags.contains_key("building") {
        Classification::Building {
            height: building_height(tags),
        }
    } else if let Some(landuse) = tags.get("landuse") {
        Classification::LandUse(LandUseKind::from_tag(landuse))
    } else if tags.contains_key("highway") {
        Classification::Highway
    } else {
        Classification::Untagged
    }
}

/// Capitalises the first letter of every alphabetic run: `primary_link`
/// becomes `Primary_Link`.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous_alphabetic = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if previous_alphabetic {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_alphabetic = true;
        } else {
            out.push(c);
            previous_alphabetic = false;
        }
    }
    out
}

/// Label of the scene object built from a way. Not unique.
pub fn display_name(tags: &Tags, classification: &Classification) -> String {
    if let Some(name) = tags.get("name").filter(|v| !v.is_empty()) {
        return name.clone();
    }
    if let Some(reference) = tags.get("ref").filter(|v| !v.is_empty()) {
        return reference.clone();
    }
    let family = match classification {
        Classification::Building { .. } => Some("building"),
        Classification::LandUse(_) => Some("landuse"),
        Classification::Highway => Some("highway"),
        Classification::Untagged => None,
    };
    if let Some(family) = family {
        return match tags.get(family).map(String::as_str) {
            Some("yes") | Some("") | None => title_case(family),
            Some(value) => title_case(value),
        };
    }
    tags.iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Turns parsed ways into classified, projected ways. Per-way failures are
/// logged and the way is dropped; they never fail the batch.
pub struct SemanticMapper<'a> {
    projection: &'a TransverseMercator,
    render_untagged_ways: bool,
    elevation: Option<(&'a ElevationClient, f64)>,
}

impl<'a> SemanticMapper<'a> {
    pub fn new(projection: &'a TransverseMercator, render_untagged_ways: bool) -> Self {
        SemanticMapper {
            projection,
            render_untagged_ways,
            elevation: None,
        }
    }

    /// Lifts building outlines to their terrain altitude relative to
    /// `base_altitude`, the altitude at the origin.
    pub fn with_elevation(mut self, client: &'a ElevationClient, base_altitude: f64) -> Self {
        self.elevation = Some((client, base_altitude));
        self
    }

    pub fn map_way(&self, data: &OsmMapData, way: &Way) -> Result<ClassifiedWay, ParseError> {
        let nodes = data.resolve_way(way)?;
        let classification = classify(&way.tags);
        let name = if way.is_untagged() {
            format!("w_{}", way.id)
        } else {
            display_name(&way.tags, &classification)
        };

        let mut points: Vec<PlanePoint> = nodes
            .iter()
            .map(|node| self.projection.to_plane(node.point))
            .collect();

        let lift = match (self.elevation, classification) {
            (Some(elevation), Classification::Building { .. }) => Some(elevation),
            _ => None,
        };
        if let Some((client, base_altitude)) = lift {
            let geo_points: Vec<GeoPoint> = nodes.iter().map(|node| node.point).collect();
            let altitudes = client.get_altitudes(&geo_points);
            for (point, geo) in points.iter_mut().zip(&geo_points) {
                if let Some(altitude) = altitudes.get(&elevation_key(geo.latitude, geo.longitude)) {
                    point.z = altitude - base_altitude;
                }
            }
        }

        Ok(ClassifiedWay {
            id: way.id.clone(),
            name,
            classification,
            closed: way.is_closed(),
            points,
        })
    }

    pub fn map(&self, data: &OsmMapData, progress: &mut Progress) -> Vec<ClassifiedWay> {
        let way_count = data.ways.len();
        let mut classified = Vec::with_capacity(way_count);
        for (i, way) in data.ways.iter().enumerate() {
            progress.report_step(0, 50, i, way_count, STATUS_TRANSFORMING);

            if way.is_untagged() && !self.render_untagged_ways {
                debug!(way = way.id.as_str(); "Skipping untagged way");
                continue;
            }
            match self.map_way(data, way) {
                Ok(way) => classified.push(way),
                Err(err) => {
                    warn!(way = way.id.as_str(), err = err.to_string().as_str(); "Skipping way");
                }
            }
        }
        info!(ways = way_count, kept = classified.len(); "Classified ways");
        classified
    }
}
