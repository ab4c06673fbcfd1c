use super::geo::PlanePoint;
use super::osm::OsmId;
use super::scene::Color;

/// Semantic category of a way. Exactly one per way, see
/// [`crate::etl::semantic_map::classify`] for the precedence rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    /// Height in metres. Zero means "use the default extrusion height".
    Building { height: f64 },
    LandUse(LandUseKind),
    Highway,
    Untagged,
}

impl Classification {
    pub fn group(&self) -> GroupKind {
        match self {
            Classification::Building { .. } => GroupKind::Buildings,
            Classification::LandUse(_) => GroupKind::LandUses,
            Classification::Highway => GroupKind::Highways,
            Classification::Untagged => GroupKind::Paths,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandUseKind {
    Residential,
    Meadow,
    Farmland,
    Forest,
    Grass,
    Other,
}

impl LandUseKind {
    pub fn from_tag(value: &str) -> Self {
        match value {
            "residential" => LandUseKind::Residential,
            "meadow" => LandUseKind::Meadow,
            "farmland" => LandUseKind::Farmland,
            "forest" => LandUseKind::Forest,
            "grass" => LandUseKind::Grass,
            _ => LandUseKind::Other,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            LandUseKind::Residential => Color::new(1.0, 0.6, 0.6),
            LandUseKind::Meadow => Color::new(0.0, 1.0, 0.0),
            LandUseKind::Farmland => Color::new(0.8, 0.8, 0.0),
            LandUseKind::Forest => Color::new(1.0, 0.4, 0.4),
            LandUseKind::Grass => Color::new(0.0, 0.8, 0.5),
            LandUseKind::Other => Color::new(1.0, 0.6, 0.6),
        }
    }
}

/// The four scene groups an OSM import organises its objects into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    Highways,
    LandUses,
    Buildings,
    Paths,
}

impl GroupKind {
    pub const ALL: [GroupKind; 4] = [
        GroupKind::Highways,
        GroupKind::LandUses,
        GroupKind::Buildings,
        GroupKind::Paths,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GroupKind::Highways => "highways",
            GroupKind::LandUses => "landuses",
            GroupKind::Buildings => "buildings",
            GroupKind::Paths => "paths",
        }
    }
}

/// A way after classification and projection, ready for geometry building.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedWay {
    pub id: OsmId,
    pub name: String,
    pub classification: Classification,
    pub closed: bool,
    pub points: Vec<PlanePoint>,
}
