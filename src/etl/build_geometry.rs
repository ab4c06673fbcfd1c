use std::collections::HashMap;

use log::warn;

use crate::{
    data::{
        geo::PlanePoint,
        osm::Bounds,
        scene::{Color, ObjectId, Scene, SceneObject, Style},
        semantic::{Classification, ClassifiedWay, GroupKind},
    },
    projection::TransverseMercator,
};

/// Extrusion used for buildings without a known height, in metres.
pub const DEFAULT_BUILDING_HEIGHT: f64 = 10.0;
pub const LANDUSE_SLAB_HEIGHT: f64 = 0.1;
pub const HIGHWAY_RIBBON_HEIGHT: f64 = 0.2;
pub const HIGHWAY_LINE_WIDTH: f32 = 10.0;

/// Scene objects created for one way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WayObjects {
    pub outline: ObjectId,
    pub extrusion: Option<ObjectId>,
}

/// Writes classified ways into a scene, one outline per way plus the
/// extrusion its classification calls for.
pub struct GeometryBuilder<'s> {
    scene: &'s mut dyn Scene,
    groups: HashMap<GroupKind, ObjectId>,
}

impl<'s> GeometryBuilder<'s> {
    /// Creates the highways, landuses, buildings and paths groups.
    pub fn new(scene: &'s mut dyn Scene) -> Self {
        let mut groups = HashMap::new();
        for kind in GroupKind::ALL {
            groups.insert(kind, scene.add_group(kind.label()));
        }
        GeometryBuilder { scene, groups }
    }

    fn group(&self, kind: GroupKind) -> Option<ObjectId> {
        self.groups.get(&kind).copied()
    }

    /// Ground plane covering the payload bounds.
    pub fn add_area(&mut self, bounds: &Bounds, projection: &TransverseMercator) -> ObjectId {
        let min = projection.to_plane(bounds.min_corner());
        let max = projection.to_plane(bounds.max_corner());
        self.scene.add_object(
            None,
            SceneObject::Plane {
                label: "area".to_string(),
                placement: PlanePoint::new(min.x, min.y, 0.0),
                length: max.x - min.x,
                width: max.y - min.y,
            },
        )
    }

    pub fn add_way(&mut self, way: &ClassifiedWay) -> Option<WayObjects> {
        // Single-node ways are kept as degenerate outlines.
        if way.points.is_empty() {
            warn!(way = way.id.as_str(); "Way has no points");
            return None;
        }

        let outline = self.scene.add_object(
            self.group(GroupKind::Paths),
            SceneObject::Polyline {
                label: format!("w_{}", way.id),
                points: way.points.clone(),
                closed: way.closed,
                style: Style::hidden(),
            },
        );

        let extrusion = match way.classification {
            Classification::Building { height } => Some(SceneObject::Extrusion {
                label: way.name.clone(),
                base: outline,
                height: if height > 0.0 { height } else { DEFAULT_BUILDING_HEIGHT },
                solid: true,
                style: Style {
                    shape_color: Some(Color::WHITE),
                    ..Style::default()
                },
            }),
            Classification::LandUse(kind) => Some(SceneObject::Extrusion {
                label: way.name.clone(),
                base: outline,
                height: LANDUSE_SLAB_HEIGHT,
                solid: true,
                style: Style {
                    shape_color: Some(kind.color()),
                    ..Style::default()
                },
            }),
            Classification::Highway => Some(SceneObject::Extrusion {
                label: way.name.clone(),
                base: outline,
                height: HIGHWAY_RIBBON_HEIGHT,
                solid: false,
                style: Style {
                    line_color: Some(Color::BLUE),
                    line_width: Some(HIGHWAY_LINE_WIDTH),
                    ..Style::default()
                },
            }),
            Classification::Untagged => None,
        };

        let group = self.group(way.classification.group());
        let extrusion = extrusion.map(|object| self.scene.add_object(group, object));
        Some(WayObjects { outline, extrusion })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        geo::ReferenceOrigin,
        scene::SceneGraph,
        semantic::LandUseKind,
    };

    fn square(id: &str, classification: Classification) -> ClassifiedWay {
        ClassifiedWay {
            id: id.to_string(),
            name: format!("way {}", id),
            classification,
            closed: true,
            points: vec![
                PlanePoint::new(0.0, 0.0, 0.0),
                PlanePoint::new(10.0, 0.0, 0.0),
                PlanePoint::new(10.0, 10.0, 0.0),
                PlanePoint::new(0.0, 0.0, 0.0),
            ],
        }
    }

    fn extrusion_height(object: &SceneObject) -> f64 {
        match object {
            SceneObject::Extrusion { height, .. } => *height,
            other => panic!("expected an extrusion, got {:?}", other),
        }
    }

    #[test]
    fn sentinel_height_uses_default() {
        let mut scene = SceneGraph::new();
        {
            let mut builder = GeometryBuilder::new(&mut scene);
            builder.add_way(&square("1", Classification::Building { height: 0.0 }));
            builder.add_way(&square("2", Classification::Building { height: 21.0 }));
        }
        let buildings = scene.members("buildings");
        assert_eq!(buildings.len(), 2);
        assert_eq!(extrusion_height(buildings[0]), DEFAULT_BUILDING_HEIGHT);
        assert_eq!(extrusion_height(buildings[1]), 21.0);
    }

    #[test]
    fn extrusions_reference_their_hidden_outline() {
        let mut scene = SceneGraph::new();
        let objects = GeometryBuilder::new(&mut scene)
            .add_way(&square("7", Classification::LandUse(LandUseKind::Meadow)))
            .unwrap();

        match scene.object(objects.outline).unwrap() {
            SceneObject::Polyline { label, closed, style, .. } => {
                assert_eq!(label, "w_7");
                assert!(*closed);
                assert!(!style.visible);
            }
            other => panic!("unexpected outline {:?}", other),
        }
        match scene.object(objects.extrusion.unwrap()).unwrap() {
            SceneObject::Extrusion { base, height, style, .. } => {
                assert_eq!(*base, objects.outline);
                assert_eq!(*height, LANDUSE_SLAB_HEIGHT);
                assert!(style.visible);
                assert_eq!(style.shape_color, Some(LandUseKind::Meadow.color()));
            }
            other => panic!("unexpected extrusion {:?}", other),
        }
        assert_eq!(scene.members("landuses").len(), 1);
        assert_eq!(scene.members("paths").len(), 1);
    }

    #[test]
    fn highways_are_thin_blue_ribbons() {
        let mut scene = SceneGraph::new();
        GeometryBuilder::new(&mut scene).add_way(&square("3", Classification::Highway));
        match scene.members("highways")[0] {
            SceneObject::Extrusion { height, solid, style, .. } => {
                assert_eq!(*height, HIGHWAY_RIBBON_HEIGHT);
                assert!(!solid);
                assert_eq!(style.line_color, Some(Color::BLUE));
                assert_eq!(style.line_width, Some(HIGHWAY_LINE_WIDTH));
            }
            other => panic!("unexpected object {:?}", other),
        }
    }

    #[test]
    fn untagged_ways_only_get_an_outline() {
        let mut scene = SceneGraph::new();
        let objects = GeometryBuilder::new(&mut scene)
            .add_way(&square("4", Classification::Untagged))
            .unwrap();
        assert_eq!(objects.extrusion, None);
        assert_eq!(scene.objects.len(), 1);
    }

    #[test]
    fn empty_ways_are_dropped() {
        let mut scene = SceneGraph::new();
        let mut way = square("5", Classification::Highway);
        way.points.clear();
        assert_eq!(GeometryBuilder::new(&mut scene).add_way(&way), None);
        assert!(scene.objects.is_empty());

        way.points.push(PlanePoint::default());
        assert!(GeometryBuilder::new(&mut scene).add_way(&way).is_some());
    }

    #[test]
    fn area_spans_the_bounds() {
        let mut scene = SceneGraph::new();
        let tm = TransverseMercator::new(ReferenceOrigin::new(50.005, 11.005));
        let bounds = Bounds {
            min_lat: 50.0,
            min_lon: 11.0,
            max_lat: 50.01,
            max_lon: 11.01,
        };
        let id = GeometryBuilder::new(&mut scene).add_area(&bounds, &tm);
        match scene.object(id).unwrap() {
            SceneObject::Plane { placement, length, width, .. } => {
                assert!(placement.x < 0.0 && placement.y < 0.0);
                assert!((width - 1112.0).abs() < 2.0);
                assert!(*length > 700.0 && *length < 720.0);
            }
            other => panic!("unexpected object {:?}", other),
        }
    }
}
