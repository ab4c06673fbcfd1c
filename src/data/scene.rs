//! The interface the importers need from the host document, and an in-memory
//! document used by the binary and the tests.

use super::geo::PlanePoint;

pub type ObjectId = u32;

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };
    pub const RED: Color = Color { r: 1.0, g: 0.0, b: 0.0 };
    pub const BLUE: Color = Color { r: 0.0, g: 0.0, b: 1.0 };

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Color { r, g, b }
    }
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
pub struct Style {
    pub visible: bool,
    pub shape_color: Option<Color>,
    pub line_color: Option<Color>,
    pub line_width: Option<f32>,
}

impl Default for Style {
    fn default() -> Self {
        Style {
            visible: true,
            shape_color: None,
            line_color: None,
            line_width: None,
        }
    }
}

impl Style {
    pub fn hidden() -> Self {
        Style {
            visible: false,
            ..Style::default()
        }
    }
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
pub enum SceneObject {
    Polyline {
        label: String,
        points: Vec<PlanePoint>,
        closed: bool,
        style: Style,
    },
    /// Extrusion of another object along +z. Refers to its base, never copies it.
    Extrusion {
        label: String,
        base: ObjectId,
        height: f64,
        solid: bool,
        style: Style,
    },
    /// Axis-aligned rectangle in the xy-plane, `placement` is its lower-left corner.
    Plane {
        label: String,
        placement: PlanePoint,
        length: f64,
        width: f64,
    },
    BSpline {
        label: String,
        points: Vec<PlanePoint>,
        style: Style,
    },
}

impl SceneObject {
    pub fn label(&self) -> &str {
        match self {
            SceneObject::Polyline { label, .. }
            | SceneObject::Extrusion { label, .. }
            | SceneObject::Plane { label, .. }
            | SceneObject::BSpline { label, .. } => label,
        }
    }
}

/// Sink for imported geometry. Implemented by the host document.
pub trait Scene {
    fn add_group(&mut self, label: &str) -> ObjectId;

    /// Adds `object`, optionally as a member of `group`.
    fn add_object(&mut self, group: Option<ObjectId>, object: SceneObject) -> ObjectId;
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
pub struct Group {
    pub id: ObjectId,
    pub label: String,
    pub members: Vec<ObjectId>,
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
pub struct SceneEntry {
    pub id: ObjectId,
    pub object: SceneObject,
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, Default, PartialEq)]
pub struct SceneGraph {
    pub groups: Vec<Group>,
    pub objects: Vec<SceneEntry>,
    next_id: ObjectId,
}

impl SceneGraph {
    pub fn new() -> Self {
        SceneGraph::default()
    }

    fn allocate_id(&mut self) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn group(&self, label: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.label == label)
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.object)
    }

    /// Objects of the first group labelled `label`, in insertion order.
    pub fn members(&self, label: &str) -> Vec<&SceneObject> {
        match self.group(label) {
            Some(group) => group.members.iter().filter_map(|id| self.object(*id)).collect(),
            None => Vec::new(),
        }
    }
}

impl Scene for SceneGraph {
    fn add_group(&mut self, label: &str) -> ObjectId {
        let id = self.allocate_id();
        self.groups.push(Group {
            id,
            label: label.to_string(),
            members: Vec::new(),
        });
        id
    }

    fn add_object(&mut self, group: Option<ObjectId>, object: SceneObject) -> ObjectId {
        let id = self.allocate_id();
        self.objects.push(SceneEntry { id, object });
        if let Some(group_id) = group {
            if let Some(group) = self.groups.iter_mut().find(|g| g.id == group_id) {
                group.members.push(id);
            }
        }
        id
    }
}
