/// A position on the WGS84 ellipsoid, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint { latitude, longitude }
    }
}

/// A position in the local plane of one import, in metres.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct PlanePoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PlanePoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        PlanePoint { x, y, z }
    }
}

/// Centre of projection. Every point of a single import must be projected
/// against the same origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceOrigin {
    pub latitude: f64,
    pub longitude: f64,
}

impl ReferenceOrigin {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        ReferenceOrigin { latitude, longitude }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}
