//! Local Transverse Mercator projection on the WGS84 ellipsoid.
//!
//! The central meridian is the origin's longitude and the origin's latitude is
//! the reference parallel, so the origin itself lands on (0, 0). The series
//! expansions are accurate to well below a millimetre over the few kilometres
//! an OSM import covers, and stay usable a couple of degrees out.

use crate::data::geo::{GeoPoint, PlanePoint, ReferenceOrigin};

const SEMI_MAJOR_AXIS: f64 = 6378137.0;
const FLATTENING: f64 = 1.0 / 298.257223563;

/// Projection bound to one [`ReferenceOrigin`].
#[derive(Debug, Clone, Copy)]
pub struct TransverseMercator {
    origin: ReferenceOrigin,
    e2: f64,
    e_prime2: f64,
    origin_arc: f64,
}

impl TransverseMercator {
    pub fn new(origin: ReferenceOrigin) -> Self {
        let e2 = 2.0 * FLATTENING - FLATTENING * FLATTENING;
        let e_prime2 = e2 / (1.0 - e2);
        TransverseMercator {
            origin,
            e2,
            e_prime2,
            origin_arc: meridional_arc(origin.latitude.to_radians(), e2),
        }
    }

    pub fn origin(&self) -> ReferenceOrigin {
        self.origin
    }

    pub fn to_plane(&self, point: GeoPoint) -> PlanePoint {
        let (e2, e_prime2) = (self.e2, self.e_prime2);
        let lat = point.latitude.to_radians();
        let dlon = (point.longitude - self.origin.longitude).to_radians();

        let n = SEMI_MAJOR_AXIS / (1.0 - e2 * lat.sin().powi(2)).sqrt();
        let t = lat.tan();
        let c = e_prime2 * lat.cos().powi(2);
        let a = dlon * lat.cos();

        let x = n
            * (a + (1.0 - t * t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t * t + t.powi(4) + 72.0 * c - 58.0 * e_prime2) * a.powi(5)
                    / 120.0);

        let y = meridional_arc(lat, e2) - self.origin_arc
            + n * t
                * (a * a / 2.0
                    + (5.0 - t * t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t * t + t.powi(4) + 600.0 * c - 330.0 * e_prime2) * a.powi(6)
                        / 720.0);

        PlanePoint::new(x, y, 0.0)
    }

    /// Inverse of [`TransverseMercator::to_plane`]; `z` is ignored.
    pub fn to_geographic(&self, point: PlanePoint) -> GeoPoint {
        let (e2, e_prime2) = (self.e2, self.e_prime2);
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let m = point.y + self.origin_arc;
        let mu = m
            / (SEMI_MAJOR_AXIS
                * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2.powi(3) / 256.0));

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let n1 = SEMI_MAJOR_AXIS / (1.0 - e2 * phi1.sin().powi(2)).sqrt();
        let t1 = phi1.tan();
        let c1 = e_prime2 * phi1.cos().powi(2);
        let r1 = SEMI_MAJOR_AXIS * (1.0 - e2) / (1.0 - e2 * phi1.sin().powi(2)).powf(1.5);
        let d = point.x / n1;

        let lat = phi1
            - (n1 * t1 / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * e_prime2)
                        * d.powi(4)
                        / 24.0
                    + (61.0 + 90.0 * t1 * t1 + 298.0 * c1 + 45.0 * t1.powi(4)
                        - 252.0 * e_prime2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);

        let dlon = (d - (1.0 + 2.0 * t1 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 * t1 - 3.0 * c1 * c1 + 8.0 * e_prime2 + 24.0 * t1.powi(4))
                * d.powi(5)
                / 120.0)
            / phi1.cos();

        GeoPoint::new(lat.to_degrees(), self.origin.longitude + dlon.to_degrees())
    }
}

/// Distance along the meridian from the equator to latitude `lat` (radians).
fn meridional_arc(lat: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    SEMI_MAJOR_AXIS
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

pub fn to_plane(origin: ReferenceOrigin, point: GeoPoint) -> PlanePoint {
    TransverseMercator::new(origin).to_plane(point)
}

pub fn to_geographic(origin: ReferenceOrigin, point: PlanePoint) -> GeoPoint {
    TransverseMercator::new(origin).to_geographic(point)
}
