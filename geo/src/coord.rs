use std::f64::consts::TAU;

use crate::math::{self, Rotation, Vec3};

/// Latitude/longitude pair in radians.
///
/// Latitude lies in `[-π/2, π/2]`; longitude is kept in `[0, 2π)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spherical {
    /// Latitude in radians, positive north.
    pub lat: f64,
    /// Longitude in radians, `[0, 2π)`.
    pub lon: f64,
}

impl Spherical {
    /// Build a pair, wrapping `lon` into `[0, 2π)`.
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon: wrap_lon(lon) }
    }
}

#[inline]
fn wrap_lon(lon: f64) -> f64 {
    let w = lon.rem_euclid(TAU);
    // rem_euclid can round up to exactly 2π for tiny negative inputs
    if w >= TAU {
        0.0
    } else {
        w
    }
}

/// Unit vector for a lat/lon pair: `(cos φ cos λ, sin φ, −cos φ sin λ)`.
#[inline]
#[must_use]
pub fn to_cartesian(s: Spherical) -> Vec3 {
    let (slat, clat) = s.lat.sin_cos();
    let (slon, clon) = s.lon.sin_cos();
    [clat * clon, slat, -clat * slon]
}

/// Inverse of [`to_cartesian`]: `lat = asin(y)`, `lon = atan2(−z, x)`.
/// Non-unit inputs are normalized first; the zero vector maps to `(0, 0)`.
#[inline]
#[must_use]
pub fn to_spherical(v: Vec3) -> Spherical {
    let n = math::norm(v);
    if n <= math::EPS_NORM {
        return Spherical::default();
    }
    let lat = (v[1] / n).clamp(-1.0, 1.0).asin();
    let lon = wrap_lon((-v[2]).atan2(v[0]));
    Spherical { lat, lon }
}

/// Haversine great-circle distance in radians. Non-negative and symmetric.
#[must_use]
pub fn arc_distance(a: Spherical, b: Spherical) -> f64 {
    let dlat = (b.lat - a.lat) * 0.5;
    let dlon = (b.lon - a.lon) * 0.5;
    let h = dlat.sin().powi(2) + a.lat.cos() * b.lat.cos() * dlon.sin().powi(2);
    2.0 * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Which representation of a [`GeoCoordinate`] was last written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authority {
    /// The cartesian vector is the source of truth.
    Cartesian,
    /// The lat/lon pair is the source of truth.
    Spherical,
}

/// A point held as either a cartesian vector or a lat/lon pair.
///
/// Exactly one representation is authoritative. The other is a cache that
/// goes stale on every write and is only filled by an explicit
/// [`GeoCoordinate::refresh`]. Reads of a stale cache convert on the fly
/// without storing the result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoCoordinate {
    authority: Authority,
    cartesian: Vec3,
    spherical: Spherical,
    stale: bool,
}

impl GeoCoordinate {
    /// Point from a cartesian vector.
    #[must_use]
    pub fn from_cartesian(v: Vec3) -> Self {
        Self { authority: Authority::Cartesian, cartesian: v, spherical: Spherical::default(), stale: true }
    }

    /// Point from a lat/lon pair.
    #[must_use]
    pub fn from_spherical(s: Spherical) -> Self {
        Self {
            authority: Authority::Spherical,
            cartesian: [0.0; 3],
            spherical: Spherical::new(s.lat, s.lon),
            stale: true,
        }
    }

    /// Representation that was last written.
    #[must_use]
    pub fn authority(&self) -> Authority {
        self.authority
    }

    /// Whether the non-authoritative cache is out of date.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Bring the non-authoritative representation up to date.
    pub fn refresh(&mut self) {
        if !self.stale {
            return;
        }
        match self.authority {
            Authority::Cartesian => self.spherical = to_spherical(self.cartesian),
            Authority::Spherical => self.cartesian = to_cartesian(self.spherical),
        }
        self.stale = false;
    }

    /// Cartesian form.
    #[must_use]
    pub fn cartesian(&self) -> Vec3 {
        match (self.authority, self.stale) {
            (Authority::Spherical, true) => to_cartesian(self.spherical),
            _ => self.cartesian,
        }
    }

    /// Lat/lon form.
    #[must_use]
    pub fn spherical(&self) -> Spherical {
        match (self.authority, self.stale) {
            (Authority::Cartesian, true) => to_spherical(self.cartesian),
            _ => self.spherical,
        }
    }

    /// Overwrite with a cartesian vector; the lat/lon cache goes stale.
    pub fn set_cartesian(&mut self, v: Vec3) {
        self.authority = Authority::Cartesian;
        self.cartesian = v;
        self.stale = true;
    }

    /// Overwrite with a lat/lon pair; the cartesian cache goes stale.
    pub fn set_spherical(&mut self, s: Spherical) {
        self.authority = Authority::Spherical;
        self.spherical = Spherical::new(s.lat, s.lon);
        self.stale = true;
    }

    /// Apply a rotation in place.
    pub fn transform(&mut self, r: &Rotation) {
        let v = r.apply(self.cartesian());
        self.set_cartesian(v);
    }

    /// Rotate in place by `angle` radians about `axis`.
    pub fn rotate(&mut self, angle: f64, axis: Vec3) {
        self.transform(&Rotation::about_axis(axis, angle));
    }

    /// Rotated copy; `self` is untouched.
    #[must_use]
    pub fn rotated(&self, angle: f64, axis: Vec3) -> Self {
        let mut out = *self;
        out.rotate(angle, axis);
        out
    }

    /// Great-circle distance to `other` in radians.
    #[must_use]
    pub fn arc_distance(&self, other: &GeoCoordinate) -> f64 {
        arc_distance(self.spherical(), other.spherical())
    }
}
