use super::*;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

const EPS: f64 = 1e-9;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

#[test]
fn spherical_round_trip() {
    for i in 0..=20i32 {
        for j in 0..40i32 {
            let lat = -FRAC_PI_2 * 0.999 + f64::from(i) * (PI * 0.999) / 20.0;
            let lon = f64::from(j) * TAU / 40.0;
            let s = to_spherical(to_cartesian(Spherical::new(lat, lon)));
            assert!(close(s.lat, lat), "lat {lat} -> {}", s.lat);
            let dlon = (s.lon - lon).abs();
            assert!(dlon < 1e-7 || (TAU - dlon) < 1e-7, "lon {lon} -> {}", s.lon);
        }
    }
}

#[test]
fn axes_match_convention() {
    let east = to_cartesian(Spherical::new(0.0, FRAC_PI_2));
    assert!(close(east[0], 0.0) && close(east[1], 0.0) && close(east[2], -1.0));
    let north = to_cartesian(Spherical::new(FRAC_PI_2, 0.0));
    assert!(close(north[1], 1.0));
    assert_eq!(to_spherical([0.0, 0.0, 0.0]), Spherical::default());
}

#[test]
fn arc_distance_is_symmetric_and_zero_on_self() {
    let a = Spherical::new(0.3, 1.2);
    let b = Spherical::new(-0.7, 5.9);
    assert!(close(arc_distance(a, b), arc_distance(b, a)));
    assert!(arc_distance(a, a).abs() < EPS);
    let eq0 = Spherical::new(0.0, 0.0);
    let eq90 = Spherical::new(0.0, FRAC_PI_2);
    assert!(close(arc_distance(eq0, eq90), FRAC_PI_2));
    let antipode = Spherical::new(0.0, PI);
    assert!(close(arc_distance(eq0, antipode), PI));
}

#[test]
fn arc_distance_agrees_with_vector_angle() {
    let a = Spherical::new(0.4, 0.1);
    let b = Spherical::new(-0.2, 2.3);
    let va = to_cartesian(a);
    let vb = to_cartesian(b);
    let ang = norm(cross(va, vb)).atan2(dot(va, vb));
    assert!(close(arc_distance(a, b), ang));
}

#[test]
fn coordinate_cache_is_explicit() {
    let mut c = GeoCoordinate::from_spherical(Spherical::new(0.5, 1.0));
    assert_eq!(c.authority(), Authority::Spherical);
    assert!(c.is_stale());
    let v = c.cartesian();
    assert!(c.is_stale(), "reads must not fill the cache");
    c.refresh();
    assert!(!c.is_stale());
    assert_eq!(c.cartesian(), v);

    c.set_cartesian([0.0, 0.0, 1.0]);
    assert_eq!(c.authority(), Authority::Cartesian);
    assert!(c.is_stale());
    let s = c.spherical();
    assert!(close(s.lat, 0.0));
    assert!(close(s.lon, 3.0 * FRAC_PI_2));
}

#[test]
fn rotation_quarter_turn_about_pole() {
    let mut c = GeoCoordinate::from_spherical(Spherical::new(0.0, 0.0));
    c.rotate(FRAC_PI_2, [0.0, 1.0, 0.0]);
    let s = c.spherical();
    assert!(close(s.lat, 0.0));
    assert!(close(s.lon, FRAC_PI_2), "lon {}", s.lon);
    let back = c.rotated(-FRAC_PI_2, [0.0, 1.0, 0.0]);
    assert!(back.arc_distance(&GeoCoordinate::from_spherical(Spherical::new(0.0, 0.0))) < EPS);
}

#[test]
fn rotations_compose_and_invert() {
    let r1 = Rotation::about_axis([1.0, 2.0, 0.5], 0.7);
    let r2 = Rotation::about_axis([0.0, -1.0, 3.0], -1.9);
    let both = r1.then(&r2);
    let v = normalize([0.3, -0.4, 0.8]);
    let a = both.apply(v);
    let b = r2.apply(r1.apply(v));
    for k in 0..3 {
        assert!(close(a[k], b[k]));
    }
    let back = both.apply_inverse(a);
    for k in 0..3 {
        assert!(close(back[k], v[k]));
    }
    assert!(close(norm(a), 1.0));
    assert_eq!(Rotation::about_axis([0.0; 3], 1.0), Rotation::IDENTITY);
}
