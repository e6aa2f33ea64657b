use engine::crust::airy_displacement;
use engine::{Crust, CrustKind, PhysicalConstants};

#[test]
fn baselines_and_derived_quantities() {
    let phys = PhysicalConstants::default();
    let ocean = Crust::new(CrustKind::Oceanic, 0.0, &phys);
    let land = Crust::new(CrustKind::Continental, 15.0, &phys);
    assert_eq!(ocean.thickness_m(), 7_100.0);
    assert_eq!(ocean.density(), 2_890.0);
    assert_eq!(land.density(), 2_715.0);
    assert_eq!(ocean.pressure(), 7_100.0 * 2_890.0);
    assert!(!ocean.is_continent(&phys));
    assert!(land.is_continent(&phys));

    let expected = 36_900.0 - 36_900.0 * 2_715.0 / 3_300.0;
    assert!((land.displacement_m() - expected).abs() < 1e-9);
    assert!((land.elevation_m(&phys) - (expected - 3_790.0)).abs() < 1e-9);
    assert!(land.elevation_m(&phys) > 0.0);
    assert!(ocean.elevation_m(&phys) < 0.0);
}

#[test]
fn isostacy_is_idempotent() {
    let phys = PhysicalConstants::default();
    let mut c = Crust::with_column(12_000.0, 2_800.0, &phys);
    c.isostacy(&phys);
    let once = c.displacement_m();
    c.isostacy(&phys);
    assert_eq!(c.displacement_m(), once);
    assert_eq!(once, airy_displacement(12_000.0, 2_800.0, 3_300.0));
}

#[test]
fn inertial_moment_grows_with_axis_distance() {
    let phys = PhysicalConstants::default();
    let c = Crust::new(CrustKind::Oceanic, 0.0, &phys);
    let pole = [0.0, 1.0, 0.0];
    assert_eq!(c.inertial_moment([0.0, 1.0, 0.0], pole), 0.0);
    let equator = c.inertial_moment([1.0, 0.0, 0.0], pole);
    assert!((equator - c.pressure()).abs() < 1e-9 * c.pressure());
    let mid = c.inertial_moment([0.6, 0.8, 0.0], pole);
    assert!((mid - 0.36 * c.pressure()).abs() < 1e-9 * c.pressure());
}

#[test]
fn eruption_only_thickens_dense_columns() {
    let phys = PhysicalConstants::default();
    let mut ocean = Crust::new(CrustKind::Oceanic, 0.0, &phys);
    let added = ocean.erupt(&phys);
    assert!(added > 0.0);
    assert!((ocean.own_thickness_m() - (7_100.0 + added)).abs() < 1e-9);
    assert!(ocean.own_density() < 2_890.0 && ocean.own_density() > 2_700.0);

    let mut land = Crust::new(CrustKind::Continental, -5.0, &phys);
    assert_eq!(land.erupt(&phys), 0.0);
    assert_eq!(land.own_thickness_m(), 36_900.0);
}

#[test]
fn transferred_copy_keeps_column_but_not_links() {
    let phys = PhysicalConstants::default();
    let c = Crust::with_column(20_000.0, 2_750.0, &phys);
    let t = c.transferred();
    assert_eq!(t.own_thickness_m(), 20_000.0);
    assert_eq!(t.own_density(), 2_750.0);
    assert_eq!(t.subducts(), None);
    assert_eq!(t.subducted_by(), None);
    assert_eq!(t.first_subducted_by(), None);
}
