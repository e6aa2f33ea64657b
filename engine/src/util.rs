//! Seeded random draws used while building a world.

use std::f64::consts::TAU;

use rand::Rng;
use tecto_geo::Spherical;

/// Uniform point on the sphere (equal-area in latitude).
pub(crate) fn random_point<R: Rng + ?Sized>(rng: &mut R) -> Spherical {
    let z: f64 = rng.gen_range(-1.0..=1.0);
    let lon: f64 = rng.gen_range(0.0..TAU);
    Spherical::new(z.asin(), lon)
}

/// Normal deviate via Box–Muller.
pub(crate) fn gauss<R: Rng + ?Sized>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    mean + sd * (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn gauss_moments_are_close() {
        let mut rng = StdRng::seed_from_u64(11);
        let n = 20_000;
        let xs: Vec<f64> = (0..n).map(|_| gauss(&mut rng, 42.8, 27.7)).collect();
        let mean = xs.iter().sum::<f64>() / n as f64;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!((mean - 42.8).abs() < 1.0, "mean {mean}");
        assert!((var.sqrt() - 27.7).abs() < 1.0, "sd {}", var.sqrt());
    }

    #[test]
    fn random_points_cover_both_hemispheres() {
        let mut rng = StdRng::seed_from_u64(5);
        let pts: Vec<Spherical> = (0..200).map(|_| random_point(&mut rng)).collect();
        assert!(pts.iter().any(|p| p.lat > 0.0) && pts.iter().any(|p| p.lat < 0.0));
        assert!(pts.iter().all(|p| (0.0..TAU).contains(&p.lon)));
    }
}
