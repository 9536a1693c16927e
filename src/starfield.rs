use glam::Vec3;
use rand::Rng;

/// Bring a requested star count into `[0, max]`
pub fn clamp_star_count(requested: i64, max: usize) -> usize {
    if requested <= 0 {
        0
    } else {
        usize::try_from(requested).map_or(max, |count| count.min(max))
    }
}

/// Scatter `count` stars uniformly in a cube of edge `spread` centred on the origin
pub fn generate<R: Rng + ?Sized>(count: usize, spread: f32, rng: &mut R) -> Vec<Vec3> {
    let mut coord = || spread * (0.5 - rng.gen::<f32>());
    (0..count)
        .map(|_| {
            let x = coord();
            let y = coord();
            let z = coord();
            Vec3::new(x, y, z)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_star_count(300, 10_000), 300);
        assert_eq!(clamp_star_count(50_000, 10_000), 10_000);
        assert_eq!(clamp_star_count(10_000, 10_000), 10_000);
        assert_eq!(clamp_star_count(-5, 10_000), 0);
        assert_eq!(clamp_star_count(i64::MAX, 10_000), 10_000);
    }

    #[test]
    fn test_stars_stay_in_cube() {
        let mut rng = StdRng::seed_from_u64(7);
        let stars = generate(1000, 200.0, &mut rng);
        assert_eq!(stars.len(), 1000);
        assert!(stars.iter().all(|s| s.abs().max_element() <= 100.0));
    }

    #[test]
    fn test_seeded_generation_is_repeatable() {
        let a = generate(10, 200.0, &mut StdRng::seed_from_u64(42));
        let b = generate(10, 200.0, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_spread() {
        let stars = generate(3, 0.0, &mut StdRng::seed_from_u64(1));
        assert!(stars.iter().all(|s| *s == Vec3::ZERO));
    }
}
