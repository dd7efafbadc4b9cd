use glam::DVec3;

/// Values this close to zero are snapped to zero.
const ZERO_TOLERANCE: f64 = 1e-4;
/// Values this close to a half turn are snapped to ±180.
const HALF_TURN_TOLERANCE: f64 = 1e-3;

/// The result of normalizing an Euler rotation, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    pub values: DVec3,
    /// Whether any component was snapped to a canonical angle.
    pub snapped: bool,
    /// The Z component before the signed-range rewrite, if it was applied.
    pub rewritten_z: Option<f64>,
}

/// Snaps each component to 0 or ±180 when it is within tolerance, then rewrites
/// `(0, ±180, z)` with a negative `z` into `(0, ±180, -(z + 360))`.
///
/// The rewrite looks at the snapped values, not the input.
pub fn normalize(rotation: DVec3) -> Normalized {
    let snapped_values = DVec3::new(snap(rotation.x), snap(rotation.y), snap(rotation.z));
    let snapped = snapped_values != rotation;

    let mut values = snapped_values;
    let mut rewritten_z = None;
    if values.x == 0. && values.y.abs() == 180. && values.z < 0. {
        rewritten_z = Some(values.z);
        values.z = -(values.z + 360.);
    }

    Normalized {
        values,
        snapped,
        rewritten_z,
    }
}

fn snap(value: f64) -> f64 {
    if value != 0. && value.abs() <= ZERO_TOLERANCE {
        return 0.;
    }
    for half_turn in [180., -180.] {
        if value != half_turn && (value - half_turn).abs() <= HALF_TURN_TOLERANCE {
            return half_turn;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn snap_to_zero() {
        assert_eq!(0., snap(0.0001));
        assert_eq!(0., snap(-0.00005));
        assert_eq!(0.0002, snap(0.0002));
        assert_eq!(0., snap(0.));
    }

    #[test]
    fn snap_to_half_turn() {
        assert_eq!(180., snap(179.9995));
        assert_eq!(180., snap(180.0008));
        assert_eq!(-180., snap(-179.9991));
        assert_eq!(179.99, snap(179.99));
        assert_eq!(-180.002, snap(-180.002));
    }

    #[test]
    fn signed_range_rewrite() {
        let normalized = normalize(DVec3::new(0., -180., -10.));

        assert_eq!(DVec3::new(0., -180., -350.), normalized.values);
        assert_eq!(Some(-10.), normalized.rewritten_z);
        assert!(!normalized.snapped);
    }

    #[test]
    fn rewrite_uses_snapped_values() {
        let normalized = normalize(DVec3::new(0.00002, -179.9998, -10.));

        assert_eq!(DVec3::new(0., -180., -350.), normalized.values);
        assert!(normalized.snapped);
    }

    #[test]
    fn no_rewrite_outside_pattern() {
        for rotation in [
            DVec3::new(0., -180., 10.),
            DVec3::new(5., -180., -10.),
            DVec3::new(0., -180., 0.),
        ] {
            let normalized = normalize(rotation);
            assert_eq!(rotation, normalized.values);
            assert_eq!(None, normalized.rewritten_z);
        }
    }

    #[test]
    fn snapped_positive_half_turn() {
        let normalized = normalize(DVec3::new(0.0001, 179.9995, -170.));

        assert_eq!(DVec3::new(0., 180., -350.), normalized.values);
        assert!(normalized.snapped);
        assert_eq!(Some(-170.), normalized.rewritten_z);
    }

    #[test]
    fn positive_half_turn_with_positive_z() {
        let normalized = normalize(DVec3::new(0., 180., 10.));

        assert_eq!(DVec3::new(0., 180., 10.), normalized.values);
        assert_eq!(None, normalized.rewritten_z);
    }
}
