use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Absolute difference between two angles, normalized into `[0, π]`.
pub fn angle_diff_abs(a: f32, b: f32) -> f32 {
    let two_pi = 2.0 * PI;
    let mut diff = (b - a).rem_euclid(two_pi);
    if diff >= PI {
        diff -= two_pi;
    }
    diff.abs()
}

/// Whether two undirected axes are orthogonal within `tolerance`.
pub fn is_orthogonal(reference_angle: f32, other_angle: f32, tolerance: f32) -> bool {
    let diff_abs = angle_diff_abs(reference_angle, other_angle);
    (FRAC_PI_2 - diff_abs).abs() <= tolerance.abs()
}

/// Angle between an undirected axis (modulo π) and a directed vector, in `[0, π/2]`.
pub fn axis_vec_diff(axis_angle: f32, vec_angle: f32) -> f32 {
    let diff_abs = angle_diff_abs(axis_angle, vec_angle);
    diff_abs.min(PI - diff_abs)
}

/// Wrap an angle defined modulo π/2 into `(-π/4, π/4]`.
pub fn wrap_quarter_turn(angle: f32) -> f32 {
    let mut a = (angle + FRAC_PI_4).rem_euclid(FRAC_PI_2) - FRAC_PI_4;
    if a <= -FRAC_PI_4 {
        a += FRAC_PI_2;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn orthogonal_axes_are_detected() {
        assert!(is_orthogonal(FRAC_PI_4, 3.0 * FRAC_PI_4, 1e-3));
        assert!(is_orthogonal(FRAC_PI_4, -FRAC_PI_4, 1e-3));
        assert!(!is_orthogonal(0.0, 0.25, 0.05));
    }

    #[test]
    fn axis_difference_ignores_direction() {
        assert_abs_diff_eq!(axis_vec_diff(0.0, PI), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(axis_vec_diff(FRAC_PI_4, 0.0), FRAC_PI_4, epsilon = 1e-6);
        assert_abs_diff_eq!(axis_vec_diff(FRAC_PI_4, PI), FRAC_PI_4, epsilon = 1e-6);
    }

    #[test]
    fn quarter_turn_wraps_into_half_open_range() {
        assert_abs_diff_eq!(wrap_quarter_turn(FRAC_PI_2), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(wrap_quarter_turn(0.3), 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(wrap_quarter_turn(-0.3 - FRAC_PI_2), -0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(wrap_quarter_turn(-FRAC_PI_4), FRAC_PI_4, epsilon = 1e-6);
    }
}
