//! Scalar helpers shared by the movement, camera and hazard code.

/// Critically damped spring toward `target` (Game Programming Gems 4, ch. 1.10).
///
/// `velocity` is the smoothing state carried between calls. The result never
/// overshoots `target`.
pub fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    let smooth_time = smooth_time.max(0.0001);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let exp = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * exp;

    let mut output = target + (change + temp) * exp;

    // Clamp overshoot
    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = if dt > 0.0 { (output - target) / dt } else { 0.0 };
    }

    output
}

/// Linear interpolation with `t` clamped to [0, 1].
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * clamp01(t)
}

/// Clamp to [0, 1].
#[inline]
pub fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Sign with zero mapped to +1, matching how facing is stored.
#[inline]
pub fn facing_sign(v: f32) -> f32 {
    if v < 0.0 {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_smooth_damp_converges() {
        let mut vel = 0.0;
        let mut x = 0.0;
        for _ in 0..600 {
            x = smooth_damp(x, 10.0, &mut vel, 0.1, 1.0 / 60.0);
        }
        assert!((x - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_lerp_clamps() {
        assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
        assert_eq!(lerp(0.0, 10.0, 2.0), 10.0);
        assert_eq!(lerp(0.0, 10.0, -1.0), 0.0);
    }

    #[test]
    fn test_facing_sign() {
        assert_eq!(facing_sign(-0.3), -1.0);
        assert_eq!(facing_sign(0.0), 1.0);
        assert_eq!(facing_sign(2.0), 1.0);
    }

    proptest! {
        #[test]
        fn test_smooth_damp_never_overshoots(
            current in -50.0f32..50.0,
            target in -50.0f32..50.0,
            smooth_time in 0.01f32..2.0,
        ) {
            let mut vel = 0.0;
            let out = smooth_damp(current, target, &mut vel, smooth_time, 1.0 / 60.0);
            let (lo, hi) = if current < target { (current, target) } else { (target, current) };
            prop_assert!(out >= lo - 1e-4 && out <= hi + 1e-4);
        }
    }
}
