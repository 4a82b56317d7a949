//! Animation easing curves shared by the gait and attack code.
//!
//! The game's limb and sword motion is driven by `atan(tan(x)^3)`: the
//! tangent wraps the input over its period and the cubed/arctangent pair
//! bends the ramp so motion eases in and out of each swing instead of
//! moving linearly. The output is bounded to `(-pi/2, pi/2)`.

use std::f32::consts::FRAC_PI_2;

/// Saturating arctangent-of-tangent swing curve.
///
/// Undefined points of `tan` (`x = pi/2 + k*pi`) saturate to `+-pi/2`
/// instead of producing NaN or infinity; non-finite input clamps to zero.
pub fn swing_ease(x: f32) -> f32 {
    if !x.is_finite() {
        return 0.0;
    }
    let t = x.tan();
    if t.is_finite() {
        // t^3 may overflow to infinity for inputs near a pole; atan
        // saturates it to +-pi/2, which is the curve's natural bound.
        (t * t * t).atan()
    } else {
        FRAC_PI_2.copysign(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn zero_maps_to_zero() {
        assert_eq!(swing_ease(0.0), 0.0);
    }

    #[test]
    fn output_is_bounded() {
        for i in -100..=100 {
            let x = i as f32 * 0.07;
            let y = swing_ease(x);
            assert!(y.is_finite());
            assert!(y.abs() <= FRAC_PI_2, "swing_ease({x}) = {y} out of range");
        }
    }

    #[test]
    fn eases_through_small_angles() {
        // Near zero the cubed tangent flattens the ramp well below linear.
        let y = swing_ease(0.2);
        assert!(y > 0.0);
        assert!(y < 0.2);
    }

    #[test]
    fn pole_saturates_instead_of_exploding() {
        let y = swing_ease(FRAC_PI_2);
        assert!(y.is_finite());
        assert!(y.abs() <= FRAC_PI_2 + 1e-6);
    }

    #[test]
    fn wraps_over_the_tangent_period() {
        let a = swing_ease(0.3);
        let b = swing_ease(0.3 + PI);
        assert!((a - b).abs() < 1e-4);
    }

    #[test]
    fn non_finite_input_clamps_to_zero() {
        assert_eq!(swing_ease(f32::NAN), 0.0);
        assert_eq!(swing_ease(f32::INFINITY), 0.0);
    }
}
