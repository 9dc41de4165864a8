/// Returns the L2 norm of a slice.
pub fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Clips the gradient by its global L2 norm.
///
/// When the norm exceeds `max_norm` every component is scaled by `max_norm / (norm + 1e-6)`,
/// leaving the direction untouched.
///
/// # Arguments
/// * `grad` - The gradient to clip in place.
/// * `max_norm` - The maximum allowed norm.
///
/// # Returns
/// The norm before clipping.
pub fn clip_grad_norm(grad: &mut [f32], max_norm: f32) -> f32 {
    let norm = l2_norm(grad);

    if norm > max_norm {
        let coef = max_norm / (norm + 1e-6);
        grad.iter_mut().for_each(|g| *g *= coef);
    }

    norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn small_gradients_are_untouched() {
        let mut grad = [0.1, 0.2];

        let norm = clip_grad_norm(&mut grad, 0.5);

        assert_abs_diff_eq!(norm, 0.05f32.sqrt(), epsilon = 1e-6);
        assert_eq!(grad, [0.1, 0.2]);
    }

    #[test]
    fn large_gradients_are_scaled_to_the_threshold() {
        let mut grad = [30., -40.];

        let norm = clip_grad_norm(&mut grad, 0.5);

        assert_abs_diff_eq!(norm, 50.);
        assert!(l2_norm(&grad) <= 0.5 + 1e-6);
        assert_abs_diff_eq!(grad[0], 0.3, epsilon = 1e-5);
        assert_abs_diff_eq!(grad[1], -0.4, epsilon = 1e-5);
    }
}
