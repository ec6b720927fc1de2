//! Divergence metric and EMA arithmetic.
//!
//! Drift is the cosine complement `clamp(1 - cos(intent, action), 0, 1)`:
//! symmetric, zero for identical (or parallel) vectors, 1 for orthogonal or
//! opposed ones. A zero vector has no direction, so it is maximally distant
//! from any non-zero vector and identical to another zero vector.

use crate::error::{InvalidVectorError, VectorFault, VectorRole};

/// Check that a drift sample is usable. Never mutates anything.
pub fn validate_sample(intent: &[f64], action: &[f64]) -> Result<(), InvalidVectorError> {
    if intent.is_empty() {
        return Err(InvalidVectorError::new(VectorRole::Intent, VectorFault::Empty));
    }
    if action.is_empty() {
        return Err(InvalidVectorError::new(VectorRole::Action, VectorFault::Empty));
    }
    if intent.len() != action.len() {
        return Err(InvalidVectorError::new(
            VectorRole::Action,
            VectorFault::LengthMismatch {
                intent_len: intent.len(),
                action_len: action.len(),
            },
        ));
    }
    for (role, values) in [(VectorRole::Intent, intent), (VectorRole::Action, action)] {
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(InvalidVectorError::new(role, VectorFault::NonFinite { index }));
        }
    }
    Ok(())
}

/// Cosine complement of two validated, equal-length vectors.
pub fn cosine_complement(a: &[f64], b: &[f64]) -> f64 {
    if a == b {
        return 0.0;
    }

    // Scale by the largest magnitude so squaring cannot overflow or underflow.
    let scale = a
        .iter()
        .chain(b)
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (x / scale, y / scale);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    match (norm_a == 0.0, norm_b == 0.0) {
        (true, true) => 0.0,
        (true, false) | (false, true) => 1.0,
        (false, false) => (1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0),
    }
}

/// `alpha * raw + (1 - alpha) * previous`
pub fn ema_step(previous: f64, raw: f64, alpha: f64) -> f64 {
    alpha * raw + (1.0 - alpha) * previous
}

/// Identical updates needed before the EMA is within `tolerance` (as a
/// fraction of the initial gap) of the repeated raw value.
pub fn convergence_steps(alpha: f64, tolerance: f64) -> u32 {
    if tolerance >= 1.0 {
        return 0;
    }
    if alpha >= 1.0 {
        return 1;
    }
    let steps = (tolerance.ln() / (1.0 - alpha).ln()).ceil();
    if steps.is_finite() && steps > 0.0 {
        steps.min(u32::MAX as f64) as u32
    } else {
        u32::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identical_and_orthogonal() {
        assert_eq!(cosine_complement(&[1.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_complement(&[1.0, 0.0], &[0.0, 1.0]), 1.0);
        assert_eq!(cosine_complement(&[1.0, 2.0], &[-1.0, -2.0]), 1.0);
        assert!(cosine_complement(&[1.0, 0.0], &[3.0, 0.0]).abs() < 1e-12);
    }

    #[test]
    fn zero_vectors() {
        assert_eq!(cosine_complement(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_complement(&[0.0, 0.0], &[0.0, 1.0]), 1.0);
    }

    #[test]
    fn huge_values_do_not_overflow() {
        let d = cosine_complement(&[1e300, 1e300], &[1e300, 0.0]);
        assert!((d - (1.0 - std::f64::consts::FRAC_1_SQRT_2)).abs() < 1e-9);
    }

    #[test]
    fn validation_faults() {
        let err = validate_sample(&[1.0, 2.0, 3.0], &[1.0, 2.0]).unwrap_err();
        assert_eq!(
            err.fault,
            VectorFault::LengthMismatch {
                intent_len: 3,
                action_len: 2
            }
        );

        let err = validate_sample(&[], &[1.0]).unwrap_err();
        assert_eq!(err.vector, VectorRole::Intent);
        assert_eq!(err.fault, VectorFault::Empty);

        let err = validate_sample(&[1.0, 2.0], &[1.0, f64::NAN]).unwrap_err();
        assert_eq!(err.vector, VectorRole::Action);
        assert_eq!(err.fault, VectorFault::NonFinite { index: 1 });

        let err = validate_sample(&[f64::INFINITY], &[1.0]).unwrap_err();
        assert_eq!(err.vector, VectorRole::Intent);
    }

    #[test]
    fn convergence_step_counts() {
        assert_eq!(convergence_steps(0.2, 1e-3), 31);
        assert_eq!(convergence_steps(1.0, 1e-3), 1);
        assert_eq!(convergence_steps(0.5, 0.5), 1);
        assert_eq!(convergence_steps(0.2, 1.0), 0);
    }

    fn vec_pair() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
        (1usize..8).prop_flat_map(|n| {
            (
                prop::collection::vec(-100.0f64..100.0, n),
                prop::collection::vec(-100.0f64..100.0, n),
            )
        })
    }

    proptest! {
        #[test]
        fn drift_is_bounded_and_symmetric((a, b) in vec_pair()) {
            let ab = cosine_complement(&a, &b);
            let ba = cosine_complement(&b, &a);
            prop_assert!((0.0..=1.0).contains(&ab));
            prop_assert!((ab - ba).abs() < 1e-12);
            prop_assert_eq!(cosine_complement(&a, &a), 0.0);
        }
    }
}
