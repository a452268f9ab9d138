pub use ndarray::prelude::*;

/// Smallest probability distance from 0 or 1 used on the log-odds scale
pub const PROB_EPSILON: f64 = 1e-10;

/// `x * ln(y)` with the convention `0 * ln(0) = 0`
#[inline]
pub fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x * y.ln()
    }
}

/// `ln(p) - ln(1 - p)` after clamping `p` into `[ε, 1 - ε]`
#[inline]
pub fn logit_clamped(p: f64) -> f64 {
    let p = p.clamp(PROB_EPSILON, 1.0 - PROB_EPSILON);
    p.ln() - (1.0 - p).ln()
}

/// Element-wise log-odds of a probability matrix
pub fn log_odds(probs: &ArrayView2<f64>) -> Array2<f64> {
    probs.mapv(logit_clamped)
}

/// Index of the first maximum; `None` for an empty slice.
/// NaN entries never win.
pub fn argmax_first(values: &[f64]) -> Option<usize> {
    let mut ret = None;
    let mut best = f64::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        if ret.is_none() || v > best {
            ret = Some(i);
            best = v;
        }
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn xlogy_zero_convention() {
        assert_eq!(xlogy(0.0, 0.0), 0.0);
        assert_abs_diff_eq!(xlogy(2.0, 0.5), 2.0 * 0.5_f64.ln());
    }

    #[test]
    fn logit_is_finite_at_the_boundary() {
        assert!(logit_clamped(0.0).is_finite());
        assert!(logit_clamped(1.0).is_finite());
        assert!(logit_clamped(0.0) < 0.0 && logit_clamped(1.0) > 0.0);
        assert_abs_diff_eq!(logit_clamped(0.5), 0.0);
        assert_abs_diff_eq!(logit_clamped(0.0), -logit_clamped(1.0), epsilon = 1e-6);
    }

    #[test]
    fn argmax_takes_the_first_of_ties() {
        assert_eq!(argmax_first(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(argmax_first(&[f64::NAN, -1.0, -1.0]), Some(1));
        assert_eq!(argmax_first(&[]), None);
    }

    #[test]
    fn log_odds_matrix() {
        let p = array![[0.5, 0.0], [0.0, 1.0]];
        let l = log_odds(&p.view());
        assert_abs_diff_eq!(l[[0, 0]], 0.0);
        assert!(l[[0, 1]] < -20.0);
        assert!(l[[1, 1]] > 20.0);
        assert_eq!(l[[0, 1]], l[[1, 0]]);
    }
}
