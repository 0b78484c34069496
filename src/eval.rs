//! Position evaluation hooks.
//!
//! An [`Evaluator`] scores an encoded per-player perspective (see
//! `table::view::PlayerView::as_vector`). Evaluation is pure
//! instrumentation: scores are recorded in the event log and never
//! influence move legality.

/// Scores one player's encoded perspective. Higher is better for that
/// player.
pub trait Evaluator: Send {
    fn evaluate(&self, perspective: &[f32]) -> f32;
}

/// A single linear layer: dot product of the perspective with a fixed
/// weight vector, plus a bias. Mismatched lengths truncate to the
/// shorter side.
#[derive(Clone, Debug)]
pub struct LinearEvaluator {
    weights: Vec<f32>,
    bias: f32,
}

impl LinearEvaluator {
    #[must_use]
    pub fn new(weights: Vec<f32>, bias: f32) -> Self {
        Self { weights, bias }
    }

    /// Uniform weights, useful as a smoke-test evaluator: the score is
    /// proportional to how many encoded features are set.
    #[must_use]
    pub fn uniform(weight: f32, len: usize) -> Self {
        Self::new(vec![weight; len], 0.0)
    }
}

impl Evaluator for LinearEvaluator {
    fn evaluate(&self, perspective: &[f32]) -> f32 {
        self.bias
            + self
                .weights
                .iter()
                .zip(perspective)
                .map(|(w, x)| w * x)
                .sum::<f32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_evaluator_dot_product() {
        let eval = LinearEvaluator::new(vec![1.0, -2.0, 0.5], 1.0);
        let score = eval.evaluate(&[2.0, 1.0, 4.0]);
        assert!((score - (1.0 + 2.0 - 2.0 + 2.0)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_linear_evaluator_length_mismatch_truncates() {
        let eval = LinearEvaluator::uniform(1.0, 2);
        assert!((eval.evaluate(&[3.0, 4.0, 100.0]) - 7.0).abs() < f32::EPSILON);
    }
}
