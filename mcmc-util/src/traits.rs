/// Decides from consecutive blocks of log-likelihood samples whether
/// a Markov chain has reached its stationary regime.
///
/// Implementations may keep history across calls; a fresh instance
/// starts over.
pub trait ConvergenceCriterion {
    /// Consume one block of samples and return whether the chain has
    /// converged. Once this returns `true` it keeps returning `true`.
    fn check(&mut self, samples: &[f64]) -> bool;

    /// Diagnostic for the most recent `check`. Empty when there is
    /// nothing new to report.
    fn report(&mut self) -> String;
}
