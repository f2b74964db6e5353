use kestrel_core::{CancelHandle, LimitConfig};

/// Options for the equation simplifier.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Run the full linear step (not only two-monomial equations) while the
    /// number of live equations is at most this.
    pub linear_full_threshold: usize,
    /// Cap on the products added by exlin augmentation.
    pub exlin_max_new: usize,
    /// Augmented products above this degree are skipped.
    pub exlin_max_degree: u32,
    /// Upper bound on simplification rounds per call; exceeding it fails
    /// with [`PddError::RoundLimit`](crate::PddError::RoundLimit).
    pub max_rounds: usize,
    pub limits: LimitConfig,
    pub cancel: Option<CancelHandle>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            linear_full_threshold: 64,
            exlin_max_new: 500,
            exlin_max_degree: 5,
            max_rounds: 10_000,
            limits: LimitConfig::default(),
            cancel: None,
        }
    }
}
