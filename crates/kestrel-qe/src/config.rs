use kestrel_core::{CancelHandle, LimitConfig};

/// Options for model-based projection.
#[derive(Debug, Clone)]
pub struct MbpConfig {
    /// Run syntactic light elimination before projecting.
    pub light_pre_pass: bool,
    /// Substitute the model value for variables no other rule eliminates.
    /// When disabled such variables are reported as residual.
    pub model_value_fallback: bool,
    pub light: LightConfig,
    pub limits: LimitConfig,
    pub cancel: Option<CancelHandle>,
}

impl Default for MbpConfig {
    fn default() -> Self {
        Self {
            light_pre_pass: true,
            model_value_fallback: true,
            light: LightConfig::default(),
            limits: LimitConfig::default(),
            cancel: None,
        }
    }
}

/// Options for light elimination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightConfig {
    /// Also solve arithmetic equalities for a variable with a usable
    /// coefficient (unit for Int, any non-zero for Real).
    pub arith_solve: bool,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self { arith_solve: true }
    }
}
