use crate::error::ConfigError;

/// Multiplier applied to simulated gas before a transaction is signed.
///
/// Simulation is not exact, so the estimate is padded. The result is rounded up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GasAdjustment(f64);

impl GasAdjustment {
    pub const DEFAULT: GasAdjustment = GasAdjustment(1.5);

    pub fn new(value: f64) -> Result<Self, ConfigError> {
        if value.is_finite() && value >= 1.0 {
            Ok(GasAdjustment(value))
        } else {
            Err(ConfigError::GasAdjustment(value))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// `ceil(adjustment * gas_used)`
    pub fn apply(self, gas_used: u64) -> u64 {
        (gas_used as f64 * self.0).ceil() as u64
    }
}

impl Default for GasAdjustment {
    fn default() -> Self {
        Self::DEFAULT
    }
}
