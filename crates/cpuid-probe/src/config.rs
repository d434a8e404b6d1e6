/// Knobs for the self-checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Iterations of the TSC monotonicity loop before it reports success.
    pub tsc_attempts: u32,
    /// Require the features every 64-bit capable processor has (CX16, HTT, RDTSCP).
    pub require_64bit_features: bool,
}

impl ProbeConfig {
    pub const DEFAULT_TSC_ATTEMPTS: u32 = 1_000_000;
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            tsc_attempts: Self::DEFAULT_TSC_ATTEMPTS,
            require_64bit_features: cfg!(target_arch = "x86_64"),
        }
    }
}
