use std::io;

use thiserror::Error;

use crate::range::FunctionRange;

pub type Result<T> = std::result::Result<T, ProbeError>;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Function {function:08X} out of range for {range} functions limit {limit:08X}")]
    OutOfRange {
        function: u32,
        range: FunctionRange,
        limit: u32,
    },

    #[error("Function {function:08X} out of range, {range} functions are not present")]
    RangeAbsent { function: u32, range: FunctionRange },

    #[error("CPUID is not available on {arch} hosts")]
    UnsupportedArch { arch: &'static str },

    #[error("console write failed: {0}")]
    Io(#[from] io::Error),
}

impl ProbeError {
    /// Whether this error is a rejected query rather than a fatal failure.
    pub fn is_range_rejection(&self) -> bool {
        matches!(self, Self::OutOfRange { .. } | Self::RangeAbsent { .. })
    }
}
