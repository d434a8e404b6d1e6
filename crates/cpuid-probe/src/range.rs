//! CPUID function ranges and their discovery.
//!
//! CPUID functions live in three disjoint intervals. Each interval reports its own maximum
//! through a query at its base function, and querying past that maximum returns undefined
//! data (Intel returns the highest basic leaf, others return zeros or whatever the
//! hypervisor feels like). The session refuses such queries instead.

use std::fmt;

use crate::backend::CpuidBackend;
use crate::error::{ProbeError, Result};

pub const BASIC_BASE: u32 = 0x0000_0000;
pub const HYPERVISOR_BASE: u32 = 0x4000_0000;
pub const EXTENDED_BASE: u32 = 0x8000_0000;

/// A reported maximum must lie below `base + RANGE_PLAUSIBLE_SPAN` to be trusted.
pub const RANGE_PLAUSIBLE_SPAN: u32 = 0x1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionRange {
    Basic,
    Hypervisor,
    Extended,
}

impl FunctionRange {
    pub fn base(self) -> u32 {
        match self {
            Self::Basic => BASIC_BASE,
            Self::Hypervisor => HYPERVISOR_BASE,
            Self::Extended => EXTENDED_BASE,
        }
    }

    pub fn of(function: u32) -> Self {
        if function >= EXTENDED_BASE {
            Self::Extended
        } else if function >= HYPERVISOR_BASE {
            Self::Hypervisor
        } else {
            Self::Basic
        }
    }
}

impl fmt::Display for FunctionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => f.write_str("basic"),
            Self::Hypervisor => f.write_str("hyper"),
            Self::Extended => f.write_str("extended"),
        }
    }
}

/// Discovered maxima of the three ranges. A zero hypervisor or extended maximum means the
/// range is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FunctionRanges {
    pub max_basic: u32,
    pub max_hypervisor: u32,
    pub max_extended: u32,
}

impl FunctionRanges {
    /// Probe the base function of every range.
    ///
    /// Queries go straight to the backend; nothing is known about the ranges yet.
    pub fn discover<B: CpuidBackend + ?Sized>(backend: &mut B) -> Self {
        let max_basic = backend.issue(BASIC_BASE, 0).eax;
        let max_hypervisor =
            accept_range_max(HYPERVISOR_BASE, backend.issue(HYPERVISOR_BASE, 0).eax);
        let max_extended = accept_range_max(EXTENDED_BASE, backend.issue(EXTENDED_BASE, 0).eax);

        let ranges = Self {
            max_basic,
            max_hypervisor,
            max_extended,
        };
        tracing::debug!(
            max_basic = format_args!("{max_basic:#010x}"),
            max_hypervisor = format_args!("{max_hypervisor:#010x}"),
            max_extended = format_args!("{max_extended:#010x}"),
            "discovered CPUID function ranges"
        );
        ranges
    }

    pub fn has_hypervisor(&self) -> bool {
        self.max_hypervisor != 0
    }

    pub fn has_extended(&self) -> bool {
        self.max_extended != 0
    }

    pub fn max_of(&self, range: FunctionRange) -> u32 {
        match range {
            FunctionRange::Basic => self.max_basic,
            FunctionRange::Hypervisor => self.max_hypervisor,
            FunctionRange::Extended => self.max_extended,
        }
    }

    /// Decide whether `function` may be queried.
    pub fn check(&self, function: u32) -> Result<()> {
        let range = FunctionRange::of(function);
        let limit = self.max_of(range);

        if range != FunctionRange::Basic && limit == 0 {
            return Err(ProbeError::RangeAbsent { function, range });
        }
        if function > limit {
            return Err(ProbeError::OutOfRange {
                function,
                range,
                limit,
            });
        }
        Ok(())
    }
}

/// Plausibility filter for a reported range maximum: it must not be below `base` and must
/// stay within [`RANGE_PLAUSIBLE_SPAN`] of it. Anything else is treated as "range absent".
pub fn accept_range_max(base: u32, reported: u32) -> u32 {
    match reported.checked_sub(base) {
        Some(span) if span < RANGE_PLAUSIBLE_SPAN => reported,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(max_basic: u32, max_hypervisor: u32, max_extended: u32) -> FunctionRanges {
        FunctionRanges {
            max_basic,
            max_hypervisor,
            max_extended,
        }
    }

    #[test]
    fn hypervisor_max_equal_to_base_is_accepted() {
        assert_eq!(accept_range_max(HYPERVISOR_BASE, HYPERVISOR_BASE), HYPERVISOR_BASE);
    }

    #[test]
    fn implausible_maxima_are_rejected() {
        assert_eq!(accept_range_max(HYPERVISOR_BASE, HYPERVISOR_BASE + 0x1001), 0);
        assert_eq!(accept_range_max(HYPERVISOR_BASE, HYPERVISOR_BASE + 0x1000), 0);
        assert_eq!(accept_range_max(HYPERVISOR_BASE, 0x0000_0016), 0);
        assert_eq!(accept_range_max(EXTENDED_BASE, 0x8000_0008), 0x8000_0008);
        assert_eq!(accept_range_max(EXTENDED_BASE, 0x0000_0016), 0);
    }

    #[test]
    fn basic_functions_past_the_maximum_are_rejected() {
        let r = ranges(0x16, 0, 0x8000_0008);
        assert!(r.check(0x16).is_ok());
        let err = r.check(0x17).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Function 00000017 out of range for basic functions limit 00000016"
        );
        assert!(r.check(0x3FFF_FFFF).is_err());
    }

    #[test]
    fn absent_hypervisor_range_rejects_every_hypervisor_function() {
        let r = ranges(0x16, 0, 0x8000_0008);
        for function in [HYPERVISOR_BASE, HYPERVISOR_BASE + 1, 0x7FFF_FFFF] {
            assert!(matches!(
                r.check(function),
                Err(ProbeError::RangeAbsent {
                    range: FunctionRange::Hypervisor,
                    ..
                })
            ));
        }
    }

    #[test]
    fn present_hypervisor_range_is_bounded_by_its_maximum() {
        let r = ranges(0x16, 0x4000_000B, 0x8000_0008);
        assert!(r.check(HYPERVISOR_BASE).is_ok());
        assert!(r.check(0x4000_000B).is_ok());
        let err = r.check(0x4000_000C).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Function 4000000C out of range for hyper functions limit 4000000B"
        );
    }

    #[test]
    fn extended_range_is_bounded_or_absent() {
        let r = ranges(0x16, 0, 0x8000_0008);
        assert!(r.check(0x8000_0008).is_ok());
        assert!(r.check(0x8000_0009).is_err());
        assert!(r.check(0xFFFF_FFFF).is_err());

        let absent = ranges(0x16, 0, 0);
        let err = absent.check(EXTENDED_BASE).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Function 80000000 out of range, extended functions are not present"
        );
    }

    #[test]
    fn range_of_function() {
        assert_eq!(FunctionRange::of(0), FunctionRange::Basic);
        assert_eq!(FunctionRange::of(0x3FFF_FFFF), FunctionRange::Basic);
        assert_eq!(FunctionRange::of(0x4000_0000), FunctionRange::Hypervisor);
        assert_eq!(FunctionRange::of(0x8000_0000), FunctionRange::Extended);
    }
}
