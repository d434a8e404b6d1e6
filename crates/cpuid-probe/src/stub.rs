//! Deterministic in-memory backend.
//!
//! `StubCpu` answers CPUID from a fixed table (unknown leaves return zeros, like real
//! hardware does for reserved leaves on AMD) and counts every issued query so tests can
//! assert that the session refused out-of-range functions without touching the backend.

use std::collections::BTreeMap;

use crate::backend::{CpuidBackend, CpuidReg, CpuidResult, TimestampCounter, XcrReader};
use crate::vendor;

#[derive(Debug, Clone, Default)]
pub struct StubCpu {
    leaves: BTreeMap<(u32, u32), CpuidResult>,
    issued: Vec<(u32, u32)>,
    tsc: StubTsc,
    xcr0_intrinsic: Option<u64>,
    xcr0_asm: Option<u64>,
}

/// Behaviour of the stub time-stamp counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubTsc {
    /// Strictly increasing by `step` per read.
    Ticking { now: u64, step: u64 },
    /// Every read returns the same value.
    Stuck(u64),
    /// `RDTSC` ticks but `RDTSCP` is stuck.
    StuckRdtscp { now: u64 },
    /// `RDTSC` ticks and `RDTSCP` is unavailable.
    NoRdtscp { now: u64 },
}

impl Default for StubTsc {
    fn default() -> Self {
        Self::Ticking { now: 0, step: 1 }
    }
}

impl StubCpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the result of `(function, sub_function)`.
    pub fn with_leaf(mut self, function: u32, sub_function: u32, result: CpuidResult) -> Self {
        self.leaves.insert((function, sub_function), result);
        self
    }

    /// Set leaf 0: maximum basic function and vendor signature.
    pub fn with_vendor(self, max_basic: u32, signature: &[u8; 12]) -> Self {
        let (ebx, edx, ecx) = vendor::signature_regs(signature);
        self.with_leaf(0, 0, CpuidResult::new(max_basic, ebx, ecx, edx))
    }

    /// Set leaves `0x8000_0002..=0x8000_0004` from a brand string, NUL terminated and
    /// truncated to 47 bytes.
    pub fn with_brand(mut self, brand: &str) -> Self {
        let mut bytes = [0u8; 48];
        let n = brand.len().min(47);
        bytes[..n].copy_from_slice(&brand.as_bytes()[..n]);
        for (i, chunk) in bytes.chunks_exact(16).enumerate() {
            let word = |o: usize| {
                u32::from_le_bytes([chunk[o], chunk[o + 1], chunk[o + 2], chunk[o + 3]])
            };
            self.leaves.insert(
                (0x8000_0002 + i as u32, 0),
                CpuidResult::new(word(0), word(4), word(8), word(12)),
            );
        }
        self
    }

    /// OR `mask` into one register of a leaf, creating the leaf if needed.
    pub fn set_bits(&mut self, function: u32, sub_function: u32, reg: CpuidReg, mask: u32) {
        let entry = self.leaves.entry((function, sub_function)).or_default();
        match reg {
            CpuidReg::Eax => entry.eax |= mask,
            CpuidReg::Ebx => entry.ebx |= mask,
            CpuidReg::Ecx => entry.ecx |= mask,
            CpuidReg::Edx => entry.edx |= mask,
        }
    }

    /// Clear `mask` in one register of a leaf.
    pub fn clear_bits(&mut self, function: u32, sub_function: u32, reg: CpuidReg, mask: u32) {
        if let Some(entry) = self.leaves.get_mut(&(function, sub_function)) {
            match reg {
                CpuidReg::Eax => entry.eax &= !mask,
                CpuidReg::Ebx => entry.ebx &= !mask,
                CpuidReg::Ecx => entry.ecx &= !mask,
                CpuidReg::Edx => entry.edx &= !mask,
            }
        }
    }

    pub fn with_tsc(mut self, tsc: StubTsc) -> Self {
        self.tsc = tsc;
        self
    }

    /// Values returned by the two XCR0 read paths.
    pub fn with_xcr0(mut self, intrinsic: Option<u64>, asm: Option<u64>) -> Self {
        self.xcr0_intrinsic = intrinsic;
        self.xcr0_asm = asm;
        self
    }

    /// Every `(function, sub_function)` issued so far, in order.
    pub fn issued(&self) -> &[(u32, u32)] {
        &self.issued
    }

    /// A Skylake-class desktop part: every feature the self-checks require, no AVX-512,
    /// no hypervisor leaves.
    pub fn modern_intel() -> Self {
        Self::new()
            .with_vendor(0x16, b"GenuineIntel")
            .with_leaf(1, 0, CpuidResult::new(0x0009_06EA, 0x0010_0800, 0x7FFA_FBFF, 0xBFEB_FBFF))
            .with_leaf(7, 0, CpuidResult::new(0, 0x029C_67AF, 0x4000_0000, 0xBC00_0400))
            .with_leaf(13, 1, CpuidResult::new(0x0F, 0, 0, 0))
            .with_leaf(0x8000_0000, 0, CpuidResult::new(0x8000_0008, 0, 0, 0))
            .with_leaf(0x8000_0001, 0, CpuidResult::new(0, 0, 0x0000_0121, 0x2C10_0800))
            .with_leaf(0x8000_0007, 0, CpuidResult::new(0, 0, 0, 0x0000_0100))
            .with_brand("Intel(R) Core(TM) i7-8700K CPU @ 3.70GHz")
            .with_xcr0(Some(0x1F), Some(0x1F))
    }
}

impl CpuidBackend for StubCpu {
    fn issue(&mut self, function: u32, sub_function: u32) -> CpuidResult {
        self.issued.push((function, sub_function));
        self.leaves
            .get(&(function, sub_function))
            .copied()
            .unwrap_or(CpuidResult::ZERO)
    }
}

impl TimestampCounter for StubCpu {
    fn rdtsc(&mut self) -> u64 {
        match &mut self.tsc {
            StubTsc::Ticking { now, step } => {
                *now += *step;
                *now
            }
            StubTsc::Stuck(value) => *value,
            StubTsc::StuckRdtscp { now } | StubTsc::NoRdtscp { now } => {
                *now += 1;
                *now
            }
        }
    }

    fn rdtscp(&mut self) -> Option<u64> {
        match &mut self.tsc {
            StubTsc::Ticking { now, step } => {
                *now += *step;
                Some(*now)
            }
            StubTsc::Stuck(value) => Some(*value),
            StubTsc::StuckRdtscp { now } => Some(*now),
            StubTsc::NoRdtscp { .. } => None,
        }
    }
}

impl XcrReader for StubCpu {
    fn xgetbv_intrinsic(&mut self, xcr: u32) -> Option<u64> {
        if xcr == 0 {
            self.xcr0_intrinsic
        } else {
            None
        }
    }

    fn xgetbv_asm(&mut self, xcr: u32) -> Option<u64> {
        if xcr == 0 {
            self.xcr0_asm
        } else {
            None
        }
    }
}
