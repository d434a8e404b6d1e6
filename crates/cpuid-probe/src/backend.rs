//! Hardware access seams.
//!
//! Everything the prober needs from the processor goes through one of the traits in this
//! module, so the range checks, feature table and self-checks can run against
//! [`crate::stub::StubCpu`] as easily as against real hardware.

/// A CPUID result tuple (EAX, EBX, ECX, EDX).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuidResult {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

impl CpuidResult {
    pub const ZERO: Self = Self {
        eax: 0,
        ebx: 0,
        ecx: 0,
        edx: 0,
    };

    pub const fn new(eax: u32, ebx: u32, ecx: u32, edx: u32) -> Self {
        Self { eax, ebx, ecx, edx }
    }

    pub fn reg(&self, reg: CpuidReg) -> u32 {
        match reg {
            CpuidReg::Eax => self.eax,
            CpuidReg::Ebx => self.ebx,
            CpuidReg::Ecx => self.ecx,
            CpuidReg::Edx => self.edx,
        }
    }

    /// The registers in little-endian byte order, EAX first.
    pub fn to_le_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0..4].copy_from_slice(&self.eax.to_le_bytes());
        out[4..8].copy_from_slice(&self.ebx.to_le_bytes());
        out[8..12].copy_from_slice(&self.ecx.to_le_bytes());
        out[12..16].copy_from_slice(&self.edx.to_le_bytes());
        out
    }
}

/// Output register of a CPUID query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuidReg {
    Eax,
    Ebx,
    Ecx,
    Edx,
}

/// Issues raw CPUID queries.
///
/// Implementations must not apply any range policy; that is the session's job.
pub trait CpuidBackend {
    fn issue(&mut self, function: u32, sub_function: u32) -> CpuidResult;
}

/// Source of time-stamp counter reads for the monotonicity check.
pub trait TimestampCounter {
    /// `RDTSC`.
    fn rdtsc(&mut self) -> u64;

    /// `RDTSCP`, or `None` when the instruction is unavailable.
    fn rdtscp(&mut self) -> Option<u64>;
}

/// Two independent ways of reading an extended control register.
///
/// Both return `None` when `XGETBV` cannot be executed (CR4.OSXSAVE clear).
pub trait XcrReader {
    /// Read through the compiler intrinsic.
    fn xgetbv_intrinsic(&mut self, xcr: u32) -> Option<u64>;

    /// Read through a hand-written `xgetbv` sequence.
    fn xgetbv_asm(&mut self, xcr: u32) -> Option<u64>;
}

impl<T: CpuidBackend + ?Sized> CpuidBackend for &mut T {
    fn issue(&mut self, function: u32, sub_function: u32) -> CpuidResult {
        (**self).issue(function, sub_function)
    }
}

impl<T: TimestampCounter + ?Sized> TimestampCounter for &mut T {
    fn rdtsc(&mut self) -> u64 {
        (**self).rdtsc()
    }

    fn rdtscp(&mut self) -> Option<u64> {
        (**self).rdtscp()
    }
}

impl<T: XcrReader + ?Sized> XcrReader for &mut T {
    fn xgetbv_intrinsic(&mut self, xcr: u32) -> Option<u64> {
        (**self).xgetbv_intrinsic(xcr)
    }

    fn xgetbv_asm(&mut self, xcr: u32) -> Option<u64> {
        (**self).xgetbv_asm(xcr)
    }
}
