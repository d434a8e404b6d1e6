//! The probe session: one backend, one console, the discovered ranges and the warning tally.

use std::fmt;
use std::io::Write;

use crate::backend::{CpuidBackend, CpuidReg, CpuidResult};
use crate::error::Result;
use crate::features::{extract_bit, extract_bits, Feature, Probe};
use crate::range::FunctionRanges;
use crate::signature::{AdditionalInfo, ProcessorSignature};
use crate::vendor::{self, CpuVendor};

/// State of a single probing run.
///
/// All console output (range warnings, check results, the report) goes to `out`, so a
/// session over a [`crate::stub::StubCpu`] and a `Vec<u8>` reproduces a full run in
/// memory.
#[derive(Debug)]
pub struct ProbeSession<B, W> {
    backend: B,
    out: W,
    ranges: FunctionRanges,
    warnings: u32,
    vendor: CpuVendor,
}

impl<B: CpuidBackend, W: Write> ProbeSession<B, W> {
    /// Discover the function ranges and start a session.
    pub fn new(mut backend: B, out: W) -> Self {
        let ranges = FunctionRanges::discover(&mut backend);
        Self::with_ranges(backend, out, ranges)
    }

    /// Start a session with already known ranges.
    pub fn with_ranges(backend: B, out: W, ranges: FunctionRanges) -> Self {
        Self {
            backend,
            out,
            ranges,
            warnings: 0,
            vendor: CpuVendor::Unknown,
        }
    }

    pub fn ranges(&self) -> FunctionRanges {
        self.ranges
    }

    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    /// Vendor classification from the last [`Self::vendor_string`] call.
    pub fn vendor(&self) -> CpuVendor {
        self.vendor
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn out(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_parts(self) -> (B, W) {
        (self.backend, self.out)
    }

    /// Range-checked CPUID query.
    ///
    /// A function outside the discovered ranges is not issued: the session prints the
    /// reason and returns all zeros. The only error is a failed console write.
    pub fn query(&mut self, function: u32, sub_function: u32) -> Result<CpuidResult> {
        match self.ranges.check(function) {
            Ok(()) => Ok(self.backend.issue(function, sub_function)),
            Err(err) if err.is_range_rejection() => {
                tracing::warn!(function, sub_function, "{err}");
                writeln!(self.out, "{err}")?;
                Ok(CpuidResult::ZERO)
            }
            Err(err) => Err(err),
        }
    }

    pub fn reg(&mut self, function: u32, sub_function: u32, reg: CpuidReg) -> Result<u32> {
        Ok(self.query(function, sub_function)?.reg(reg))
    }

    pub fn bit(
        &mut self,
        function: u32,
        sub_function: u32,
        reg: CpuidReg,
        index: u32,
    ) -> Result<bool> {
        Ok(extract_bit(self.reg(function, sub_function, reg)?, index))
    }

    pub fn bitfield(
        &mut self,
        function: u32,
        sub_function: u32,
        reg: CpuidReg,
        index: u32,
        width: u32,
    ) -> Result<u32> {
        Ok(extract_bits(self.reg(function, sub_function, reg)?, index, width))
    }

    pub fn has(&mut self, feature: Feature) -> Result<bool> {
        match feature.probe() {
            Probe::Bit(loc) => self.bit(loc.function, loc.sub_function, loc.reg, loc.bit),
            Probe::All(parts) => {
                for part in parts {
                    if !self.has(*part)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    /// Leaf 0 vendor signature. Also records the vendor classification.
    pub fn vendor_string(&mut self) -> Result<[u8; 12]> {
        let r = self.query(0, 0)?;
        let signature = vendor::signature_from_regs(r.ebx, r.edx, r.ecx);
        self.vendor = CpuVendor::classify(&signature);
        tracing::debug!(vendor = %self.vendor, "classified CPU vendor");
        Ok(signature)
    }

    /// The 48-byte processor brand string from leaves `0x8000_0002..=0x8000_0004`.
    pub fn model_string(&mut self) -> Result<[u8; 48]> {
        let mut brand = [0u8; 48];
        for (i, chunk) in brand.chunks_exact_mut(16).enumerate() {
            let r = self.query(0x8000_0002 + i as u32, 0)?;
            chunk.copy_from_slice(&r.to_le_bytes());
        }
        Ok(brand)
    }

    pub fn signature(&mut self) -> Result<(ProcessorSignature, AdditionalInfo)> {
        let r = self.query(1, 0)?;
        Ok((
            ProcessorSignature::from_eax(r.eax),
            AdditionalInfo::from_ebx(r.ebx),
        ))
    }

    /// Count a failed consistency check and print it.
    pub fn warn(&mut self, message: fmt::Arguments<'_>) -> Result<()> {
        self.warnings += 1;
        tracing::warn!(warnings = self.warnings, "{message}");
        writeln!(self.out, "Warning: {message}")?;
        Ok(())
    }

    /// Warn when `feature` is absent. Returns whether it was present.
    pub fn require(&mut self, feature: Feature) -> Result<bool> {
        let present = self.has(feature)?;
        if !present {
            self.warn(format_args!("feature {} is missing", feature.name()))?;
        }
        Ok(present)
    }
}
