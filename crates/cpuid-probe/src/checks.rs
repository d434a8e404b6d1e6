//! Consistency self-checks.
//!
//! Each check prints its own diagnostics and bumps the session's warning counter on
//! failure. None of them stops the run.

use std::io::Write;

use crate::backend::{CpuidBackend, TimestampCounter, XcrReader};
use crate::config::ProbeConfig;
use crate::error::Result;
use crate::features::Feature;
use crate::session::ProbeSession;

/// Present on every CPU that can run this build at all.
const ALWAYS_REQUIRED: &[Feature] = &[Feature::Clflush, Feature::Pae];

/// Present on every 64-bit capable CPU (all of them are multi-core).
const REQUIRED_64BIT: &[Feature] = &[Feature::Cx16, Feature::Htt, Feature::Rdtscp];

/// Hardware AES and AVX shipped together with these.
const BUNDLED_WITH_AES_OR_AVX: &[Feature] = &[
    Feature::Ssse3,
    Feature::Sse41,
    Feature::Sse42,
    Feature::Osxsave,
    Feature::Xsave,
    Feature::TscInvariant,
];

/// Result of the TSC monotonicity loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TscOutcome {
    Passed,
    RdtscRepeated,
    RdtscpRepeated,
}

/// Run every check in order.
pub fn run_all<B, W>(session: &mut ProbeSession<B, W>, config: &ProbeConfig) -> Result<()>
where
    B: CpuidBackend + TimestampCounter + XcrReader,
    W: Write,
{
    writeln!(session.out(), "\nChecking for possible missing features:")?;
    check_required_features(session, config)?;
    check_bundled_features(session)?;
    check_model_string(session)?;
    check_xgetbv(session)?;
    check_tsc(session, config.tsc_attempts)?;
    Ok(())
}

pub fn check_required_features<B: CpuidBackend, W: Write>(
    session: &mut ProbeSession<B, W>,
    config: &ProbeConfig,
) -> Result<()> {
    for feature in ALWAYS_REQUIRED {
        session.require(*feature)?;
    }
    if config.require_64bit_features {
        for feature in REQUIRED_64BIT {
            session.require(*feature)?;
        }
    }
    Ok(())
}

pub fn check_bundled_features<B: CpuidBackend, W: Write>(
    session: &mut ProbeSession<B, W>,
) -> Result<()> {
    let aes = session.has(Feature::Aes)?;
    let avx = session.has(Feature::Avx)?;
    if aes || avx {
        for feature in BUNDLED_WITH_AES_OR_AVX {
            session.require(*feature)?;
        }
    }

    // XGETBV is how software discovers whether the OS saves the AVX state.
    if avx || session.has(Feature::Avx2)? {
        session.require(Feature::Osxsave)?;
    }
    Ok(())
}

/// The brand string should start with real text, not padding.
pub fn check_model_string<B: CpuidBackend, W: Write>(
    session: &mut ProbeSession<B, W>,
) -> Result<()> {
    let model = session.model_string()?;
    if model[0] == b' ' {
        session.warn(format_args!("model string should not start with spaces"))?;
    }
    Ok(())
}

/// Compare XCR0 read through the intrinsic and through hand-written assembly.
pub fn check_xgetbv<B, W>(session: &mut ProbeSession<B, W>) -> Result<()>
where
    B: CpuidBackend + XcrReader,
    W: Write,
{
    if !(session.has(Feature::Xsave)? && session.has(Feature::Osxsave)?) {
        return Ok(());
    }

    writeln!(session.out(), "\nChecking for XGETBV consistency:")?;

    let intrinsic = session.backend_mut().xgetbv_intrinsic(0);
    let asm = session.backend_mut().xgetbv_asm(0);
    writeln!(session.out(), "xgetbv(0) intrinsic  = {}", fmt_xcr(intrinsic))?;
    writeln!(session.out(), "xgetbv(0) asm func   = {}", fmt_xcr(asm))?;

    if intrinsic != asm {
        session.warn(format_args!("XGETBV return value mismatch"))?;
    }
    Ok(())
}

fn fmt_xcr(value: Option<u64>) -> String {
    match value {
        Some(v) => format!("{v:08X}"),
        None => "unavailable".to_string(),
    }
}

/// Read the time-stamp counter twice in a row, up to `attempts` times. Two equal reads
/// mean the counter is not strictly increasing.
///
/// Not finding a repeat is evidence, not proof; `attempts` bounds how hard we look.
pub fn check_tsc<B, W>(session: &mut ProbeSession<B, W>, attempts: u32) -> Result<TscOutcome>
where
    B: CpuidBackend + TimestampCounter,
    W: Write,
{
    writeln!(session.out(), "\nChecking for TSC consistency:")?;

    let outcome = {
        let tsc = session.backend_mut();
        let mut outcome = TscOutcome::Passed;
        for _ in 0..attempts {
            if tsc.rdtsc() == tsc.rdtsc() {
                outcome = TscOutcome::RdtscRepeated;
                break;
            }
            let first = tsc.rdtscp();
            let second = tsc.rdtscp();
            if first.is_some() && first == second {
                outcome = TscOutcome::RdtscpRepeated;
                break;
            }
        }
        outcome
    };

    match outcome {
        TscOutcome::Passed => writeln!(session.out(), "TSC consistency checks passed")?,
        TscOutcome::RdtscRepeated => session.warn(format_args!(
            "RDTSC returned the same value, needs to be monotonically increasing"
        ))?,
        TscOutcome::RdtscpRepeated => session.warn(format_args!(
            "RDTSCP returned the same value, needs to be monotonically increasing"
        ))?,
    }
    Ok(outcome)
}
