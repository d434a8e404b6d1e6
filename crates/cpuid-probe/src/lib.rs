//! CPUID feature probing.
//!
//! A [`ProbeSession`] discovers the basic, hypervisor and extended function ranges once,
//! then answers range-checked queries against them. On top of that sit the feature table
//! ([`features`]), the consistency self-checks ([`checks`]) and the text report
//! ([`report`]).
//!
//! The processor is reached through the [`CpuidBackend`], [`TimestampCounter`] and
//! [`XcrReader`] traits: [`HostCpu`] executes the real instructions, [`StubCpu`] replays a
//! scripted processor for tests.

pub mod backend;
pub mod checks;
pub mod config;
pub mod error;
pub mod features;
pub mod host;
pub mod range;
pub mod report;
pub mod session;
pub mod signature;
pub mod stub;
pub mod vendor;

pub use backend::{CpuidBackend, CpuidReg, CpuidResult, TimestampCounter, XcrReader};
pub use config::ProbeConfig;
pub use error::{ProbeError, Result};
pub use features::{Feature, Probe};
pub use host::HostCpu;
pub use range::{FunctionRange, FunctionRanges};
pub use report::{ReportHeader, ReportOutcome};
pub use session::ProbeSession;
pub use stub::{StubCpu, StubTsc};
pub use vendor::CpuVendor;
