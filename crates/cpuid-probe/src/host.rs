//! Backend that executes the real instructions on the current processor.

use crate::backend::{CpuidBackend, CpuidResult, TimestampCounter, XcrReader};
use crate::error::Result;

/// The processor this process is running on.
///
/// Only constructible on x86 and x86-64 targets; elsewhere [`HostCpu::new`] reports
/// [`crate::ProbeError::UnsupportedArch`].
#[derive(Debug)]
pub struct HostCpu {
    inner: imp::Host,
}

impl HostCpu {
    pub fn new() -> Result<Self> {
        let inner = imp::Host::new()?;
        tracing::debug!(
            osxsave = inner.osxsave(),
            rdtscp = inner.rdtscp_available(),
            "host CPUID backend ready"
        );
        Ok(Self { inner })
    }
}

impl CpuidBackend for HostCpu {
    fn issue(&mut self, function: u32, sub_function: u32) -> CpuidResult {
        self.inner.cpuid(function, sub_function)
    }
}

impl TimestampCounter for HostCpu {
    fn rdtsc(&mut self) -> u64 {
        self.inner.rdtsc()
    }

    fn rdtscp(&mut self) -> Option<u64> {
        self.inner.rdtscp()
    }
}

impl XcrReader for HostCpu {
    fn xgetbv_intrinsic(&mut self, xcr: u32) -> Option<u64> {
        self.inner.xgetbv_intrinsic(xcr)
    }

    fn xgetbv_asm(&mut self, xcr: u32) -> Option<u64> {
        self.inner.xgetbv_asm(xcr)
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod imp {
    #[cfg(target_arch = "x86")]
    use core::arch::x86 as arch;
    #[cfg(target_arch = "x86_64")]
    use core::arch::x86_64 as arch;

    use crate::backend::CpuidResult;
    use crate::error::Result;

    const LEAF1_ECX_OSXSAVE: u32 = 1 << 27;
    const EXT1_EDX_RDTSCP: u32 = 1 << 27;

    #[derive(Debug)]
    pub(super) struct Host {
        osxsave: bool,
        rdtscp: bool,
    }

    impl Host {
        pub(super) fn new() -> Result<Self> {
            let max_basic = raw_cpuid(0, 0).eax;
            let osxsave = max_basic >= 1 && raw_cpuid(1, 0).ecx & LEAF1_ECX_OSXSAVE != 0;

            let max_ext = raw_cpuid(0x8000_0000, 0).eax;
            let rdtscp = (0x8000_0001..0x8000_1000).contains(&max_ext)
                && raw_cpuid(0x8000_0001, 0).edx & EXT1_EDX_RDTSCP != 0;

            Ok(Self { osxsave, rdtscp })
        }

        pub(super) fn osxsave(&self) -> bool {
            self.osxsave
        }

        pub(super) fn rdtscp_available(&self) -> bool {
            self.rdtscp
        }

        pub(super) fn cpuid(&self, function: u32, sub_function: u32) -> CpuidResult {
            raw_cpuid(function, sub_function)
        }

        pub(super) fn rdtsc(&self) -> u64 {
            // SAFETY: RDTSC is available on every processor Rust targets on x86.
            unsafe { arch::_rdtsc() }
        }

        pub(super) fn rdtscp(&self) -> Option<u64> {
            if !self.rdtscp {
                return None;
            }
            let mut aux = 0u32;
            // SAFETY: CPUID.80000001H:EDX.RDTSCP was checked at construction.
            Some(unsafe { arch::__rdtscp(&mut aux) })
        }

        pub(super) fn xgetbv_intrinsic(&self, xcr: u32) -> Option<u64> {
            if !self.osxsave {
                return None;
            }
            // SAFETY: OSXSAVE set means the OS enabled XGETBV.
            Some(unsafe { xgetbv_via_intrinsic(xcr) })
        }

        pub(super) fn xgetbv_asm(&self, xcr: u32) -> Option<u64> {
            if !self.osxsave {
                return None;
            }
            let lo: u32;
            let hi: u32;
            // SAFETY: OSXSAVE set means the OS enabled XGETBV. ECX selects the register.
            unsafe {
                core::arch::asm!(
                    "xgetbv",
                    in("ecx") xcr,
                    out("eax") lo,
                    out("edx") hi,
                    options(nomem, nostack, preserves_flags),
                );
            }
            Some((u64::from(hi) << 32) | u64::from(lo))
        }
    }

    fn raw_cpuid(function: u32, sub_function: u32) -> CpuidResult {
        // SAFETY: CPUID is always safe to execute on the processors Rust supports here.
        let r = unsafe { arch::__cpuid_count(function, sub_function) };
        CpuidResult::new(r.eax, r.ebx, r.ecx, r.edx)
    }

    #[target_feature(enable = "xsave")]
    unsafe fn xgetbv_via_intrinsic(xcr: u32) -> u64 {
        arch::_xgetbv(xcr)
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
mod imp {
    use core::convert::Infallible;

    use crate::backend::CpuidResult;
    use crate::error::{ProbeError, Result};

    #[derive(Debug)]
    pub(super) struct Host {
        never: Infallible,
    }

    impl Host {
        pub(super) fn new() -> Result<Self> {
            Err(ProbeError::UnsupportedArch {
                arch: std::env::consts::ARCH,
            })
        }

        pub(super) fn osxsave(&self) -> bool {
            match self.never {}
        }

        pub(super) fn rdtscp_available(&self) -> bool {
            match self.never {}
        }

        pub(super) fn cpuid(&self, _function: u32, _sub_function: u32) -> CpuidResult {
            match self.never {}
        }

        pub(super) fn rdtsc(&self) -> u64 {
            match self.never {}
        }

        pub(super) fn rdtscp(&self) -> Option<u64> {
            match self.never {}
        }

        pub(super) fn xgetbv_intrinsic(&self, _xcr: u32) -> Option<u64> {
            match self.never {}
        }

        pub(super) fn xgetbv_asm(&self, _xcr: u32) -> Option<u64> {
            match self.never {}
        }
    }
}

#[cfg(all(test, any(target_arch = "x86", target_arch = "x86_64")))]
mod tests {
    use super::*;

    #[test]
    fn host_reports_a_basic_maximum() {
        let mut cpu = HostCpu::new().unwrap();
        // Every x86-64 processor implements at least leaf 1.
        assert!(cpu.issue(0, 0).eax >= 1);
    }

    #[test]
    fn both_xgetbv_paths_agree_on_the_host() {
        let mut cpu = HostCpu::new().unwrap();
        assert_eq!(cpu.xgetbv_intrinsic(0), cpu.xgetbv_asm(0));
    }
}
