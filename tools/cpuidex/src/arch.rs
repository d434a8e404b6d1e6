//! Guest (compiled) and host (native) instruction set names.

/// `IMAGE_FILE_MACHINE_*` values as reported by `IsWow64Process2`.
pub const MACHINE_UNKNOWN: u16 = 0x0000;
pub const MACHINE_I386: u16 = 0x014C;
pub const MACHINE_AMD64: u16 = 0x8664;
pub const MACHINE_ARM64: u16 = 0xAA64;

pub const UNKNOWN_HOST: &str = "Unknown host ISA";

/// Architecture this binary was compiled for.
pub fn guest_arch_name() -> &'static str {
    if cfg!(target_arch = "x86") {
        "32-bit x86"
    } else if cfg!(target_arch = "x86_64") {
        "64-bit x64/AMD64"
    } else if cfg!(target_arch = "arm64ec") {
        "64-bit emulation compatible ARM64EC"
    } else if cfg!(target_arch = "aarch64") {
        "64-bit classic ARM64"
    } else {
        std::env::consts::ARCH
    }
}

/// Machine code of the compiled architecture, used when the OS cannot tell us more.
pub fn guest_machine() -> u16 {
    if cfg!(target_arch = "x86") {
        MACHINE_I386
    } else if cfg!(target_arch = "x86_64") {
        MACHINE_AMD64
    } else if cfg!(any(target_arch = "aarch64", target_arch = "arm64ec")) {
        // ARM64EC processes only run on ARM64 hosts.
        MACHINE_ARM64
    } else {
        MACHINE_UNKNOWN
    }
}

/// Host names for the machines Windows 11 runs on. ARM64EC is never a host.
pub fn machine_name(machine: u16) -> Option<&'static str> {
    match machine {
        MACHINE_I386 => Some("32-bit x86"),
        MACHINE_AMD64 => Some("64-bit x64/AMD64"),
        MACHINE_ARM64 => Some("64-bit ARM64"),
        _ => None,
    }
}

/// Display name of `machine`, plus an `Unknown HostCPU <hex>` notice when it has none.
pub fn host_arch(machine: u16) -> (&'static str, Option<String>) {
    match machine_name(machine) {
        Some(name) => (name, None),
        None => (UNKNOWN_HOST, Some(format!("Unknown HostCPU {machine:X}"))),
    }
}

/// Native machine of the host.
pub fn host_machine() -> u16 {
    let machine = imp::native_machine();
    tracing::debug!(machine = format_args!("{machine:#06x}"), "resolved host machine");
    machine
}

#[cfg(windows)]
mod imp {
    use windows::core::{s, w, BOOL};
    use windows::Win32::Foundation::HANDLE;
    use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
    use windows::Win32::System::Threading::{GetCurrentProcess, IsWow64Process};

    use super::{guest_machine, MACHINE_AMD64};

    type IsWow64Process2Fn = unsafe extern "system" fn(HANDLE, *mut u16, *mut u16) -> BOOL;

    pub fn native_machine() -> u16 {
        if let Some(machine) = is_wow64_process2() {
            return machine;
        }

        // Before Windows 10 only x86-on-x64 WOW exists.
        let mut wow = BOOL::default();
        // SAFETY: the current-process pseudo handle is always valid and `wow` outlives the call.
        let is_wow = unsafe { IsWow64Process(GetCurrentProcess(), &mut wow) };
        match is_wow {
            Ok(()) if wow.as_bool() => MACHINE_AMD64,
            Ok(()) => guest_machine(),
            Err(err) => {
                tracing::debug!(%err, "IsWow64Process failed");
                guest_machine()
            }
        }
    }

    /// `IsWow64Process2` only exists on Windows 10 1709 and later, so it is looked up at
    /// runtime instead of linked.
    fn is_wow64_process2() -> Option<u16> {
        // SAFETY: kernel32 is mapped into every Win32 process.
        let kernel32 = unsafe { GetModuleHandleW(w!("kernel32.dll")) }.ok()?;
        // SAFETY: valid module handle and NUL-terminated name.
        let proc = unsafe { GetProcAddress(kernel32, s!("IsWow64Process2")) }?;
        // SAFETY: the exported symbol has exactly this signature.
        let is_wow64_process2: IsWow64Process2Fn = unsafe { std::mem::transmute(proc) };

        let mut process_machine = 0u16;
        let mut native_machine = 0u16;
        // SAFETY: both out pointers are valid for writes.
        let ok = unsafe {
            is_wow64_process2(
                GetCurrentProcess(),
                &mut process_machine,
                &mut native_machine,
            )
        };
        ok.as_bool().then_some(native_machine)
    }
}

#[cfg(not(windows))]
mod imp {
    pub fn native_machine() -> u16 {
        super::guest_machine()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_host_machines() {
        assert_eq!(machine_name(MACHINE_I386), Some("32-bit x86"));
        assert_eq!(machine_name(MACHINE_AMD64), Some("64-bit x64/AMD64"));
        assert_eq!(machine_name(MACHINE_ARM64), Some("64-bit ARM64"));
        assert_eq!(machine_name(MACHINE_UNKNOWN), None);
    }

    #[test]
    fn unknown_host_machine_carries_a_notice() {
        // RISC-V 64.
        assert_eq!(
            host_arch(0x5064),
            (UNKNOWN_HOST, Some("Unknown HostCPU 5064".to_string()))
        );
    }

    #[test]
    fn known_host_machine_has_no_notice() {
        assert_eq!(host_arch(MACHINE_AMD64), ("64-bit x64/AMD64", None));
    }

    #[cfg(all(target_arch = "x86_64", not(windows)))]
    #[test]
    fn host_matches_guest_outside_windows() {
        assert_eq!(host_machine(), MACHINE_AMD64);
        assert_eq!(guest_arch_name(), "64-bit x64/AMD64");
    }
}
