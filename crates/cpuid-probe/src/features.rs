//! Named CPUID feature flags.
//!
//! See: <https://www.felixcloutier.com/x86/cpuid>

use crate::backend::CpuidReg::{self, Eax, Ebx, Ecx, Edx};

/// Location of a single feature bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureBit {
    pub function: u32,
    pub sub_function: u32,
    pub reg: CpuidReg,
    pub bit: u32,
}

/// How a feature's presence is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Bit(FeatureBit),
    /// Present only when every listed feature is present.
    All(&'static [Feature]),
}

const fn bit(function: u32, sub_function: u32, reg: CpuidReg, bit: u32) -> Probe {
    Probe::Bit(FeatureBit {
        function,
        sub_function,
        reg,
        bit,
    })
}

macro_rules! features {
    ($($(#[$attr:meta])* $variant:ident => $name:literal, $probe:expr;)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Feature {
            $($(#[$attr])* $variant,)*
        }

        impl Feature {
            pub const ALL: &'static [Feature] = &[$(Feature::$variant,)*];

            /// Short name used in the report and in missing-feature warnings.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Feature::$variant => $name,)*
                }
            }

            pub const fn probe(self) -> Probe {
                match self {
                    $(Feature::$variant => $probe,)*
                }
            }
        }
    };
}

features! {
    // 486 and 32-bit Pentium era, CPUID.1:EDX.
    X87 => "X87", bit(1, 0, Edx, 0);
    Vme => "VME", bit(1, 0, Edx, 1);
    De => "DE", bit(1, 0, Edx, 2);
    Pse => "PSE", bit(1, 0, Edx, 3);
    Tsc => "TSC", bit(1, 0, Edx, 4);
    Msr => "MSR", bit(1, 0, Edx, 5);
    Pae => "PAE", bit(1, 0, Edx, 6);
    Cx8 => "CX8", bit(1, 0, Edx, 8);
    Apic => "APIC", bit(1, 0, Edx, 9);
    /// SYSENTER/SYSEXIT.
    Sep => "SEP", bit(1, 0, Edx, 11);
    Cmov => "CMOV", bit(1, 0, Edx, 15);
    /// FCMOVcc needs both an FPU and CMOV.
    Fcmov => "FCMOV", Probe::All(&[Feature::X87, Feature::Cmov]);
    Pat => "PAT", bit(1, 0, Edx, 16);
    Pse36 => "PSE36", bit(1, 0, Edx, 17);
    Clflush => "CLFLUSH", bit(1, 0, Edx, 19);
    Acpi => "ACPI", bit(1, 0, Edx, 22);
    Mmx => "MMX", bit(1, 0, Edx, 23);
    Fxsr => "FXSAVE", bit(1, 0, Edx, 24);
    Sse => "SSE", bit(1, 0, Edx, 25);
    Sse2 => "SSE2", bit(1, 0, Edx, 26);
    Htt => "HTT", bit(1, 0, Edx, 28);

    // Vista/Win7 era Core and AMD64, CPUID.1:ECX.
    Sse3 => "SSE3", bit(1, 0, Ecx, 0);
    Pclmul => "PCLMUL", bit(1, 0, Ecx, 1);
    Monitor => "MWAIT", bit(1, 0, Ecx, 3);
    Vmx => "VT-x", bit(1, 0, Ecx, 5);
    Smx => "SMX", bit(1, 0, Ecx, 6);
    /// Enhanced SpeedStep.
    Eist => "EIST", bit(1, 0, Ecx, 7);
    Ssse3 => "SSSE3", bit(1, 0, Ecx, 9);
    Fma => "FMA", bit(1, 0, Ecx, 12);
    Cx16 => "CX16", bit(1, 0, Ecx, 13);
    Sse41 => "SSE41", bit(1, 0, Ecx, 19);
    Sse42 => "SSE42", bit(1, 0, Ecx, 20);
    Movbe => "MOVBE", bit(1, 0, Ecx, 22);
    Popcnt => "POPCNT", bit(1, 0, Ecx, 23);
    Aes => "AES", bit(1, 0, Ecx, 25);
    Xsave => "XSAVE", bit(1, 0, Ecx, 26);
    Osxsave => "OSXSAVE", bit(1, 0, Ecx, 27);
    Avx => "AVX", bit(1, 0, Ecx, 28);
    F16c => "F16C", bit(1, 0, Ecx, 29);
    Rdrand => "RDRAND", bit(1, 0, Ecx, 30);

    // CPUID.80000001H:ECX, mostly AMD-defined.
    Lahf64 => "LAHF64", bit(0x8000_0001, 0, Ecx, 0);
    Abm => "ABM", bit(0x8000_0001, 0, Ecx, 5);
    Sse4a => "SSE4A", bit(0x8000_0001, 0, Ecx, 6);
    Prefetch3dNow => "PREFETCH", bit(0x8000_0001, 0, Ecx, 8);
    Xop => "XOP", bit(0x8000_0001, 0, Ecx, 11);
    Lwp => "LWP", bit(0x8000_0001, 0, Ecx, 15);
    Fma4 => "FMA4", bit(0x8000_0001, 0, Ecx, 16);
    Tbm => "TBM", bit(0x8000_0001, 0, Ecx, 21);
    MonitorX => "MWAITX", bit(0x8000_0001, 0, Ecx, 29);

    Rdtscp => "RDTSCP", bit(0x8000_0001, 0, Edx, 27);
    TscInvariant => "TSCINV", bit(0x8000_0007, 0, Edx, 8);

    // Windows 11 era, CPUID.(7,0).
    FsGsBase => "FSGSBASE", bit(7, 0, Ebx, 0);
    Bmi1 => "BMI1", bit(7, 0, Ebx, 3);
    Hle => "HLE", bit(7, 0, Ebx, 4);
    Avx2 => "AVX2", bit(7, 0, Ebx, 5);
    Smep => "SMEP", bit(7, 0, Ebx, 7);
    Bmi2 => "BMI2", bit(7, 0, Ebx, 8);
    /// Enhanced REP MOVSB/STOSB.
    FastStrings => "FASTSTR", bit(7, 0, Ebx, 9);
    Rtm => "RTM", bit(7, 0, Ebx, 11);
    /// FPU CS and DS deprecated.
    FpuCsDsDeprecated => "DEPRFPU", bit(7, 0, Ebx, 13);
    Avx512F => "AVX512F", bit(7, 0, Ebx, 16);
    Rdseed => "RDSEED", bit(7, 0, Ebx, 18);
    Adx => "ADX", bit(7, 0, Ebx, 19);
    ClflushOpt => "CLFLUSHOPT", bit(7, 0, Ebx, 23);
    Avx512Cd => "AVX512CD", bit(7, 0, Ebx, 28);
    ShaNi => "SHANI", bit(7, 0, Ebx, 29);

    CetSs => "CET_SS", bit(7, 0, Ecx, 7);
    Vaes => "VAES", bit(7, 0, Ecx, 9);
    Vpclmul => "VPCLMUL", bit(7, 0, Ecx, 10);
    Avx512Vnni => "AVX512VNNI", bit(7, 0, Ecx, 11);
    Rdpid => "RDPID", bit(7, 0, Ecx, 22);

    AvxVnni => "AVXVNNI", bit(7, 1, Eax, 4);
    Avx10 => "AVX10", bit(7, 1, Edx, 19);

    // CPUID.(0DH,1):EAX.
    XsaveOpt => "XSAVEOPT", bit(13, 1, Eax, 0);
    XsaveC => "XSAVEC", bit(13, 1, Eax, 1);
    /// XGETBV with ECX=1.
    XgetbvEcx1 => "XGETBV", bit(13, 1, Eax, 2);
    Xsaves => "XSAVES", bit(13, 1, Eax, 3);
}

/// One block of the feature report. Groups without a heading continue the previous one.
#[derive(Debug, Clone, Copy)]
pub struct FeatureGroup {
    pub heading: Option<&'static str>,
    pub rows: &'static [&'static [Feature]],
}

/// Report layout, oldest features first. The first row of each headed group lists the
/// baseline for the named Windows release.
pub const REPORT_GROUPS: &[FeatureGroup] = &[
    FeatureGroup {
        heading: Some("Basic 32-bit CPU features (first row should all be present on Windows 7):"),
        rows: &[
            &[
                Feature::X87,
                Feature::Tsc,
                Feature::Cmov,
                Feature::Fcmov,
                Feature::Cx8,
                Feature::Mmx,
                Feature::Fxsr,
                Feature::Sse,
                Feature::Sse2,
                Feature::Htt,
                Feature::Clflush,
            ],
            &[
                // Core Duo was a 32-bit only part with SSE3.
                Feature::Sse3,
                Feature::Vme,
                Feature::De,
                Feature::Pse,
                Feature::Msr,
                Feature::Pae,
                Feature::Apic,
                Feature::Sep,
                Feature::Pat,
            ],
        ],
    },
    FeatureGroup {
        heading: Some(
            "Extended 64-bit CPU features (first row should all be present on Windows 10):",
        ),
        rows: &[
            &[
                Feature::Cx16,
                Feature::Ssse3,
                Feature::Sse41,
                Feature::Sse42,
                Feature::Popcnt,
                Feature::Aes,
                Feature::Pclmul,
                Feature::Xsave,
                Feature::Osxsave,
                Feature::Rdtscp,
            ],
            &[
                Feature::Movbe,
                Feature::Monitor,
                Feature::Eist,
                Feature::Vmx,
                Feature::Smx,
                Feature::Avx,
                Feature::F16c,
                Feature::Fma,
                Feature::Rdrand,
                Feature::FpuCsDsDeprecated,
                Feature::TscInvariant,
            ],
            &[
                Feature::Lahf64,
                Feature::Abm,
                Feature::Sse4a,
                Feature::Prefetch3dNow,
                Feature::Xop,
                Feature::Lwp,
                Feature::Fma4,
                Feature::Tbm,
                Feature::MonitorX,
            ],
        ],
    },
    FeatureGroup {
        heading: Some(
            "Modern features since 2013 (first row should all be present on Windows 11):",
        ),
        rows: &[
            &[
                Feature::FsGsBase,
                Feature::Rdseed,
                Feature::Smep,
                Feature::FastStrings,
                Feature::ClflushOpt,
                Feature::XsaveOpt,
                Feature::XsaveC,
                Feature::XgetbvEcx1,
                Feature::Xsaves,
            ],
            &[
                Feature::Bmi1,
                Feature::Bmi2,
                Feature::Avx2,
                Feature::Adx,
                Feature::Hle,
                Feature::Rtm,
                Feature::CetSs,
                Feature::ShaNi,
                Feature::Vaes,
                Feature::Vpclmul,
                Feature::AvxVnni,
            ],
        ],
    },
    FeatureGroup {
        heading: None,
        rows: &[&[
            Feature::Avx512F,
            Feature::Avx512Cd,
            Feature::Avx512Vnni,
            Feature::Avx10,
        ]],
    },
];

/// `(value >> index) & 1`.
pub fn extract_bit(value: u32, index: u32) -> bool {
    extract_bits(value, index, 1) != 0
}

/// `(value >> index) & ((1 << width) - 1)`, with shifts of 32 or more yielding 0 and a
/// width of 32 or more selecting every remaining bit.
pub fn extract_bits(value: u32, index: u32, width: u32) -> u32 {
    let shifted = value.checked_shr(index).unwrap_or(0);
    let mask = match width {
        0 => 0,
        1..=31 => (1u32 << width) - 1,
        _ => u32::MAX,
    };
    shifted & mask
}
