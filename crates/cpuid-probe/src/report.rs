//! Human-readable report.

use std::io::Write;

use crate::backend::{CpuidBackend, TimestampCounter, XcrReader};
use crate::checks;
use crate::config::ProbeConfig;
use crate::error::Result;
use crate::features::{FeatureGroup, REPORT_GROUPS};
use crate::session::ProbeSession;
use crate::vendor;

/// Identification lines printed above the report.
#[derive(Debug, Clone)]
pub struct ReportHeader<'a> {
    pub tool: &'a str,
    pub version: &'a str,
    /// Architecture this binary was built for.
    pub guest_arch: &'a str,
    /// Native architecture of the machine.
    pub host_arch: &'a str,
    /// Printed between the banner and the architecture line, e.g. an unrecognised host.
    pub host_notice: Option<String>,
}

/// What a finished report run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOutcome {
    pub max_basic: u32,
    pub warnings: u32,
}

impl ReportOutcome {
    /// Process exit status.
    ///
    /// Historically the highest basic function number; with `strict` it is 1 when any
    /// check failed and 0 otherwise.
    pub fn exit_status(&self, strict: bool) -> i32 {
        if strict {
            i32::from(self.warnings != 0)
        } else {
            self.max_basic as i32
        }
    }
}

/// Write the complete report: header, identification, feature table, self-checks and the
/// summary line.
pub fn write_report<B, W>(
    session: &mut ProbeSession<B, W>,
    header: &ReportHeader<'_>,
    config: &ProbeConfig,
) -> Result<ReportOutcome>
where
    B: CpuidBackend + TimestampCounter + XcrReader,
    W: Write,
{
    write_header(session, header)?;
    write_ranges(session)?;
    write_identification(session)?;
    write_feature_table(session, REPORT_GROUPS)?;
    checks::run_all(session, config)?;
    write_summary(session)?;

    Ok(ReportOutcome {
        max_basic: session.ranges().max_basic,
        warnings: session.warnings(),
    })
}

pub fn write_header<B: CpuidBackend, W: Write>(
    session: &mut ProbeSession<B, W>,
    header: &ReportHeader<'_>,
) -> Result<()> {
    let out = session.out();
    writeln!(
        out,
        "\n{} {} - CPUID examination utility.",
        header.tool, header.version
    )?;
    if let Some(notice) = &header.host_notice {
        writeln!(out, "{notice}")?;
    }
    writeln!(
        out,
        "\nRunning as a {} process on a {} host architecture.",
        header.guest_arch, header.host_arch
    )?;
    Ok(())
}

pub fn write_ranges<B: CpuidBackend, W: Write>(session: &mut ProbeSession<B, W>) -> Result<()> {
    let ranges = session.ranges();
    let out = session.out();
    writeln!(out, "\nMaximum Intel function number = {:08X}", ranges.max_basic)?;
    writeln!(out, "Maximum AMD64 function number = {:08X}", ranges.max_extended)?;
    writeln!(
        out,
        "\nHypervisor functions {} present.",
        if ranges.has_hypervisor() { "are" } else { "are not" }
    )?;
    if ranges.has_hypervisor() {
        writeln!(out, "Maximum hyper function number = {:08X}", ranges.max_hypervisor)?;
    }
    Ok(())
}

pub fn write_identification<B: CpuidBackend, W: Write>(
    session: &mut ProbeSession<B, W>,
) -> Result<()> {
    let (sig, info) = session.signature()?;
    let leaf1 = session.query(1, 0)?;
    let vendor_sig = session.vendor_string()?;
    let vendor = session.vendor();
    let model = session.model_string()?;

    let out = session.out();
    writeln!(out)?;
    writeln!(out, "Processor signature  = {:08X}", sig.raw)?;
    writeln!(out, "Processor family     = {:>8}", sig.family)?;
    writeln!(out, "Processor ext family = {:>8}", sig.ext_family)?;
    writeln!(out, "Processor model      = {:>8}", sig.model)?;
    writeln!(out, "Processor ext model  = {:>8}", sig.ext_model)?;
    writeln!(out, "Processor stepping   = {:>8}", sig.stepping)?;
    writeln!(
        out,
        "Processor vendor     = '{}' ({vendor})",
        vendor::ascii_until_nul(&vendor_sig)
    )?;
    writeln!(
        out,
        "Processor model      = '{}'",
        vendor::ascii_until_nul(&model)
    )?;
    writeln!(out, "Processor brand index= {:>8}", info.brand_index)?;
    writeln!(out, "CLFLUSH line size    = {:>8} bytes", info.clflush_line_size)?;
    writeln!(out, "Processor max IDs    = {:>8}", info.max_logical_ids)?;
    writeln!(out, "Basic features ECX   = {:08X}", leaf1.ecx)?;
    writeln!(out, "Basic features EDX   = {:08X}", leaf1.edx)?;
    Ok(())
}

pub fn write_feature_table<B: CpuidBackend, W: Write>(
    session: &mut ProbeSession<B, W>,
    groups: &[FeatureGroup],
) -> Result<()> {
    for group in groups {
        if let Some(heading) = group.heading {
            writeln!(session.out(), "\n{heading}")?;
        }
        for row in group.rows {
            let mut line = String::new();
            for feature in *row {
                line.push_str(&feature_cell(feature.name(), session.has(*feature)?));
                line.push(' ');
            }
            writeln!(session.out(), "{line}")?;
        }
    }
    Ok(())
}

/// `name` when present, otherwise dashes of the same width so columns line up.
pub fn feature_cell(name: &str, present: bool) -> String {
    if present {
        name.to_string()
    } else {
        "-".repeat(name.len())
    }
}

pub fn write_summary<B: CpuidBackend, W: Write>(session: &mut ProbeSession<B, W>) -> Result<()> {
    let warnings = session.warnings();
    if warnings == 0 {
        writeln!(session.out(), "\nNo checks failed!")?;
    } else {
        writeln!(session.out(), "\n{warnings} checks failed!")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Feature;
    use crate::stub::StubCpu;

    #[test]
    fn missing_feature_renders_as_dashes_of_equal_width() {
        assert_eq!(feature_cell("AVX512VNNI", false), "----------");
        assert_eq!(feature_cell("AVX512VNNI", true), "AVX512VNNI");
        assert_eq!(feature_cell("VT-x", false).len(), "VT-x".len());
    }

    #[test]
    fn feature_row_layout() {
        let mut session = ProbeSession::new(StubCpu::modern_intel(), Vec::new());
        let groups = [FeatureGroup {
            heading: Some("Test row:"),
            rows: &[&[Feature::Sse2, Feature::Avx512F, Feature::Avx2]],
        }];
        write_feature_table(&mut session, &groups).unwrap();
        let out = String::from_utf8(session.into_parts().1).unwrap();
        assert_eq!(out, "\nTest row:\nSSE2 ------- AVX2 \n");
    }

    #[test]
    fn host_notice_sits_between_banner_and_arch_line() {
        let mut session = ProbeSession::new(StubCpu::modern_intel(), Vec::new());
        let header = ReportHeader {
            tool: "cpuidex",
            version: "1.2.3",
            guest_arch: "64-bit x64/AMD64",
            host_arch: "Unknown host ISA",
            host_notice: Some("Unknown HostCPU 5064".to_string()),
        };
        write_header(&mut session, &header).unwrap();
        assert_eq!(
            String::from_utf8(session.into_parts().1).unwrap(),
            "\ncpuidex 1.2.3 - CPUID examination utility.\n\
             Unknown HostCPU 5064\n\
             \nRunning as a 64-bit x64/AMD64 process on a Unknown host ISA host architecture.\n"
        );
    }

    #[test]
    fn exit_status_policies() {
        let outcome = ReportOutcome {
            max_basic: 0x16,
            warnings: 2,
        };
        assert_eq!(outcome.exit_status(false), 0x16);
        assert_eq!(outcome.exit_status(true), 1);

        let clean = ReportOutcome {
            max_basic: 0x16,
            warnings: 0,
        };
        assert_eq!(clean.exit_status(true), 0);
    }
}
