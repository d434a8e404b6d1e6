//! Library half of the `cpuidex` tool: selector parsing, direct lookup and the report
//! header.

use std::io::Write;

use cpuid_probe::{CpuidBackend, CpuidResult, ProbeSession, ReportHeader};

pub mod arch;

pub const TOOL_NAME: &str = "cpuidex";

/// Parse a function selector the way C `strtol(s, NULL, 0)` does, truncated to 32 bits.
///
/// Leading whitespace and one sign are accepted. `0x`/`0X` selects hex, a leading `0`
/// octal, anything else decimal. Parsing stops at the first character that is not a
/// digit of the base; no digits at all yields 0.
pub fn parse_selector(s: &str) -> u32 {
    let s = s.trim_start_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r'));
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let bytes = s.as_bytes();
    let (radix, digits) = match bytes {
        [b'0', b'x' | b'X', next, ..] if next.is_ascii_hexdigit() => (16, &bytes[2..]),
        [b'0', ..] => (8, bytes),
        _ => (10, bytes),
    };

    let value = digits
        .iter()
        .map_while(|&b| char::from(b).to_digit(radix))
        .fold(0u32, |acc, d| acc.wrapping_mul(radix).wrapping_add(d));

    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

/// Query one function and print `Function FFFFFFFF[SSSSSSSS]: EAX EBX ECX EDX`.
///
/// A rejected function still prints its line (all zeros), after the range message.
pub fn lookup<B: CpuidBackend, W: Write>(
    session: &mut ProbeSession<B, W>,
    function: u32,
    sub_function: u32,
) -> cpuid_probe::Result<CpuidResult> {
    let r = session.query(function, sub_function)?;
    writeln!(
        session.out(),
        "Function {function:08X}[{sub_function:08X}]: {:08X} {:08X} {:08X} {:08X}",
        r.eax,
        r.ebx,
        r.ecx,
        r.edx
    )?;
    Ok(r)
}

/// Report header for this build running on `host_machine`.
pub fn report_header(host_machine: u16) -> ReportHeader<'static> {
    let (host_arch, host_notice) = arch::host_arch(host_machine);
    ReportHeader {
        tool: TOOL_NAME,
        version: env!("CARGO_PKG_VERSION"),
        guest_arch: arch::guest_arch_name(),
        host_arch,
        host_notice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_bases() {
        assert_eq!(parse_selector("7"), 7);
        assert_eq!(parse_selector("0x80000008"), 0x8000_0008);
        assert_eq!(parse_selector("0XD"), 0xD);
        assert_eq!(parse_selector("010"), 8);
        assert_eq!(parse_selector("0"), 0);
    }

    #[test]
    fn selector_stops_at_the_first_invalid_digit() {
        assert_eq!(parse_selector("12abc"), 12);
        assert_eq!(parse_selector("019"), 1);
        assert_eq!(parse_selector("0x1g"), 1);
        // "0x" without a hex digit parses as the octal "0".
        assert_eq!(parse_selector("0xg"), 0);
    }

    #[test]
    fn selector_whitespace_and_sign() {
        assert_eq!(parse_selector("  \t42"), 42);
        assert_eq!(parse_selector("+5"), 5);
        assert_eq!(parse_selector("-1"), 0xFFFF_FFFF);
        assert_eq!(parse_selector("-0x10"), 0xFFFF_FFF0);
    }

    #[test]
    fn non_numeric_selector_is_zero() {
        assert_eq!(parse_selector(""), 0);
        assert_eq!(parse_selector("leaf"), 0);
        assert_eq!(parse_selector("-"), 0);
    }

    #[test]
    fn selector_wraps_to_32_bits() {
        assert_eq!(parse_selector("0x180000001"), 0x8000_0001);
        assert_eq!(parse_selector("4294967296"), 0);
    }
}
