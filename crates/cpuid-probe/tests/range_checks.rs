use cpuid_probe::{CpuidReg, CpuidResult, FunctionRanges, ProbeSession, StubCpu};

fn output(session: ProbeSession<StubCpu, Vec<u8>>) -> String {
    String::from_utf8(session.into_parts().1).unwrap()
}

#[test]
fn basic_function_past_the_limit_returns_zeros_and_one_line() {
    let mut session = ProbeSession::new(StubCpu::modern_intel(), Vec::new());
    let issued = session.backend().issued().len();

    let r = session.query(0x0000_0020, 0).unwrap();
    assert_eq!(r, CpuidResult::ZERO);
    assert_eq!(session.backend().issued().len(), issued);
    // Range rejections are not failed checks.
    assert_eq!(session.warnings(), 0);
    assert_eq!(
        output(session),
        "Function 00000020 out of range for basic functions limit 00000016\n"
    );
}

#[test]
fn absent_hypervisor_range_rejects_every_hypervisor_function() {
    let mut session = ProbeSession::new(StubCpu::modern_intel(), Vec::new());
    assert_eq!(session.query(0x4000_0000, 0).unwrap(), CpuidResult::ZERO);
    assert_eq!(session.query(0x4000_0001, 0).unwrap(), CpuidResult::ZERO);
    assert_eq!(
        output(session),
        "Function 40000000 out of range, hyper functions are not present\n\
         Function 40000001 out of range, hyper functions are not present\n"
    );
}

#[test]
fn extended_function_past_the_limit_is_rejected() {
    let mut session = ProbeSession::new(StubCpu::modern_intel(), Vec::new());
    assert_eq!(session.reg(0x8000_0008, 0, CpuidReg::Eax).unwrap(), 0);
    assert_eq!(session.reg(0x8000_0009, 0, CpuidReg::Eax).unwrap(), 0);
    assert_eq!(
        output(session),
        "Function 80000009 out of range for extended functions limit 80000008\n"
    );
}

#[test]
fn implausible_range_maxima_are_treated_as_absent() {
    // Old processors echo garbage (often the basic leaf) for unknown ranges.
    let cpu = StubCpu::new()
        .with_vendor(2, b"GenuineIntel")
        .with_leaf(0x4000_0000, 0, CpuidResult::new(0x4000_1000, 0, 0, 0))
        .with_leaf(0x8000_0000, 0, CpuidResult::new(0x0000_0002, 0, 0, 0));
    let session = ProbeSession::new(cpu, Vec::new());
    assert_eq!(
        session.ranges(),
        FunctionRanges {
            max_basic: 2,
            max_hypervisor: 0,
            max_extended: 0,
        }
    );
}

#[test]
fn hypervisor_range_at_its_base_is_present() {
    let cpu = StubCpu::modern_intel().with_leaf(
        0x4000_0000,
        0,
        CpuidResult::new(0x4000_0000, 0x7263_694D, 0x666F_736F, 0x7648_2074),
    );
    let mut session = ProbeSession::new(cpu, Vec::new());
    assert!(session.ranges().has_hypervisor());
    assert_eq!(session.reg(0x4000_0000, 0, CpuidReg::Ebx).unwrap(), 0x7263_694D);
    assert!(output(session).is_empty());
}

#[test]
fn repeated_queries_are_identical() {
    let mut session = ProbeSession::new(StubCpu::modern_intel(), Vec::new());
    let first = session.query(7, 0).unwrap();
    let second = session.query(7, 0).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.ebx, 0x029C_67AF);
}

#[test]
fn sub_function_selects_the_leaf() {
    let mut session = ProbeSession::new(StubCpu::modern_intel(), Vec::new());
    assert_eq!(session.query(13, 1).unwrap().eax, 0x0F);
    assert_eq!(session.query(13, 0).unwrap(), CpuidResult::ZERO);
}
