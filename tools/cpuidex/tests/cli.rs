#![cfg(any(target_arch = "x86", target_arch = "x86_64"))]

use predicates::prelude::*;

#[test]
fn lookup_mode_prints_function_zero() {
    assert_cmd::cargo::cargo_bin_cmd!("cpuidex")
        .arg("0")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Function 00000000[00000000]: "));
}

#[test]
fn lookup_mode_accepts_a_sub_function() {
    assert_cmd::cargo::cargo_bin_cmd!("cpuidex")
        .args(["0x7", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[00000000]: "));
}

#[test]
fn signed_hex_selector_is_a_function_number() {
    assert_cmd::cargo::cargo_bin_cmd!("cpuidex")
        .arg("-0x10")
        .assert()
        .success()
        .stdout(predicate::str::contains("Function FFFFFFF0[00000000]: "));
}

#[test]
fn non_numeric_selectors_read_as_zero() {
    assert_cmd::cargo::cargo_bin_cmd!("cpuidex")
        .args(["-abc", "leaf"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Function 00000000[00000000]: "));
}

#[test]
fn extra_positionals_are_ignored() {
    assert_cmd::cargo::cargo_bin_cmd!("cpuidex")
        .args(["1", "0", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Function 00000001[00000000]: "));
}

#[test]
fn report_mode_prints_every_section() {
    let assert = assert_cmd::cargo::cargo_bin_cmd!("cpuidex")
        .args(["--tsc-attempts", "1000"])
        .assert();
    assert
        .stdout(predicate::str::contains("CPUID examination utility."))
        .stdout(predicate::str::contains("Maximum Intel function number = "))
        .stdout(predicate::str::contains("Checking for possible missing features:"))
        .stdout(predicate::str::contains("Checking for TSC consistency:"))
        .stdout(predicate::str::is_match(r"\n(No|\d+) checks failed!\n$").unwrap());
}

#[test]
fn strict_exit_reflects_the_checks() {
    let output = assert_cmd::cargo::cargo_bin_cmd!("cpuidex")
        .args(["--tsc-attempts", "1000", "--strict-exit"])
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let expected = if stdout.contains("No checks failed!") { 0 } else { 1 };
    assert_eq!(output.status.code(), Some(expected));
}
