use anyhow::{Context, Result};
use cpuid_probe::{CpuidBackend, HostCpu};

/// Print the highest basic CPUID function and exit with it as the status code.
fn main() -> Result<()> {
    let mut cpu = HostCpu::new().context("failed to access CPUID")?;
    let max = cpu.issue(0, 0).eax;

    println!("CPUID function 0 returned max functions = {max}");
    std::process::exit(max as i32);
}
