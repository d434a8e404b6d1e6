use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use cpuid_probe::{report, HostCpu, ProbeConfig, ProbeSession};
use tracing_subscriber::EnvFilter;

use cpuidex::{arch, lookup, parse_selector, report_header};

#[derive(Debug, Parser)]
#[command(name = "cpuidex", version)]
#[command(about = "CPUID examination utility")]
struct Cli {
    /// Query a single CPUID function instead of printing the full report. Accepts
    /// decimal, `0x` hex or `0` octal with an optional sign; anything else reads as 0.
    #[arg(allow_hyphen_values = true)]
    function: Option<String>,

    /// Sub-function (ECX) for FUNCTION (default: 0).
    #[arg(allow_hyphen_values = true, requires = "function")]
    sub_function: Option<String>,

    /// Extra positional arguments are accepted and ignored.
    #[arg(hide = true, allow_hyphen_values = true, requires = "sub_function")]
    ignored: Vec<String>,

    /// Iterations of the TSC monotonicity check.
    #[arg(long, default_value_t = ProbeConfig::DEFAULT_TSC_ATTEMPTS)]
    tsc_attempts: u32,

    /// Exit with 1 when any check failed (and 0 otherwise) instead of the highest basic
    /// function number.
    #[arg(long)]
    strict_exit: bool,
}

impl Cli {
    fn to_config(&self) -> ProbeConfig {
        ProbeConfig {
            tsc_attempts: self.tsc_attempts,
            ..ProbeConfig::default()
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let code = run(&cli)?;
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<i32> {
    let cpu = HostCpu::new().context("failed to access CPUID")?;
    let mut session = ProbeSession::new(cpu, io::stdout().lock());

    if !cli.ignored.is_empty() {
        tracing::debug!(ignored = ?cli.ignored, "ignoring extra arguments");
    }

    if let Some(function) = &cli.function {
        let function = parse_selector(function);
        let sub_function = cli.sub_function.as_deref().map_or(0, parse_selector);
        lookup(&mut session, function, sub_function).context("lookup failed")?;
        session.out().flush().context("flush stdout")?;
        return Ok(0);
    }

    let header = report_header(arch::host_machine());
    let outcome = report::write_report(&mut session, &header, &cli.to_config())
        .context("write report")?;
    session.out().flush().context("flush stdout")?;

    tracing::debug!(
        max_basic = outcome.max_basic,
        warnings = outcome.warnings,
        "report finished"
    );
    Ok(outcome.exit_status(cli.strict_exit))
}
