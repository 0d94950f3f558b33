use std::sync::Once;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use strain_core::{Harness, HarnessConfig, reporter::StdoutSink};

#[cfg(test)]
mod main_test;

static TRACE_INIT: Once = Once::new();
const DEFAULT_TRACE_FILTER: &str = "strain=debug,strain_cli=info";

/// Long flags the CLI understands. Anything else on the command line is ignored.
const KNOWN_FLAGS: &[&str] = &[
    "duration",
    "threads",
    "payloadKB",
    "retainEvery",
    "primeLimit",
    "contention",
    "queueCapacity",
    "samples",
    "reportEvery",
    "grace",
    "seed",
    "format",
];

#[derive(Debug, Parser)]
#[command(
    name = "strain",
    author,
    version,
    about = "Synthetic load harness: CPU burn, allocation pressure and lock contention",
    long_about = None,
    after_help = "Flags take the form --flag=value. Unknown flags are ignored."
)]
struct CliArgs {
    /// Run duration in seconds [default: 30]
    #[arg(long, value_name = "SECONDS")]
    duration: Option<u64>,

    /// Worker thread count [default: max(2, available cores)]
    #[arg(long, value_name = "COUNT")]
    threads: Option<usize>,

    /// Payload allocated per task, in KiB [default: 64]
    #[arg(long = "payloadKB", value_name = "KB", value_parser = parse_payload_kb)]
    payload_bytes: Option<usize>,

    /// Retain every Nth payload for the whole run; 0 disables [default: 200]
    #[arg(long = "retainEvery", value_name = "N")]
    retain_every: Option<u64>,

    /// Count primes up to this bound in every task [default: 20000]
    #[arg(long = "primeLimit", value_name = "INT")]
    prime_limit: Option<u32>,

    /// Take the shared hot lock in every task [default: true]
    #[arg(long, value_name = "BOOL", value_parser = parse_toggle)]
    contention: Option<bool>,

    /// Work queue capacity before caller-runs backpressure [default: 50000]
    #[arg(long = "queueCapacity", value_name = "N")]
    queue_capacity: Option<usize>,

    /// Maximum number of latency samples kept [default: 2000000]
    #[arg(long = "samples", value_name = "N")]
    sample_capacity: Option<usize>,

    /// Seconds between progress lines [default: 5]
    #[arg(long = "reportEvery", value_name = "SECONDS")]
    report_every: Option<u64>,

    /// Extra seconds allowed for draining after the run [default: 10]
    #[arg(long, value_name = "SECONDS")]
    grace: Option<u64>,

    /// Seed for the per-task payload bytes [default: 42]
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Final summary format
    #[arg(long, value_enum, default_value_t = SummaryFormat::Text)]
    format: SummaryFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SummaryFormat {
    Text,
    Json,
}

impl CliArgs {
    /// Overlays the given flags on the library defaults.
    fn into_config(self) -> HarnessConfig {
        let mut cfg = HarnessConfig::default();
        if let Some(secs) = self.duration {
            cfg.duration = Duration::from_secs(secs);
        }
        if let Some(threads) = self.threads {
            cfg.workers = threads;
        }
        if let Some(bytes) = self.payload_bytes {
            cfg.payload_bytes = bytes;
        }
        if let Some(every) = self.retain_every {
            cfg.retain_every = every;
        }
        if let Some(limit) = self.prime_limit {
            cfg.prime_limit = limit;
        }
        if let Some(enabled) = self.contention {
            cfg.contention = enabled;
        }
        if let Some(capacity) = self.queue_capacity {
            cfg.queue_capacity = capacity;
        }
        if let Some(samples) = self.sample_capacity {
            cfg.sample_capacity = samples;
        }
        if let Some(secs) = self.report_every {
            cfg.report_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.grace {
            cfg.drain_grace = Duration::from_secs(secs);
        }
        if let Some(seed) = self.seed {
            cfg.seed = seed;
        }
        cfg
    }
}

fn parse_toggle(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        other => Err(format!("expected true/false, got '{other}'")),
    }
}

fn parse_payload_kb(raw: &str) -> Result<usize, String> {
    let kb: usize = raw
        .trim()
        .parse()
        .map_err(|e| format!("invalid KiB count '{raw}': {e}"))?;
    kb.checked_mul(1024)
        .ok_or_else(|| format!("payload of {kb} KiB overflows the address space"))
}

fn flag_name(arg: &str) -> Option<&str> {
    let body = arg.strip_prefix("--")?;
    Some(body.split_once('=').map_or(body, |(name, _)| name))
}

/// Drops every argument clap should not see: unknown flags (and the value
/// following an unknown flag written without `=`) and stray positionals.
/// Returns the kept arguments and the dropped ones.
pub(crate) fn retain_known_flags<I>(args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut iter = args.into_iter().peekable();
    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    if let Some(program) = iter.next() {
        kept.push(program);
    }

    while let Some(arg) = iter.next() {
        if matches!(arg.as_str(), "-h" | "-V" | "--help" | "--version") {
            kept.push(arg);
            continue;
        }
        let Some(name) = flag_name(&arg) else {
            dropped.push(arg);
            continue;
        };
        let known = KNOWN_FLAGS.contains(&name);
        let takes_next = !arg.contains('=') && iter.peek().is_some_and(|next| !next.starts_with('-'));
        let value = if takes_next { iter.next() } else { None };
        if known {
            kept.push(arg);
            kept.extend(value);
        } else {
            dropped.push(arg);
            dropped.extend(value);
        }
    }
    (kept, dropped)
}

fn env_toggle_enabled(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }
    !(trimmed.eq_ignore_ascii_case("0") || trimmed.eq_ignore_ascii_case("false") || trimmed.eq_ignore_ascii_case("off"))
}

fn filter_expr_from(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("1")
        || trimmed.eq_ignore_ascii_case("true")
        || trimmed.eq_ignore_ascii_case("on")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Installs a stderr subscriber when `STRAIN_TRACE` is set, keeping stdout for
/// the banner, progress lines and summary.
fn maybe_init_tracing() {
    let raw = match std::env::var("STRAIN_TRACE") {
        Ok(value) => value,
        Err(_) => return,
    };

    if !env_toggle_enabled(&raw) {
        return;
    }

    TRACE_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::fmt;

        let filter_expr = filter_expr_from(&raw).or_else(|| std::env::var("RUST_LOG").ok());

        let builder = fmt().with_writer(std::io::stderr).with_thread_names(true);

        let builder = match filter_expr.and_then(|expr| EnvFilter::try_new(expr).ok()) {
            Some(filter) => builder.with_env_filter(filter),
            None => builder.with_env_filter(DEFAULT_TRACE_FILTER),
        };

        let _ = builder.try_init();
    });
}

fn main() -> anyhow::Result<()> {
    maybe_init_tracing();

    let (argv, ignored) = retain_known_flags(std::env::args());
    if !ignored.is_empty() {
        tracing::debug!(?ignored, "ignoring unknown arguments");
    }
    let args = CliArgs::parse_from(argv);
    let format = args.format;

    let harness = Harness::new(args.into_config())?;
    println!("{}", harness.banner());

    let summary = harness.run(Box::new(StdoutSink))?;
    match format {
        SummaryFormat::Text => println!("\n{summary}"),
        SummaryFormat::Json => println!("{}", serde_json::to_string(&summary)?),
    }
    Ok(())
}
