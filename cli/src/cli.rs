use clap::Parser;
use rdispatch::Strategy;

#[derive(Parser, Debug)]
#[clap(name = "rdispatch", version, about = "rdispatch load driver")]
pub struct Cli {
  #[clap(subcommand)]
  pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
  /// Push synthetic work through a dispatcher and report what happened
  Run(RunArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
  /// Execution strategy: "gated:<capacity>" or "pool:<size>"
  #[clap(long, short, default_value = "gated:8")]
  pub strategy: Strategy,

  /// Number of work units to submit
  #[clap(long, short = 'n', default_value_t = 1000)]
  pub requests: usize,

  /// Base duration of every work unit, in milliseconds
  #[clap(long, default_value_t = 5)]
  pub work_ms: u64,

  /// Random extra duration added to each work unit, up to this many milliseconds
  #[clap(long, default_value_t = 5)]
  pub jitter_ms: u64,

  /// Fraction of work units that reply with an error (0.0 to 1.0)
  #[clap(long, default_value_t = 0.1, value_parser = parse_rate)]
  pub fail_rate: f64,

  /// Inbound queue capacity
  #[clap(long, conflicts_with = "unbounded")]
  pub queue_capacity: Option<usize>,

  /// Use an unbounded inbound queue
  #[clap(long, action)]
  pub unbounded: bool,

  /// Give up waiting for drain after this many milliseconds
  #[clap(long)]
  pub drain_timeout_ms: Option<u64>,
}

fn parse_rate(s: &str) -> Result<f64, String> {
  let rate: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
  if (0.0..=1.0).contains(&rate) {
    Ok(rate)
  } else {
    Err(format!("fail rate must be between 0.0 and 1.0, got {}", rate))
  }
}
