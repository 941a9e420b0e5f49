//! Argument parsing layer (clap).

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

/// Global CLI arguments.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output format (`-o`)
    #[arg(
        short = 'o',
        long,
        value_enum,
        global = true,
        default_value_t = OutputMode::Color,
        help = "color | plain | json"
    )]
    pub output_mode: OutputMode,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// ICMP ping a host and report each reply
    Ping(PingArgs),
    /// Display the route packets take to reach a host
    Trace(TraceArgs),
}

#[derive(ClapArgs, Debug)]
pub struct PingArgs {
    /// Target host or IP address
    pub host: String,

    /// Stop after this many probes (`-c`, default: until Ctrl-C)
    #[arg(short, long)]
    pub count: Option<u64>,

    /// Delay between probes (ms)
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// Timeout per probe (ms)
    #[arg(long, default_value_t = 2000)]
    pub timeout_ms: u64,

    /// ICMP payload size in bytes (`-s`)
    #[arg(short = 's', long, default_value_t = 56)]
    pub payload_size: usize,
}

#[derive(ClapArgs, Debug)]
pub struct TraceArgs {
    /// Target host or IP address
    pub host: String,
}

/// Supported output modes.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Color, // ANSI-colored TTY
    Plain,
    Json,
}
