//! Pluggable output layer.
//!
//! Every line the probes produce goes through a shared [Formatter]:
//! banners, per-reply events, relayed trace lines, outcomes, errors.
//! Implementations append whole lines in production order and are shared
//! across tasks behind an [Arc].

use crate::{
    cli::OutputMode,
    stats::EchoEvent,
    trace::TraceOutcome,
};
use serde_json::json;
use std::net::IpAddr;
use std::sync::Arc;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const WHITE: &str = "\x1b[37m";
const RESET: &str = "\x1b[0m";

/// Print behaviour contract.
pub trait Formatter: Send + Sync {
    /// One informational line naming the probe, target and resolved address.
    fn banner(&self, probe: &str, host: &str, addr: IpAddr);
    fn echo(&self, event: &EchoEvent);
    fn trace_line(&self, line: &str);
    fn trace_outcome(&self, outcome: &TraceOutcome);
    fn error(&self, message: &str);
}

/* ---------- Text (colored or plain) ---------- */

pub struct Text {
    color: bool,
}

impl Text {
    fn green(&self, s: impl std::fmt::Display) -> String {
        self.paint(GREEN, s)
    }

    fn paint(&self, code: &str, s: impl std::fmt::Display) -> String {
        if self.color {
            format!("{code}{s}{RESET}")
        } else {
            s.to_string()
        }
    }
}

impl Formatter for Text {
    fn banner(&self, probe: &str, host: &str, addr: IpAddr) {
        println!("{probe} {} ({}):", self.green(host), self.green(addr));
    }

    fn echo(&self, event: &EchoEvent) {
        match event {
            EchoEvent::Reply {
                bytes,
                source,
                rtt_ms,
            } => println!(
                "{} bytes from {}: time={}",
                self.green(bytes),
                self.green(source),
                self.green(format_args!("{rtt_ms:.2} ms")),
            ),
            // Duplicates stay uncolored so they stand apart from
            // normal replies.
            EchoEvent::Duplicate {
                bytes,
                source,
                seq,
                rtt_ms,
                ttl,
            } => {
                let ttl = ttl.map(|t| t.to_string()).unwrap_or_else(|| "?".into());
                println!(
                    "{bytes} bytes from {source}: icmp_seq={seq} time={rtt_ms:.2} ms ttl={ttl} (DUP!)"
                );
            }
            EchoEvent::Finished(s) => {
                println!("\n--- {} ping statistics ---", self.green(s.destination));
                println!(
                    "{} packets transmitted, {} packets received, {} duplicates, {} packet loss",
                    self.green(s.sent),
                    self.green(s.received),
                    self.green(s.duplicates),
                    self.green(format_args!("{:.1}%", s.loss_pct)),
                );
            }
        }
    }

    fn trace_line(&self, line: &str) {
        println!("{}", self.paint(WHITE, line));
    }

    fn trace_outcome(&self, outcome: &TraceOutcome) {
        match outcome {
            // The streamed hop lines are the whole success story.
            TraceOutcome::Completed => {}
            TraceOutcome::Failed { reason } => self.error(reason),
            TraceOutcome::TimedOut => self.error("trace timed out."),
        }
    }

    fn error(&self, message: &str) {
        println!("{}", self.paint(RED, message));
    }
}

/* ---------- JSON ---------- */

pub struct Json;

impl Formatter for Json {
    fn banner(&self, probe: &str, host: &str, addr: IpAddr) {
        println!(
            "{}",
            json!({ "event": "start", "probe": probe, "host": host, "addr": addr })
        );
    }

    fn echo(&self, event: &EchoEvent) {
        println!("{}", serde_json::to_string(event).unwrap());
    }

    fn trace_line(&self, line: &str) {
        println!("{}", json!({ "event": "trace_line", "line": line }));
    }

    fn trace_outcome(&self, outcome: &TraceOutcome) {
        println!("{}", serde_json::to_string(outcome).unwrap());
    }

    fn error(&self, message: &str) {
        println!("{}", json!({ "event": "error", "message": message }));
    }
}

/* ---------- Factory ---------- */

pub fn from_mode(mode: OutputMode) -> Arc<dyn Formatter> {
    match mode {
        OutputMode::Color => Arc::new(Text { color: true }),
        OutputMode::Plain => Arc::new(Text { color: false }),
        OutputMode::Json => Arc::new(Json),
    }
}
