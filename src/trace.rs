//! Route tracing by driving the platform's traceroute executable.
//!
//! Three tasks cooperate per invocation: the child-process waiter, a
//! reader that relays stdout lines to the output sink as they arrive,
//! and a fixed wall-clock deadline. Whichever of {exit, deadline} wins
//! the race decides the outcome; on the deadline the child is abandoned
//! (best-effort kill, never awaited) so the command can never hang past
//! the deadline.

use crate::{
    cli::TraceArgs,
    error::Result,
    formatter::Formatter,
    resolve::resolve_target,
};
use serde::Serialize;
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{Child, Command},
    time::sleep,
};

/// Wall-clock bound for one trace invocation.
const TRACE_DEADLINE: Duration = Duration::from_secs(12);

/// Platform lookup for the hop-tracing executable.
const TRACE_PROGRAM: &str = if cfg!(windows) { "tracert" } else { "traceroute" };

/// Terminal state of one trace invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TraceOutcome {
    Completed,
    Failed { reason: String },
    TimedOut,
}

/// Resolve the target, launch the tracer and relay its output.
///
/// Resolution failure is terminal and propagates; anything after the
/// banner is reported through the formatter and ends with `Ok`.
pub async fn run(args: &TraceArgs, fmt: Arc<dyn Formatter>) -> Result<()> {
    let addr = resolve_target(&args.host).await?;
    fmt.banner("TRACE", &args.host, addr);

    match launch(&args.host) {
        Ok(child) => {
            let outcome = supervise(child, TRACE_DEADLINE, fmt.clone()).await;
            fmt.trace_outcome(&outcome);
        }
        Err(err) => fmt.error(&err.to_string()),
    }
    Ok(())
}

fn launch(target: &str) -> io::Result<Child> {
    Command::new(TRACE_PROGRAM)
        .arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
}

/// Race the child against `deadline`, relaying its stdout line by line.
///
/// When the child exits first the reader is drained to EOF before the
/// outcome is returned, so every line precedes the outcome report. When
/// the deadline fires first the reader is aborted before returning, so
/// no line follows the timeout report.
async fn supervise(mut child: Child, deadline: Duration, fmt: Arc<dyn Formatter>) -> TraceOutcome {
    let stdout = child.stdout.take();
    let reader = tokio::spawn(async move {
        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                fmt.trace_line(&line);
            }
        }
    });

    tokio::select! {
        status = child.wait() => {
            let _ = reader.await;
            match status {
                Ok(status) if status.success() => TraceOutcome::Completed,
                Ok(status) => TraceOutcome::Failed {
                    reason: status.to_string(),
                },
                Err(err) => TraceOutcome::Failed {
                    reason: err.to_string(),
                },
            }
        }
        _ = sleep(deadline) => {
            reader.abort();
            // Abandon the child: kill is best-effort and never awaited.
            let _ = child.start_kill();
            TraceOutcome::TimedOut
        }
    }
}
