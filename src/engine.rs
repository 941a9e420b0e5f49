//! High-level orchestrator: runtime, dispatch, interrupt wiring, exit codes.

use crate::{
    cli::{Args, Command},
    echo,
    error::Result,
    formatter, trace,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

pub fn run(args: Args) -> Result<i32> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(run_async(args))
}

async fn run_async(args: Args) -> Result<i32> {
    let fmt = formatter::from_mode(args.output_mode);

    let result = match &args.command {
        Command::Ping(ping) => {
            let cancel = CancellationToken::new();
            spawn_interrupt_listener(cancel.clone());
            echo::run(ping, fmt.clone(), cancel).await
        }
        Command::Trace(trace_args) => trace::run(trace_args, fmt.clone()).await,
    };

    /* terminal errors (usage aside, that's resolution) → red line, code 1 */
    match result {
        Ok(()) => Ok(0),
        Err(err) => {
            fmt.error(&err.to_string());
            Ok(1)
        }
    }
}

/// Turn Ctrl-C into a stop request on the session's token.
///
/// Registered once per process; every further Ctrl-C lands on an
/// already-cancelled token and is a no-op.
fn spawn_interrupt_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        loop {
            if signal::ctrl_c().await.is_err() {
                return;
            }
            cancel.cancel();
        }
    });
}
