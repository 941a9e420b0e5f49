//! ICMP echo sessions.
//!
//! An [EchoSession] splits a probe run in two: a wire task that paces
//! probes and reports every send and every observed reply over a
//! channel, and the session's receive loop, which classifies each
//! incoming reply against the outstanding sequences and emits
//! [EchoEvent]s in receipt order. Because classification happens on
//! receipt, a wire that delivers a sequence number twice produces a
//! duplicate event; nothing in the session assumes one reply per probe.
//! Cancellation is cooperative: the wire selects on the token at every
//! await point, and closing the report channel winds the session down.

use crate::{
    cli::PingArgs,
    error::{ProbeError, Result},
    formatter::Formatter,
    resolve::resolve_target,
    stats::{EchoEvent, EchoStats, EchoSummary, ReplyKind},
};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use surge_ping::{Client, Config, ICMP, IcmpPacket, PingIdentifier, PingSequence, SurgeError};
use tokio::{sync::mpsc, time::sleep};
use tokio_util::sync::CancellationToken;

const EVENT_BUFFER: usize = 64;

/// Tunables for one echo session.
#[derive(Clone)]
pub struct EchoSettings {
    /// Stop after this many probes; `None` keeps going until cancelled.
    pub count: Option<u64>,
    pub interval: Duration,
    pub timeout: Duration,
    pub payload_size: usize,
}

impl From<&PingArgs> for EchoSettings {
    fn from(args: &PingArgs) -> Self {
        Self {
            count: args.count,
            interval: Duration::from_millis(args.interval_ms),
            timeout: Duration::from_millis(args.timeout_ms),
            payload_size: args.payload_size,
        }
    }
}

/// Resolve the target and run one echo session to completion.
///
/// The session runs as its own task; this function consumes its event
/// stream in order. A session-level failure is reported as one error
/// line after the stream ends and never suppresses a `Finished` event
/// that precedes it.
pub async fn run(args: &PingArgs, fmt: Arc<dyn Formatter>, cancel: CancellationToken) -> Result<()> {
    let addr = resolve_target(&args.host).await?;
    fmt.banner("PING", &args.host, addr);

    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
    let session = EchoSession::new(addr, EchoSettings::from(args));
    let worker = tokio::spawn(session.run(tx, cancel));

    while let Some(event) = rx.recv().await {
        fmt.echo(&event);
    }

    match worker.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => {
            fmt.error(&err.to_string());
            Ok(())
        }
        Err(join) => Err(join.into()),
    }
}

/// One reply as delivered by the wire, before classification.
#[derive(Clone, Debug)]
struct RawReply {
    seq: u16,
    bytes: usize,
    source: IpAddr,
    rtt: Duration,
    ttl: Option<u8>,
}

/// What the wire task reports to the session's receive loop.
#[derive(Debug)]
enum WireReport {
    Sent { seq: u16 },
    Reply(RawReply),
    Failed(ProbeError),
}

/// One ICMP echo session against a resolved address.
pub struct EchoSession {
    addr: IpAddr,
    settings: EchoSettings,
    stats: EchoStats,
}

impl EchoSession {
    pub fn new(addr: IpAddr, settings: EchoSettings) -> Self {
        Self {
            addr,
            settings,
            stats: EchoStats::new(),
        }
    }

    /// Run the probe loop, then emit `Finished` — exactly once, with
    /// whatever counts have accumulated, on every exit path that has
    /// statistics to report.
    pub async fn run(
        mut self,
        events: mpsc::Sender<EchoEvent>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let outcome = self.probe_loop(&events, &cancel).await;
        if let Some(summary) = self.finished_summary(outcome.is_err()) {
            let _ = events.send(EchoEvent::Finished(summary)).await;
        }
        outcome
    }

    async fn probe_loop(
        &mut self,
        events: &mpsc::Sender<EchoEvent>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let config = match self.addr {
            IpAddr::V4(_) => Config::default(),
            IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
        };
        let client = Client::new(&config).map_err(|err| ProbeError::Other(err.into()))?;

        let (report_tx, mut reports) = mpsc::channel(EVENT_BUFFER);
        let wire = tokio::spawn(drive_wire(
            client,
            self.addr,
            self.settings.clone(),
            report_tx,
            cancel.clone(),
        ));
        let outcome = self.consume(&mut reports, events).await;
        let _ = wire.await;
        outcome
    }

    /// Receive loop: classify every wire report until the wire closes.
    async fn consume(
        &mut self,
        reports: &mut mpsc::Receiver<WireReport>,
        events: &mpsc::Sender<EchoEvent>,
    ) -> Result<()> {
        while let Some(report) = reports.recv().await {
            match report {
                WireReport::Sent { seq } => self.stats.on_sent(seq),
                WireReport::Reply(raw) => {
                    let event = self.classify(raw);
                    let _ = events.send(event).await;
                }
                WireReport::Failed(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn classify(&mut self, raw: RawReply) -> EchoEvent {
        let rtt_ms = raw.rtt.as_secs_f64() * 1_000.0;
        match self.stats.on_reply(raw.seq) {
            ReplyKind::Fresh => EchoEvent::Reply {
                bytes: raw.bytes,
                source: raw.source,
                rtt_ms,
            },
            ReplyKind::Duplicate => EchoEvent::Duplicate {
                bytes: raw.bytes,
                source: raw.source,
                seq: raw.seq,
                rtt_ms,
                ttl: raw.ttl,
            },
        }
    }

    /// Summary to report when the session ends, if any. A session that
    /// failed before sending a single probe has nothing to summarize;
    /// its error line stands alone.
    fn finished_summary(&self, failed: bool) -> Option<EchoSummary> {
        if failed && self.stats.sent() == 0 {
            None
        } else {
            Some(self.stats.summary(self.addr))
        }
    }
}

/// Wire task: pace probes and report each send and each reply in the
/// order the wire sees them. Ends when the count is reached, the token
/// fires, the session hangs up, or the transport fails.
async fn drive_wire(
    client: Client,
    addr: IpAddr,
    settings: EchoSettings,
    reports: mpsc::Sender<WireReport>,
    cancel: CancellationToken,
) {
    let mut pinger = client.pinger(addr, PingIdentifier(rand::random())).await;
    pinger.timeout(settings.timeout);
    let payload = vec![0u8; settings.payload_size];

    let mut seq: u16 = 0;
    let mut sent: u64 = 0;
    loop {
        if cancel.is_cancelled() || settings.count.is_some_and(|limit| sent >= limit) {
            break;
        }
        if reports.send(WireReport::Sent { seq }).await.is_err() {
            break;
        }
        sent += 1;

        tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = pinger.ping(PingSequence(seq), &payload) => match outcome {
                Ok((packet, rtt)) => {
                    if reports
                        .send(WireReport::Reply(raw_reply(&packet, seq, rtt)))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                // An unanswered probe is ordinary loss.
                Err(SurgeError::Timeout { .. }) => {}
                Err(err) => {
                    let _ = reports
                        .send(WireReport::Failed(ProbeError::Other(err.into())))
                        .await;
                    return;
                }
            }
        }

        seq = seq.wrapping_add(1);
        if cancel.is_cancelled() || settings.count.is_some_and(|limit| sent >= limit) {
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(settings.interval) => {}
        }
    }
}

fn raw_reply(packet: &IcmpPacket, seq: u16, rtt: Duration) -> RawReply {
    let (bytes, source, ttl) = match packet {
        IcmpPacket::V4(reply) => (
            reply.get_size(),
            IpAddr::from(reply.get_source()),
            reply.get_ttl(),
        ),
        IcmpPacket::V6(reply) => (
            reply.get_size(),
            IpAddr::from(reply.get_source()),
            Some(reply.get_max_hop_limit()),
        ),
    };
    RawReply {
        seq,
        bytes,
        source,
        rtt,
        ttl,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn localhost() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    fn settings() -> EchoSettings {
        EchoSettings {
            count: Some(4),
            interval: Duration::from_millis(10),
            timeout: Duration::from_millis(10),
            payload_size: 56,
        }
    }

    fn raw(seq: u16) -> RawReply {
        RawReply {
            seq,
            bytes: 64,
            source: localhost(),
            rtt: Duration::from_millis(1),
            ttl: Some(64),
        }
    }

    #[test]
    fn settings_map_from_cli_args() {
        let args = PingArgs {
            host: "127.0.0.1".into(),
            count: None,
            interval_ms: 250,
            timeout_ms: 900,
            payload_size: 32,
        };
        let settings = EchoSettings::from(&args);
        assert_eq!(settings.count, None);
        assert_eq!(settings.interval, Duration::from_millis(250));
        assert_eq!(settings.timeout, Duration::from_millis(900));
        assert_eq!(settings.payload_size, 32);
    }

    #[tokio::test]
    async fn duplicate_reply_yields_duplicate_event() {
        let mut session = EchoSession::new(localhost(), settings());
        let (report_tx, mut reports) = mpsc::channel(8);
        let (event_tx, mut events) = mpsc::channel(8);

        report_tx.send(WireReport::Sent { seq: 0 }).await.unwrap();
        report_tx.send(WireReport::Reply(raw(0))).await.unwrap();
        // The wire delivered the same sequence a second time.
        report_tx.send(WireReport::Reply(raw(0))).await.unwrap();
        drop(report_tx);

        session.consume(&mut reports, &event_tx).await.unwrap();

        assert!(matches!(events.recv().await, Some(EchoEvent::Reply { .. })));
        match events.recv().await {
            Some(EchoEvent::Duplicate { seq, ttl, .. }) => {
                assert_eq!(seq, 0);
                assert_eq!(ttl, Some(64));
            }
            other => panic!("expected duplicate, got {other:?}"),
        }

        let summary = session.stats.summary(localhost());
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.received, 1);
        assert_eq!(summary.duplicates, 1);
    }

    #[tokio::test]
    async fn wire_failure_surfaces_from_the_receive_loop() {
        let mut session = EchoSession::new(localhost(), settings());
        let (report_tx, mut reports) = mpsc::channel(8);
        let (event_tx, _events) = mpsc::channel(8);

        report_tx.send(WireReport::Sent { seq: 0 }).await.unwrap();
        report_tx
            .send(WireReport::Failed(ProbeError::Other(anyhow::anyhow!(
                "send failed"
            ))))
            .await
            .unwrap();
        drop(report_tx);

        let err = session.consume(&mut reports, &event_tx).await.unwrap_err();
        assert!(err.to_string().contains("send failed"));
        // One probe went out, so this session still has a summary.
        assert!(session.finished_summary(true).is_some());
    }

    #[test]
    fn failed_sessions_only_summarize_after_first_probe() {
        let mut session = EchoSession::new(localhost(), settings());
        assert!(session.finished_summary(true).is_none());
        assert!(session.finished_summary(false).is_some());

        session.stats.on_sent(0);
        let summary = session.finished_summary(true).unwrap();
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.received, 0);
    }

    #[tokio::test]
    async fn cancelled_session_still_finishes_exactly_once() {
        let session = EchoSession::new(localhost(), settings());
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        cancel.cancel();

        session.run(tx, cancel).await.unwrap();

        match rx.recv().await {
            Some(EchoEvent::Finished(summary)) => {
                assert_eq!(summary.sent, 0);
                assert_eq!(summary.loss_pct, 0.0);
            }
            other => panic!("expected Finished, got {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }
}
