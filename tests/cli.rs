//! Basic flag parsing tests.

use clap::Parser;
use netprobe::cli::{Args, Command, OutputMode};

#[test]
fn parse_ping_basic() {
    let a = Args::parse_from(["netprobe", "ping", "example.com"]);
    assert_eq!(a.output_mode, OutputMode::Color);
    match a.command {
        Command::Ping(ping) => {
            assert_eq!(ping.host, "example.com");
            assert_eq!(ping.count, None);
            assert_eq!(ping.interval_ms, 1000);
            assert_eq!(ping.timeout_ms, 2000);
            assert_eq!(ping.payload_size, 56);
        }
        other => panic!("expected ping, got {other:?}"),
    }
}

#[test]
fn ping_count_flag() {
    let a = Args::parse_from(["netprobe", "ping", "127.0.0.1", "-c", "5"]);
    match a.command {
        Command::Ping(ping) => assert_eq!(ping.count, Some(5)),
        other => panic!("expected ping, got {other:?}"),
    }
}

#[test]
fn ping_payload_size_flag() {
    let a = Args::parse_from(["netprobe", "ping", "127.0.0.1", "-s", "120"]);
    match a.command {
        Command::Ping(ping) => assert_eq!(ping.payload_size, 120),
        other => panic!("expected ping, got {other:?}"),
    }
}

#[test]
fn parse_trace() {
    let a = Args::parse_from(["netprobe", "trace", "example.com"]);
    match a.command {
        Command::Trace(trace) => assert_eq!(trace.host, "example.com"),
        other => panic!("expected trace, got {other:?}"),
    }
}

#[test]
fn missing_target_is_rejected() {
    assert!(Args::try_parse_from(["netprobe", "ping"]).is_err());
    assert!(Args::try_parse_from(["netprobe", "trace"]).is_err());
}

#[test]
fn missing_subcommand_is_rejected() {
    assert!(Args::try_parse_from(["netprobe"]).is_err());
}

#[test]
fn output_mode_json() {
    let a = Args::parse_from(["netprobe", "ping", "127.0.0.1", "-o", "json"]);
    assert_eq!(a.output_mode, OutputMode::Json);
}

#[test]
fn output_mode_is_global() {
    let a = Args::parse_from(["netprobe", "-o", "plain", "trace", "example.com"]);
    assert_eq!(a.output_mode, OutputMode::Plain);
}

#[test]
fn unknown_output_mode_is_rejected() {
    assert!(Args::try_parse_from(["netprobe", "ping", "127.0.0.1", "-o", "yaml"]).is_err());
}
