use std::net::SocketAddr;

use crate::command::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total commands executed. Labels: command, status.
pub const COMMANDS_TOTAL: &str = "parkd_commands_total";

/// Histogram: command latency in seconds, queue wait included. Labels: command.
pub const COMMAND_DURATION_SECONDS: &str = "parkd_command_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: free slots across the whole hierarchy.
pub const SLOTS_FREE: &str = "parkd_slots_free";

/// Gauge: reservations in the active ledger.
pub const ACTIVE_RESERVATIONS: &str = "parkd_active_reservations";

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "parkd_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "parkd_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "parkd_connections_rejected_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::Park { .. } => "park",
        Command::Occupy { .. } => "occupy",
        Command::Release { .. } => "release",
        Command::Cancel { .. } => "cancel",
        Command::Rollback { .. } => "rollback",
        Command::Status => "status",
        Command::History { .. } => "history",
    }
}

/// Label for lines that never decoded into a Command.
pub const MALFORMED_LABEL: &str = "malformed";
