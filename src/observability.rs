use std::net::SocketAddr;

use crate::engine::EngineError;

// ── Request-driven metrics ──────────────────────────────────────

/// Counter: reservation attempts. Labels: outcome.
pub const RESERVATIONS_TOTAL: &str = "courtbook_reservations_total";

/// Counter: cancellation attempts. Labels: outcome.
pub const CANCELLATIONS_TOTAL: &str = "courtbook_cancellations_total";

/// Counter: slot availability queries.
pub const AVAILABILITY_QUERIES_TOTAL: &str = "courtbook_availability_queries_total";

/// Counter: reservations moved to COMPLETED by the sweeper.
pub const COMPLETED_TOTAL: &str = "courtbook_completed_total";

// ── Storage metrics ─────────────────────────────────────────────

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "courtbook_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "courtbook_wal_flush_batch_size";

/// Install the Prometheus exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), String> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install Prometheus exporter: {e}"))?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Short label for the outcome of an engine call.
pub fn outcome_label<T>(result: &Result<T, EngineError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(EngineError::CourtNotFound(_)) => "court_not_found",
        Err(EngineError::InvalidInterval(_)) => "invalid_interval",
        Err(EngineError::InvalidDate(_)) => "invalid_date",
        Err(EngineError::SlotConflict(_)) => "slot_conflict",
        Err(EngineError::NotFound(_)) => "not_found",
        Err(EngineError::Forbidden(_)) => "forbidden",
        Err(EngineError::InvalidTransition { .. }) => "invalid_transition",
        Err(EngineError::LimitExceeded(_)) => "limit_exceeded",
        Err(EngineError::Storage(_)) => "storage",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn labels() {
        assert_eq!(outcome_label(&Ok::<(), EngineError>(())), "ok");
        assert_eq!(
            outcome_label::<()>(&Err(EngineError::SlotConflict(Ulid::new()))),
            "slot_conflict"
        );
        assert_eq!(outcome_label::<()>(&Err(EngineError::Storage("x".into()))), "storage");
    }

    #[test]
    fn init_without_port_is_noop() {
        assert!(init(None).is_ok());
    }
}
