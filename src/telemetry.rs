//! Telemetry counters for the reliability simulator.
//!
//! These are orthogonal to the periodic textual output file (spec §6) — the
//! text file is the authoritative simulation result; the counters here exist
//! purely for observability and are not started as a server by default.
//!
//! Exported metrics:
//! - `trials_total`: Number of completed Monte-Carlo trials.
//! - `outcome_ne_total` / `outcome_ce_total` / `outcome_due_total` /
//!   `outcome_sdc_total`: Per-outcome-kind tallies across every access.
//! - `faults_injected_total`: Number of faults materialized by the
//!   generator, across every kind.
//! - `retirements_total`: Number of chip/pin retirements performed.
//! - `scrub_events_total`: Number of scrubber passes executed.

use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

lazy_static::lazy_static! {
    pub static ref TRIALS_TOTAL: IntCounter =
        register_int_counter!("trials_total", "Total completed Monte-Carlo trials").unwrap();
    pub static ref OUTCOME_NE: IntCounter =
        register_int_counter!("outcome_ne_total", "Accesses that decoded NE").unwrap();
    pub static ref OUTCOME_CE: IntCounter =
        register_int_counter!("outcome_ce_total", "Accesses that decoded CE").unwrap();
    pub static ref OUTCOME_DUE: IntCounter =
        register_int_counter!("outcome_due_total", "Accesses that decoded DUE").unwrap();
    pub static ref OUTCOME_SDC: IntCounter =
        register_int_counter!("outcome_sdc_total", "Accesses that decoded SDC").unwrap();
    pub static ref FAULTS_INJECTED: IntCounter =
        register_int_counter!("faults_injected_total", "Faults materialized by the generator").unwrap();
    pub static ref RETIREMENTS_TOTAL: IntCounter =
        register_int_counter!("retirements_total", "Chip/pin retirements performed").unwrap();
    pub static ref SCRUB_EVENTS_TOTAL: IntCounter =
        register_int_counter!("scrub_events_total", "Scrubber passes executed").unwrap();
}

/// Increments the counter matching `outcome`'s kind.
pub fn record_outcome(outcome: crate::codec::Outcome) {
    match outcome {
        crate::codec::Outcome::Ne => OUTCOME_NE.inc(),
        crate::codec::Outcome::Ce => OUTCOME_CE.inc(),
        crate::codec::Outcome::Due => OUTCOME_DUE.inc(),
        crate::codec::Outcome::Sdc => OUTCOME_SDC.inc(),
    }
}

/// Renders the current counter set as Prometheus text exposition format,
/// mirroring the teacher's own `flush()` (logged rather than served by
/// default — a CLI flag decides whether to print it).
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metrics = prometheus::gather();
    let mut buf = Vec::new();
    if encoder.encode(&metrics, &mut buf).is_ok() {
        String::from_utf8_lossy(&buf).into_owned()
    } else {
        String::new()
    }
}

pub fn flush() {
    log::info!("\n{}", render());
}
