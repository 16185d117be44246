//! Availability prober + the per-job runner task.
//!
//! The real booking site is probed through the `CourtProber` seam; this crate
//! ships only the simulated implementation.  The runner walks dates × courts
//! and narrates its progress onto the job's event log exactly the way the
//! stream consumer expects it: a `log` before each probe, a `result_partial`
//! (+ `log`) after, and one terminal `done` carrying the full snapshot.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use court_proto::config::CheckerConfig;
use court_proto::dates::DateRange;
use court_proto::protocol::{court_label, StreamEvent, COURT_RANGE};
use court_proto::results::{CellValue, ResultsTable};
use thiserror::Error;
use tracing::{error, info};

use crate::jobs::Job;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("SiteError: {0}")]
    Site(String),
}

/// The seam between the job runner and whatever actually checks a court.
pub trait CourtProber: Send + Sync + 'static {
    fn probe(
        &self,
        date: NaiveDate,
        court: u32,
    ) -> impl std::future::Future<Output = Result<Vec<String>, ProbeError>> + Send;
}

// ── Simulated prober ──────────────────────────────────────────────────────────

/// Deterministic stand-in for the real site: slot lists are derived from a
/// hash of (date, court), so the same request always yields the same table.
pub struct SimulatedProber {
    config: CheckerConfig,
}

impl SimulatedProber {
    pub fn new(config: CheckerConfig) -> Self {
        Self { config }
    }

    fn seed(date: NaiveDate, court: u32) -> u64 {
        let mut h = DefaultHasher::new();
        date.hash(&mut h);
        court.hash(&mut h);
        h.finish()
    }
}

impl CourtProber for SimulatedProber {
    async fn probe(&self, date: NaiveDate, court: u32) -> Result<Vec<String>, ProbeError> {
        if self.config.probe_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.probe_delay_ms)).await;
        }
        let seed = Self::seed(date, court);
        if self.config.failure_one_in > 0 && seed % self.config.failure_one_in as u64 == 0 {
            return Err(ProbeError::Site("booking page did not load".to_string()));
        }
        // One candidate slot per hour 07:00..22:00; roughly a third are free.
        let mut slots = Vec::new();
        for hour in 7u64..22 {
            if (seed >> (hour % 32)) & 0b11 == 0 {
                slots.push(format!("{:02}:00-{:02}:00", hour, hour + 1));
            }
        }
        Ok(slots)
    }
}

// ── Job runner ────────────────────────────────────────────────────────────────

/// Execute one availability job, narrating onto `job`'s event log.
pub async fn run_job<P: CourtProber>(range: DateRange, prober: Arc<P>, job: Arc<Job>) {
    let mut results = ResultsTable::new();
    for date in range.days() {
        let date_str = date.format(court_proto::dates::DATE_FMT).to_string();
        for court in COURT_RANGE {
            let label = court_label(court);
            job.push(StreamEvent::Log {
                msg: format!("{date_str} {label}: checking..."),
            })
            .await;
            info!("{date_str} {label}: checking...");

            match prober.probe(date, court).await {
                Ok(slots) => {
                    let msg = format!("{date_str} {label}: OK ({} slots)", slots.len());
                    results.set(&date_str, &court.to_string(), CellValue::Slots(slots.clone()));
                    job.push(StreamEvent::Log { msg: msg.clone() }).await;
                    job.push(StreamEvent::ResultPartial {
                        date: date_str.clone(),
                        court: court.to_string(),
                        value: CellValue::Slots(slots),
                    })
                    .await;
                    info!("{msg}");
                }
                Err(e) => {
                    let msg = format!("{date_str} {label}: ERROR: {e}");
                    results.set(&date_str, &court.to_string(), CellValue::Unavailable);
                    job.push(StreamEvent::Log { msg: msg.clone() }).await;
                    job.push(StreamEvent::ResultPartial {
                        date: date_str.clone(),
                        court: court.to_string(),
                        value: CellValue::Unavailable,
                    })
                    .await;
                    error!("{msg}");
                }
            }
        }
    }

    job.push(StreamEvent::Done {
        results: Some(results),
    })
    .await;
}
