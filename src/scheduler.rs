// src/scheduler.rs
//! Minute-aligned poll loop.
//!
//! `NotStarted → Running` happens on the first ready signal from the chat
//! transport; later ready signals (reconnects) are ignored. The loop runs one
//! pipeline cycle, logs any error, then sleeps until the next whole minute.
//! It only stops when the transport reports it is closed.

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use metrics::{counter, gauge};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::feed::FeedSource;
use crate::notify::Transport;
use crate::pipeline::RelayEngine;

/// Start of the minute after `now`. A `now` that sits exactly on a boundary
/// still moves to the following one.
pub fn next_minute_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let bumped = now + ChronoDuration::minutes(1);
    bumped
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(bumped)
}

/// Time left until [`next_minute_boundary`], never negative.
pub fn until_next_minute(now: DateTime<Utc>) -> Duration {
    (next_minute_boundary(now) - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

pub struct PollScheduler<F, T> {
    engine: Option<RelayEngine<F, T>>,
    started: bool,
    closed: watch::Receiver<bool>,
}

impl<F, T> PollScheduler<F, T>
where
    F: FeedSource + 'static,
    T: Transport + 'static,
{
    /// `closed` flips to `true` when the transport shuts down.
    pub fn new(engine: RelayEngine<F, T>, closed: watch::Receiver<bool>) -> Self {
        Self {
            engine: Some(engine),
            started: false,
            closed,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Handle a ready signal. Spawns the poll loop the first time only; the
    /// returned handle yields the engine back once the loop has stopped.
    pub fn on_ready(&mut self) -> Option<JoinHandle<RelayEngine<F, T>>> {
        if self.started {
            tracing::debug!("ready again; poll loop already running");
            return None;
        }
        let engine = self.engine.take()?;
        self.started = true;
        tracing::info!("starting poll loop");
        Some(tokio::spawn(run_poll_loop(engine, self.closed.clone())))
    }
}

/// Seed the seen set, then cycle until `closed` turns true.
pub async fn run_poll_loop<F, T>(
    mut engine: RelayEngine<F, T>,
    mut closed: watch::Receiver<bool>,
) -> RelayEngine<F, T>
where
    F: FeedSource,
    T: Transport,
{
    engine.seed_seen().await;

    while !*closed.borrow() {
        tracing::info!("starting canvas check cycle");
        match engine.run_cycle().await {
            Ok(report) => {
                counter!("relay_cycles_total").increment(1);
                tracing::info!(
                    fetched = report.fetched,
                    new = report.new,
                    delivered = report.delivered,
                    failed = report.failed,
                    unresolved = report.unresolved,
                    "cycle finished"
                );
            }
            Err(e) => {
                counter!("relay_cycle_errors_total").increment(1);
                tracing::error!(error = ?e, "error occurred while checking canvas");
            }
        }
        gauge!("relay_last_cycle_ts").set(Utc::now().timestamp() as f64);

        let wait = until_next_minute(Utc::now());
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            changed = closed.changed() => {
                if changed.is_err() {
                    tracing::warn!("shutdown signal dropped; stopping poll loop");
                    break;
                }
            }
        }
    }

    tracing::info!("poll loop stopped");
    engine
}
