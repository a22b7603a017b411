// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request and authentication metrics.
//!
//! Lock-free counters rendered in the Prometheus text exposition format at
//! `GET /metrics`.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default Prometheus latency buckets (seconds).
const DURATION_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Running `f64` sum stored as bits.
#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn add(&self, value: f64) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Count and total of observed durations.
#[derive(Debug, Default)]
pub struct Summary {
    count: AtomicU64,
    sum: AtomicF64,
}

impl Summary {
    pub fn observe(&self, elapsed: Duration) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum.add(elapsed.as_secs_f64());
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Cumulative-bucket histogram over durations.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<(f64, AtomicU64)>,
    summary: Summary,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            buckets: DURATION_BUCKETS
                .iter()
                .map(|bound| (*bound, AtomicU64::new(0)))
                .collect(),
            summary: Summary::default(),
        }
    }
}

impl Histogram {
    pub fn observe(&self, elapsed: Duration) {
        let seconds = elapsed.as_secs_f64();
        for (bound, count) in &self.buckets {
            if seconds <= *bound {
                count.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.summary.observe(elapsed);
    }

    pub fn count(&self) -> u64 {
        self.summary.count()
    }
}

/// All gateway metrics.
#[derive(Debug, Default)]
pub struct Metrics {
    pub http_requests_total: Counter,
    pub login_success_total: Counter,
    pub login_failure_total: Counter,
    pub register_success_total: Counter,
    pub register_failure_total: Counter,
    pub jwt_validation_failure_total: Counter,
    pub secure_request_total: Counter,
    /// Whole request, guard plus handler.
    pub request_duration_seconds: Histogram,
    /// Guard pipeline only.
    pub request_processing_seconds: Summary,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();

        let counters = [
            ("http_requests_total", "Total HTTP requests", &self.http_requests_total),
            ("login_success_total", "Total successful logins", &self.login_success_total),
            ("login_failure_total", "Total failed logins", &self.login_failure_total),
            (
                "register_success_total",
                "Total successful registrations",
                &self.register_success_total,
            ),
            (
                "register_failure_total",
                "Total failed registrations",
                &self.register_failure_total,
            ),
            (
                "jwt_validation_failure_total",
                "Total session token validation failures",
                &self.jwt_validation_failure_total,
            ),
            (
                "secure_request_total",
                "Total secure API requests",
                &self.secure_request_total,
            ),
        ];

        for (name, help, counter) in counters {
            let _ = writeln!(out, "# HELP {name} {help}");
            let _ = writeln!(out, "# TYPE {name} counter");
            let _ = writeln!(out, "{name} {}", counter.get());
        }

        let summary = &self.request_processing_seconds;
        let _ = writeln!(out, "# HELP request_processing_seconds Time spent processing request");
        let _ = writeln!(out, "# TYPE request_processing_seconds summary");
        let _ = writeln!(out, "request_processing_seconds_count {}", summary.count());
        let _ = writeln!(out, "request_processing_seconds_sum {}", summary.sum.get());

        let histogram = &self.request_duration_seconds;
        let _ = writeln!(out, "# HELP request_duration_seconds Histogram of request duration");
        let _ = writeln!(out, "# TYPE request_duration_seconds histogram");
        for (bound, count) in &histogram.buckets {
            let _ = writeln!(
                out,
                "request_duration_seconds_bucket{{le=\"{bound}\"}} {}",
                count.load(Ordering::Relaxed)
            );
        }
        let _ = writeln!(
            out,
            "request_duration_seconds_bucket{{le=\"+Inf\"}} {}",
            histogram.count()
        );
        let _ = writeln!(out, "request_duration_seconds_count {}", histogram.count());
        let _ = writeln!(out, "request_duration_seconds_sum {}", histogram.summary.sum.get());

        out
    }
}
