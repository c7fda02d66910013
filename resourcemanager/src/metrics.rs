// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Ambient-stack metrics: counts registrations, declines, fatal errors, and
//! heartbeat timeouts, the same shape as `ballista-scheduler`'s
//! `SchedulerMetricsCollector` / `PrometheusMetricsCollector`.

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

pub trait MetricsCollector: Send + Sync {
    fn record_registration(&self, participant: &str);
    fn record_decline(&self, participant: &str);
    fn record_fatal_error(&self);
    fn record_heartbeat_timeout(&self, participant: &str);
}

pub struct PrometheusMetricsCollector {
    registrations: IntCounterVec,
    declines: IntCounterVec,
    fatal_errors: IntCounter,
    heartbeat_timeouts: IntCounterVec,
}

impl PrometheusMetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let registrations = IntCounterVec::new(
            Opts::new("resource_manager_registrations_total", "Accepted registrations by participant kind"),
            &["participant"],
        )?;
        let declines = IntCounterVec::new(
            Opts::new("resource_manager_declines_total", "Declined RPCs by participant kind"),
            &["participant"],
        )?;
        let fatal_errors = IntCounter::new(
            "resource_manager_fatal_errors_total",
            "Fatal errors escalated to the fatal-error handler",
        )?;
        let heartbeat_timeouts = IntCounterVec::new(
            Opts::new("resource_manager_heartbeat_timeouts_total", "Heartbeat timeouts by participant kind"),
            &["participant"],
        )?;

        registry.register(Box::new(registrations.clone()))?;
        registry.register(Box::new(declines.clone()))?;
        registry.register(Box::new(fatal_errors.clone()))?;
        registry.register(Box::new(heartbeat_timeouts.clone()))?;

        Ok(Self {
            registrations,
            declines,
            fatal_errors,
            heartbeat_timeouts,
        })
    }
}

/// Discards every observation. Used by the standalone binary's tests and by
/// the test-support fakes, where asserting on counters is not the point.
#[derive(Default)]
pub struct NoopMetricsCollector;

impl MetricsCollector for NoopMetricsCollector {
    fn record_registration(&self, _participant: &str) {}
    fn record_decline(&self, _participant: &str) {}
    fn record_fatal_error(&self) {}
    fn record_heartbeat_timeout(&self, _participant: &str) {}
}

impl MetricsCollector for PrometheusMetricsCollector {
    fn record_registration(&self, participant: &str) {
        self.registrations.with_label_values(&[participant]).inc();
    }

    fn record_decline(&self, participant: &str) {
        self.declines.with_label_values(&[participant]).inc();
    }

    fn record_fatal_error(&self) {
        self.fatal_errors.inc();
    }

    fn record_heartbeat_timeout(&self, participant: &str) {
        self.heartbeat_timeouts.with_label_values(&[participant]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_twice_on_the_same_registry_fails() {
        let registry = Registry::new();
        PrometheusMetricsCollector::new(&registry).unwrap();
        assert!(PrometheusMetricsCollector::new(&registry).is_err());
    }

    #[test]
    fn counters_increment_independently_per_participant() {
        let registry = Registry::new();
        let metrics = PrometheusMetricsCollector::new(&registry).unwrap();
        metrics.record_registration("task_executor");
        metrics.record_registration("task_executor");
        metrics.record_registration("job_manager");

        let families = registry.gather();
        let registrations = families
            .iter()
            .find(|f| f.get_name() == "resource_manager_registrations_total")
            .unwrap();
        let total: f64 = registrations.get_metric().iter().map(|m| m.get_counter().get_value()).sum();
        assert_eq!(total, 3.0);
    }
}
