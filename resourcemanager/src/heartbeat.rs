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

//! Heartbeat monitors (C2): two logically independent monitors, one per
//! participant kind, created on leadership acquisition and destroyed on
//! revocation. Each monitor owns a timer and reports timeouts as *commands*
//! fed back to the resource manager's actor loop, never as a direct
//! callback -- the single-writer property from SS5 depends on every state
//! mutation arriving through the same channel the RPC handlers use.

use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;

/// Generic liveness tracker for one participant kind. `Id` is `ResourceId`
/// for both the task-manager and job-manager monitors; they are kept as two
/// separate instances (not templated over a sum type) so that their timers
/// and timeout causes can never cross-contaminate (invariant 3, SS3).
pub struct HeartbeatMonitor<Id: Eq + Hash + Clone + Send + Sync + 'static> {
    last_contact: Arc<DashMap<Id, Instant>>,
    sweep: Option<JoinHandle<()>>,
}

impl<Id: Eq + Hash + Clone + Send + Sync + 'static> HeartbeatMonitor<Id> {
    /// `on_tick` is invoked once per monitored target on every `interval`
    /// tick and should issue the outbound heartbeat request (the monitor is
    /// a sender-style role: it asks, the target replies via RPC and that
    /// reply calls `record_heartbeat`). `on_timeout` is invoked once per
    /// target whose last contact is older than `timeout`, and the target is
    /// immediately removed from monitoring to avoid repeat firing.
    pub fn start<F, G>(interval: Duration, timeout: Duration, on_tick: F, on_timeout: G) -> Self
    where
        F: Fn(Id) + Send + Sync + 'static,
        G: Fn(Id) + Send + Sync + 'static,
    {
        let last_contact: Arc<DashMap<Id, Instant>> = Arc::new(DashMap::new());
        let sweep_contact = last_contact.clone();

        let handle = tokio::task::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let now = Instant::now();
                let mut timed_out = Vec::new();
                for entry in sweep_contact.iter() {
                    let (id, last_seen) = (entry.key().clone(), *entry.value());
                    if now.duration_since(last_seen) > timeout {
                        timed_out.push(id.clone());
                    } else {
                        on_tick(id);
                    }
                }
                for id in timed_out {
                    sweep_contact.remove(&id);
                    on_timeout(id);
                }
            }
        });

        Self {
            last_contact,
            sweep: Some(handle),
        }
    }

    /// Added at the moment of successful registration (SS4.5).
    pub fn monitor_target(&self, id: Id) {
        self.last_contact.insert(id, Instant::now());
    }

    /// Called from the inbound heartbeat RPC handler to re-arm the timer.
    pub fn record_heartbeat(&self, id: &Id) {
        if let Some(mut entry) = self.last_contact.get_mut(id) {
            *entry = Instant::now();
        }
    }

    /// Removed before the corresponding table entry is dropped (SS4.5).
    pub fn stop_monitoring(&self, id: &Id) {
        self.last_contact.remove(id);
    }

    pub fn is_monitored(&self, id: &Id) -> bool {
        self.last_contact.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.last_contact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_contact.is_empty()
    }
}

impl<Id: Eq + Hash + Clone + Send + Sync + 'static> Drop for HeartbeatMonitor<Id> {
    fn drop(&mut self) {
        if let Some(handle) = self.sweep.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_once_and_stops_monitoring_the_target() {
        let timed_out = Arc::new(Mutex::new(Vec::new()));
        let ticks = Arc::new(AtomicUsize::new(0));

        let timed_out_cb = timed_out.clone();
        let ticks_cb = ticks.clone();
        let monitor: HeartbeatMonitor<String> = HeartbeatMonitor::start(
            Duration::from_millis(10),
            Duration::from_millis(25),
            move |_id| {
                ticks_cb.fetch_add(1, Ordering::SeqCst);
            },
            move |id| timed_out_cb.lock().unwrap().push(id),
        );

        monitor.monitor_target("r1".to_owned());
        tokio::time::advance(Duration::from_millis(100)).await;
        tokio::task::yield_now().await;

        assert_eq!(timed_out.lock().unwrap().as_slice(), &["r1".to_owned()]);
        assert!(!monitor.is_monitored(&"r1".to_owned()));
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_before_timeout_re_arms_the_timer() {
        let timed_out = Arc::new(Mutex::new(Vec::new()));
        let timed_out_cb = timed_out.clone();

        let monitor: HeartbeatMonitor<String> = HeartbeatMonitor::start(
            Duration::from_millis(10),
            Duration::from_millis(25),
            |_id| {},
            move |id| timed_out_cb.lock().unwrap().push(id),
        );

        monitor.monitor_target("r1".to_owned());
        tokio::time::advance(Duration::from_millis(20)).await;
        monitor.record_heartbeat(&"r1".to_owned());
        tokio::time::advance(Duration::from_millis(20)).await;
        tokio::task::yield_now().await;

        assert!(timed_out.lock().unwrap().is_empty());
        assert!(monitor.is_monitored(&"r1".to_owned()));
    }
}
