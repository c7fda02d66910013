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

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rm_core::ids::{InstanceId, ResourceId};

/// Out-of-process RPC handle for a task executor. External collaborator;
/// implementations live outside this crate.
#[async_trait::async_trait]
pub trait TaskExecutorGateway: Send + Sync {
    async fn heartbeat_from_resource_manager(&self, resource_id: &ResourceId);
    async fn disconnect_resource_manager(&self, cause: &str);
}

/// Hardware a task executor advertised at registration time.
#[derive(Debug, Clone)]
pub struct HardwareDescription {
    pub cpu_cores: u64,
    pub memory_mb: u64,
}

/// `(remote gateway, framework-specific worker handle W, data port, hardware
/// description, InstanceID)`. `W` is whatever the framework-specific worker
/// provisioner (C7) hands back from `workerStarted` -- this crate never
/// interprets it.
pub struct WorkerRegistration<W> {
    pub resource_id: ResourceId,
    pub gateway: Arc<dyn TaskExecutorGateway>,
    pub worker_handle: W,
    pub data_port: u32,
    pub hardware: HardwareDescription,
    pub instance_id: InstanceId,
}

impl<W> std::fmt::Debug for WorkerRegistration<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRegistration")
            .field("resource_id", &self.resource_id)
            .field("data_port", &self.data_port)
            .field("instance_id", &self.instance_id)
            .finish()
    }
}

/// Tracks an in-flight task-executor registration attempt for a `ResourceId`.
///
/// The design notes call for replacing pointer-identity comparison of the
/// in-flight connect future with a monotonically increasing attempt
/// sequence number: the continuation that completes the gateway connect
/// checks its own `attempt` against whatever is currently stored here, and
/// declines as outdated if a newer attempt has since been initiated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingTaskExecutor {
    pub attempt: u64,
}

/// `ResourceID -> WorkerRegistration` plus `ResourceID -> pending attempt`
/// for in-flight registrations, plus the inverted `InstanceID -> ResourceID`
/// index the design notes recommend over a linear scan in `releaseResource`.
pub struct TaskExecutorTable<W> {
    workers: DashMap<ResourceId, Arc<WorkerRegistration<W>>>,
    by_instance: DashMap<InstanceId, ResourceId>,
    pending: DashMap<ResourceId, PendingTaskExecutor>,
    next_attempt: AtomicU64,
}

impl<W> Default for TaskExecutorTable<W> {
    fn default() -> Self {
        Self {
            workers: DashMap::new(),
            by_instance: DashMap::new(),
            pending: DashMap::new(),
            next_attempt: AtomicU64::new(0),
        }
    }
}

impl<W> TaskExecutorTable<W> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new pending registration for `resource_id`, superseding any
    /// attempt already in flight. Returns the sequence number the caller
    /// must present when its connect future resolves.
    pub fn begin_pending(&self, resource_id: ResourceId) -> u64 {
        let attempt = self.next_attempt.fetch_add(1, Ordering::SeqCst);
        self.pending.insert(resource_id, PendingTaskExecutor { attempt });
        attempt
    }

    /// True if `attempt` is still the most recent pending attempt recorded
    /// for `resource_id` -- i.e. no newer registration has superseded it.
    pub fn is_current_attempt(&self, resource_id: &ResourceId, attempt: u64) -> bool {
        self.pending
            .get(resource_id)
            .map(|p| p.attempt == attempt)
            .unwrap_or(false)
    }

    pub fn clear_pending(&self, resource_id: &ResourceId, attempt: u64) {
        if self.is_current_attempt(resource_id, attempt) {
            self.pending.remove(resource_id);
        }
    }

    pub fn get(&self, resource_id: &ResourceId) -> Option<Arc<WorkerRegistration<W>>> {
        self.workers.get(resource_id).map(|r| r.clone())
    }

    pub fn get_by_instance(&self, instance_id: &InstanceId) -> Option<Arc<WorkerRegistration<W>>> {
        let resource_id = self.by_instance.get(instance_id)?.clone();
        self.get(&resource_id)
    }

    /// Install a new registration, replacing (not merging) any existing one
    /// for the same `ResourceId`. The caller is responsible for having
    /// already unregistered the previous entry from the slot manager.
    pub fn insert(&self, registration: WorkerRegistration<W>) -> Arc<WorkerRegistration<W>> {
        let registration = Arc::new(registration);
        if let Some(previous) = self.workers.get(&registration.resource_id) {
            self.by_instance.remove(&previous.instance_id);
        }
        self.by_instance
            .insert(registration.instance_id.clone(), registration.resource_id.clone());
        self.workers
            .insert(registration.resource_id.clone(), registration.clone());
        registration
    }

    pub fn remove(&self, resource_id: &ResourceId) -> Option<Arc<WorkerRegistration<W>>> {
        let removed = self.workers.remove(resource_id).map(|(_, v)| v);
        if let Some(registration) = &removed {
            self.by_instance.remove(&registration.instance_id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Arc<WorkerRegistration<W>>> + '_ {
        self.workers.iter().map(|r| r.clone())
    }

    pub fn clear(&self) {
        self.workers.clear();
        self.by_instance.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTaskExecutorGateway;

    fn registration(resource_id: &str, instance_id: InstanceId) -> WorkerRegistration<()> {
        WorkerRegistration {
            resource_id: ResourceId::from(resource_id),
            gateway: Arc::new(FakeTaskExecutorGateway::default()),
            worker_handle: (),
            data_port: 4000,
            hardware: HardwareDescription {
                cpu_cores: 4,
                memory_mb: 8192,
            },
            instance_id,
        }
    }

    #[test]
    fn fresh_instance_id_replaces_previous() {
        let table: TaskExecutorTable<()> = TaskExecutorTable::new();
        let first = InstanceId::generate();
        table.insert(registration("r1", first.clone()));

        let second = InstanceId::generate();
        table.insert(registration("r1", second.clone()));

        assert!(table.get_by_instance(&first).is_none());
        assert!(table.get_by_instance(&second).is_some());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn newer_pending_attempt_supersedes_older() {
        let table: TaskExecutorTable<()> = TaskExecutorTable::new();
        let resource_id = ResourceId::from("r1");

        let first_attempt = table.begin_pending(resource_id.clone());
        let second_attempt = table.begin_pending(resource_id.clone());

        assert_ne!(first_attempt, second_attempt);
        assert!(!table.is_current_attempt(&resource_id, first_attempt));
        assert!(table.is_current_attempt(&resource_id, second_attempt));
    }

    #[test]
    fn remove_drops_instance_index() {
        let table: TaskExecutorTable<()> = TaskExecutorTable::new();
        let instance_id = InstanceId::generate();
        table.insert(registration("r1", instance_id.clone()));
        table.remove(&ResourceId::from("r1"));

        assert!(table.get_by_instance(&instance_id).is_none());
    }
}
