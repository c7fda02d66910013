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

//! The slot manager (table of slot supply/demand and matching policy) is an
//! external collaborator (SS1): only its contract with the core matters
//! here. This mirrors `ClusterState`'s `reserve_slots`/`register_executor`
//! split in `ballista-scheduler::cluster`, generalized to the spec's
//! vocabulary of slots, allocations, and resource profiles.

use std::sync::Arc;

use rm_core::ids::{AllocationId, InstanceId, JobId, ResourceId, ResourceManagerId, SlotId};

use crate::outcome::OperationFailure;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceProfile {
    pub cpu_cores: u64,
    pub memory_mb: u64,
}

#[derive(Debug, Clone)]
pub struct SlotRequestSpec {
    pub job_id: JobId,
    pub allocation_id: AllocationId,
    pub profile: ResourceProfile,
    pub preferred_resource_id: Option<ResourceId>,
}

#[derive(Debug, Clone)]
pub struct SlotStatus {
    pub slot_id: SlotId,
    pub resource_id: ResourceId,
    pub allocation_id: Option<AllocationId>,
    pub profile: ResourceProfile,
}

/// A task executor's snapshot of all its slots and their allocations.
#[derive(Debug, Clone, Default)]
pub struct SlotReport(pub Vec<SlotStatus>);

/// Cluster-wide totals backing `requestResourceOverview` (C9).
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotCounts {
    pub total: u64,
    pub free: u64,
}

/// The callback surface the core hands the slot manager so that it can
/// request new workers, release existing ones, and report allocation
/// failures back to job managers (C7). Defined here because the slot
/// manager is the sole consumer of it.
#[async_trait::async_trait]
pub trait ResourceActions: Send + Sync {
    async fn release_resource(&self, instance_id: InstanceId, cause: String);
    async fn allocate_resource(&self, profile: ResourceProfile) -> Vec<ResourceProfile>;
    async fn notify_allocation_failure(&self, job_id: JobId, allocation_id: AllocationId, cause: String);
}

/// Contract the core needs from the slot manager (C6's dispatch target,
/// C7's caller). Accessed exclusively from the actor loop -- no internal
/// locking is required by implementations.
#[async_trait::async_trait]
pub trait SlotManager: Send + Sync {
    /// Called once per leadership grant (SS4.3), after the fencing token has
    /// been set, with a fresh `ResourceActions` bound to the new epoch.
    async fn start(&self, fencing_token: ResourceManagerId, actions: Arc<dyn ResourceActions>);

    /// Initial registration, triggered by `sendSlotReport` (SS4.5): makes
    /// the task executor visible to scheduling for the first time.
    async fn register_task_manager(
        &self,
        resource_id: ResourceId,
        instance_id: InstanceId,
        report: SlotReport,
    ) -> Result<(), OperationFailure>;

    /// Called from `releaseResource` (C7) and from any task-executor
    /// disconnect path (SS4.5); must also be called when `releaseResource`
    /// finds no matching worker in the table, to clean residual state
    /// (invariant 4, SS3).
    async fn unregister_task_manager(&self, instance_id: InstanceId, cause: String);

    /// Subsequent slot-state updates arrive as heartbeat payloads, not as
    /// repeated `sendSlotReport` calls (SS4.2).
    async fn report_slot_status(&self, resource_id: ResourceId, report: SlotReport);

    async fn register_slot_request(&self, request: SlotRequestSpec) -> Result<(), OperationFailure>;

    /// Best-effort: the caller may race with allocation (SS4.6).
    async fn cancel_slot_request(&self, allocation_id: AllocationId);

    async fn free_slot(&self, slot_id: SlotId);

    /// Read-only snapshot backing introspection (C9); never routed through
    /// the actor loop.
    fn slot_counts(&self) -> SlotCounts;

    /// Called on leadership revocation (SS4.3); after this call the slot
    /// manager must not issue any further `ResourceActions` calls until a
    /// fresh one is handed to it by the next `grant_leadership`.
    async fn suspend(&self);
}
