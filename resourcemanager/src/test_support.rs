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

//! In-memory fakes for every external collaborator, so the registration
//! state machine and actor loop can be exercised without a real transport,
//! election backend, or cloud provisioner. Mirrors the shape of
//! `scheduler/src/test_utils.rs`'s in-memory `ClusterState`/`JobState`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use rm_core::ids::{AllocationId, InstanceId, JobId, JobMasterId, ResourceId, ResourceManagerId};

use crate::outcome::{FatalError, OperationFailure};
use crate::provisioner::WorkerProvisioner;
use crate::registration::job_manager::JobManagerGateway;
use crate::registration::task_executor::TaskExecutorGateway;
use crate::slot_manager::{ResourceActions, ResourceProfile, SlotCounts, SlotManager, SlotReport, SlotRequestSpec};

/// Call log entry recorded by `FakeJobManagerGateway` / `FakeTaskExecutorGateway`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    HeartbeatRequested,
    Disconnected { fencing_token: Option<String>, cause: String },
    AllocationFailureNotified { allocation_id: String, cause: String },
}

#[derive(Default)]
pub struct FakeJobManagerGateway {
    calls: Mutex<Vec<GatewayCall>>,
}

impl FakeJobManagerGateway {
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }
}

#[async_trait::async_trait]
impl JobManagerGateway for FakeJobManagerGateway {
    async fn heartbeat_from_resource_manager(&self, _resource_id: &ResourceId) {
        self.calls.lock().push(GatewayCall::HeartbeatRequested);
    }

    async fn disconnect_resource_manager(&self, fencing_token: Option<&str>, cause: &str) {
        self.calls.lock().push(GatewayCall::Disconnected {
            fencing_token: fencing_token.map(str::to_owned),
            cause: cause.to_owned(),
        });
    }

    async fn notify_allocation_failure(&self, allocation_id: &str, cause: &str) {
        self.calls.lock().push(GatewayCall::AllocationFailureNotified {
            allocation_id: allocation_id.to_owned(),
            cause: cause.to_owned(),
        });
    }
}

#[derive(Default)]
pub struct FakeTaskExecutorGateway {
    calls: Mutex<Vec<GatewayCall>>,
}

impl FakeTaskExecutorGateway {
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }
}

#[async_trait::async_trait]
impl TaskExecutorGateway for FakeTaskExecutorGateway {
    async fn heartbeat_from_resource_manager(&self, _resource_id: &ResourceId) {
        self.calls.lock().push(GatewayCall::HeartbeatRequested);
    }

    async fn disconnect_resource_manager(&self, cause: &str) {
        self.calls.lock().push(GatewayCall::Disconnected {
            fencing_token: None,
            cause: cause.to_owned(),
        });
    }
}

/// Always grants and confirms leadership for whichever session last asked.
#[derive(Default)]
pub struct FakeLeaderElection {
    current_session: Mutex<Option<ResourceManagerId>>,
}

impl FakeLeaderElection {
    pub fn grant(&self, session: ResourceManagerId) {
        *self.current_session.lock() = Some(session);
    }

    pub fn revoke(&self) {
        *self.current_session.lock() = None;
    }
}

#[async_trait::async_trait]
impl crate::leader::LeaderElection for FakeLeaderElection {
    async fn is_leader(&self, session: &ResourceManagerId) -> bool {
        self.current_session.lock().as_ref() == Some(session)
    }

    async fn confirm_leadership(&self, _session: &ResourceManagerId) -> Result<(), FatalError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeJobLeaderIdService {
    leaders: Mutex<std::collections::HashMap<JobId, JobMasterId>>,
}

impl FakeJobLeaderIdService {
    pub fn set_leader(&self, job_id: JobId, job_master_id: JobMasterId) {
        self.leaders.lock().insert(job_id, job_master_id);
    }
}

#[async_trait::async_trait]
impl crate::leader::JobLeaderIdService for FakeJobLeaderIdService {
    fn contains_job(&self, job_id: &JobId) -> bool {
        self.leaders.lock().contains_key(job_id)
    }

    async fn add_job(&self, job_id: JobId) -> Result<(), FatalError> {
        self.leaders.lock().entry(job_id).or_insert_with(|| JobMasterId::from("unset"));
        Ok(())
    }

    fn remove_job(&self, job_id: &JobId) {
        self.leaders.lock().remove(job_id);
    }

    async fn get_leader_id(&self, job_id: &JobId) -> Result<JobMasterId, OperationFailure> {
        self.leaders
            .lock()
            .get(job_id)
            .cloned()
            .ok_or_else(|| OperationFailure::new(format!("no leader tracked for job {job_id}")))
    }

    fn is_valid_timeout(&self, _job_id: &JobId, _timeout_token: Uuid) -> bool {
        true
    }

    fn clear(&self) -> Result<(), FatalError> {
        self.leaders.lock().clear();
        Ok(())
    }
}

#[derive(Default)]
struct SlotManagerState {
    task_managers: std::collections::HashSet<InstanceId>,
    requests: Vec<SlotRequestSpec>,
    cancellations: Vec<AllocationId>,
    freed: Vec<rm_core::ids::SlotId>,
    suspended: bool,
}

/// In-memory slot manager: records every call it receives so tests can
/// assert on them, grounded in the same "record calls, assert on the log"
/// pattern `ExecutorManager`'s test doubles use.
#[derive(Default)]
pub struct FakeSlotManager {
    state: Mutex<SlotManagerState>,
}

impl FakeSlotManager {
    pub fn requests(&self) -> Vec<SlotRequestSpec> {
        self.state.lock().requests.clone()
    }

    pub fn cancellations(&self) -> Vec<AllocationId> {
        self.state.lock().cancellations.clone()
    }

    pub fn is_suspended(&self) -> bool {
        self.state.lock().suspended
    }

    pub fn has_task_manager(&self, instance_id: &InstanceId) -> bool {
        self.state.lock().task_managers.contains(instance_id)
    }

    pub fn freed_slots(&self) -> Vec<rm_core::ids::SlotId> {
        self.state.lock().freed.clone()
    }
}

#[async_trait::async_trait]
impl SlotManager for FakeSlotManager {
    async fn start(&self, _fencing_token: ResourceManagerId, _actions: Arc<dyn ResourceActions>) {
        self.state.lock().suspended = false;
    }

    async fn register_task_manager(
        &self,
        _resource_id: ResourceId,
        instance_id: InstanceId,
        _report: SlotReport,
    ) -> Result<(), OperationFailure> {
        self.state.lock().task_managers.insert(instance_id);
        Ok(())
    }

    async fn unregister_task_manager(&self, instance_id: InstanceId, _cause: String) {
        self.state.lock().task_managers.remove(&instance_id);
    }

    async fn report_slot_status(&self, _resource_id: ResourceId, _report: SlotReport) {}

    async fn register_slot_request(&self, request: SlotRequestSpec) -> Result<(), OperationFailure> {
        self.state.lock().requests.push(request);
        Ok(())
    }

    async fn cancel_slot_request(&self, allocation_id: AllocationId) {
        self.state.lock().cancellations.push(allocation_id);
    }

    async fn free_slot(&self, slot_id: rm_core::ids::SlotId) {
        self.state.lock().freed.push(slot_id);
    }

    fn slot_counts(&self) -> SlotCounts {
        SlotCounts::default()
    }

    async fn suspend(&self) {
        self.state.lock().suspended = true;
    }
}

/// Accepts every worker unconditionally and hands back an incrementing
/// integer handle; never refuses provisioning.
#[derive(Default)]
pub struct FakeWorkerProvisioner {
    next_handle: AtomicU64,
}

#[async_trait::async_trait]
impl WorkerProvisioner<u64> for FakeWorkerProvisioner {
    async fn initialize(&self) -> Result<(), FatalError> {
        Ok(())
    }

    async fn start_new_worker(&self, profile: ResourceProfile) -> Vec<ResourceProfile> {
        vec![profile]
    }

    async fn worker_started(&self, _resource_id: &ResourceId) -> Option<u64> {
        Some(self.next_handle.fetch_add(1, Ordering::SeqCst))
    }

    async fn stop_worker(&self, _resource_id: &ResourceId, _worker_handle: &u64) {}

    async fn internal_deregister_application(&self, _diagnostics: Option<String>) {}

    async fn prepare_leadership(&self) {}

    async fn clear_state(&self) {}
}
