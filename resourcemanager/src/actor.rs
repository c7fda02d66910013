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

//! The actor loop (C8): a single owner task that drains a command queue and
//! serializes every mutation of the registration tables, heartbeat
//! monitors, leader state, and slot-manager interaction. Built on top of
//! `rm_core::event_loop::EventLoop`, replacing the "submit to main-thread
//! executor" idiom with a tagged command enum and reply channels, per the
//! design notes.
//!
//! `Command` carries two disjoint families: fenced RPC commands, checked by
//! `ResourceManagerActor::on_receive` against the current fencing token
//! before any handler runs (so a handler body always sees the token under
//! which it was admitted), and unfenced commands -- leadership transitions,
//! remote-initiated teardown, heartbeat/job-leader-id callbacks, and the
//! resource-actions bridge -- which by definition do not carry a caller
//! fencing token to check.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tokio::sync::oneshot;

use rm_core::error::Result as CoreResult;
use rm_core::event_loop::{EventAction, EventSender};
use rm_core::ids::{
    AllocationId, InstanceId, JobId, JobMasterId, ResourceId, ResourceManagerId, SlotId,
};

use crate::heartbeat::HeartbeatMonitor;
use crate::leader::{JobLeaderIdService, LeaderElection};
use crate::metrics::MetricsCollector;
use crate::model::{
    ClusterInformation, RegisterJobManagerReply, RegisterJobManagerRequest,
    RegisterTaskExecutorReply, RegisterTaskExecutorRequest, SlotRequestMessage,
};
use crate::outcome::{Admitted, AdmissionResult, Decline, FatalError, FatalErrorHandler, OperationFailure};
use crate::provisioner::WorkerProvisioner;
use crate::registration::job_manager::JobManagerGateway;
use crate::registration::task_executor::TaskExecutorGateway;
use crate::registration::{JobManagerRegistration, JobManagerTable, TaskExecutorTable, WorkerRegistration};
use crate::resource_actions::ActorResourceActions;
use crate::slot_manager::{ResourceProfile, SlotManager, SlotReport, SlotRequestSpec};

/// One RPC or internal event, carrying whatever reply channel its RPC
/// counterpart needs. `W` is the framework-specific worker handle threaded
/// through from `WorkerProvisioner`.
pub enum Command<W> {
    RegisterJobManager {
        fencing_token: ResourceManagerId,
        request: RegisterJobManagerRequest,
        gateway: Arc<dyn JobManagerGateway>,
        reply: oneshot::Sender<AdmissionResult<RegisterJobManagerReply>>,
    },
    RegisterTaskExecutor {
        fencing_token: ResourceManagerId,
        request: RegisterTaskExecutorRequest,
        gateway: Arc<dyn TaskExecutorGateway>,
        /// Sequence number obtained from `TaskExecutorTable::begin_pending`
        /// by the caller before it started connecting to the gateway.
        attempt: u64,
        reply: oneshot::Sender<AdmissionResult<RegisterTaskExecutorReply>>,
    },
    SendSlotReport {
        fencing_token: ResourceManagerId,
        resource_id: ResourceId,
        instance_id: InstanceId,
        report: SlotReport,
        reply: oneshot::Sender<AdmissionResult<()>>,
    },
    RequestSlot {
        fencing_token: ResourceManagerId,
        job_master_id: JobMasterId,
        request: SlotRequestMessage,
        reply: oneshot::Sender<AdmissionResult<()>>,
    },

    HeartbeatFromTaskManager {
        resource_id: ResourceId,
        report: SlotReport,
    },
    HeartbeatFromJobManager {
        resource_id: ResourceId,
    },
    DisconnectTaskManager {
        resource_id: ResourceId,
        cause: String,
    },
    DisconnectJobManager {
        job_id: JobId,
        cause: String,
    },
    CancelSlotRequest {
        allocation_id: AllocationId,
    },
    NotifySlotAvailable {
        instance_id: InstanceId,
        slot_id: SlotId,
        allocation_id: AllocationId,
    },
    DeregisterApplication {
        diagnostics: Option<String>,
    },

    RequestTaskManagerHeartbeat {
        resource_id: ResourceId,
    },
    RequestJobManagerHeartbeat {
        resource_id: ResourceId,
    },
    TaskManagerHeartbeatTimeout {
        resource_id: ResourceId,
    },
    JobManagerHeartbeatTimeout {
        resource_id: ResourceId,
    },
    JobLeaderLostLeadership {
        job_id: JobId,
        old_job_master_id: JobMasterId,
    },
    JobLeaderTimeout {
        job_id: JobId,
        timeout_token: uuid::Uuid,
    },

    ReleaseResource {
        instance_id: InstanceId,
        cause: String,
    },
    AllocateResource {
        profile: ResourceProfile,
        reply: oneshot::Sender<Vec<ResourceProfile>>,
    },
    NotifyAllocationFailure {
        job_id: JobId,
        allocation_id: AllocationId,
        cause: String,
    },

    GrantLeadership {
        session: ResourceManagerId,
    },
    RevokeLeadership,
}

/// A `SlotId`'s owning `ResourceId`, by convention encoded as the slot's
/// prefix up to the first `/` (`"{resource_id}/{index}"`).
fn resource_id_of_slot(slot_id: &SlotId) -> ResourceId {
    match slot_id.as_str().split_once('/') {
        Some((resource_id, _)) => ResourceId::from(resource_id),
        None => ResourceId::from(slot_id.as_str()),
    }
}

pub struct ResourceManagerActor<W> {
    own_resource_id: ResourceId,
    fencing_token: RwLock<Option<ResourceManagerId>>,
    job_managers: JobManagerTable,
    task_executors: TaskExecutorTable<W>,
    task_manager_heartbeat: RwLock<Option<HeartbeatMonitor<ResourceId>>>,
    job_manager_heartbeat: RwLock<Option<HeartbeatMonitor<ResourceId>>>,
    leader_election: Arc<dyn LeaderElection>,
    job_leader_id_service: Arc<dyn JobLeaderIdService>,
    slot_manager: Arc<dyn SlotManager>,
    provisioner: Arc<dyn WorkerProvisioner<W>>,
    fatal_error_handler: Arc<dyn FatalErrorHandler>,
    metrics: Arc<dyn MetricsCollector>,
    cluster_information: ClusterInformation,
    task_manager_heartbeat_interval: std::time::Duration,
    task_manager_heartbeat_timeout: std::time::Duration,
    job_manager_heartbeat_interval: std::time::Duration,
    job_manager_heartbeat_timeout: std::time::Duration,
    self_sender: OnceCell<EventSender<Command<W>>>,
}

impl<W: Send + Sync + 'static> ResourceManagerActor<W> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        own_resource_id: ResourceId,
        leader_election: Arc<dyn LeaderElection>,
        job_leader_id_service: Arc<dyn JobLeaderIdService>,
        slot_manager: Arc<dyn SlotManager>,
        provisioner: Arc<dyn WorkerProvisioner<W>>,
        fatal_error_handler: Arc<dyn FatalErrorHandler>,
        metrics: Arc<dyn MetricsCollector>,
        cluster_information: ClusterInformation,
        config: &crate::config::ResourceManagerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            own_resource_id,
            fencing_token: RwLock::new(None),
            job_managers: JobManagerTable::new(),
            task_executors: TaskExecutorTable::new(),
            task_manager_heartbeat: RwLock::new(None),
            job_manager_heartbeat: RwLock::new(None),
            leader_election,
            job_leader_id_service,
            slot_manager,
            provisioner,
            fatal_error_handler,
            metrics,
            cluster_information,
            task_manager_heartbeat_interval: config.task_manager_heartbeat_interval,
            task_manager_heartbeat_timeout: config.task_manager_heartbeat_timeout,
            job_manager_heartbeat_interval: config.job_manager_heartbeat_interval,
            job_manager_heartbeat_timeout: config.job_manager_heartbeat_timeout,
            self_sender: OnceCell::new(),
        })
    }

    /// Must be called exactly once, right after the owning `EventLoop` is
    /// constructed, so that heartbeat monitors and job-leader-id callbacks
    /// have a way to post commands back to this actor.
    pub fn bind_sender(&self, sender: EventSender<Command<W>>) {
        let _ = self.self_sender.set(sender);
    }

    fn sender(&self) -> EventSender<Command<W>> {
        self.self_sender
            .get()
            .cloned()
            .expect("ResourceManagerActor::bind_sender was not called")
    }

    pub fn job_manager_table(&self) -> &JobManagerTable {
        &self.job_managers
    }

    pub fn task_executor_table(&self) -> &TaskExecutorTable<W> {
        &self.task_executors
    }

    pub fn current_fencing_token(&self) -> Option<ResourceManagerId> {
        self.fencing_token.read().clone()
    }

    fn check_fenced(&self, fencing_token: &ResourceManagerId) -> Result<(), Admitted> {
        match &*self.fencing_token.read() {
            Some(current) if current == fencing_token => Ok(()),
            _ => Err(Admitted::Decline(Decline::new(
                "request rejected: resource manager is not leader under the presented fencing token",
            ))),
        }
    }

    fn escalate(&self, error: FatalError) {
        self.metrics.record_fatal_error();
        self.fatal_error_handler.on_fatal_error(error);
    }

    // ---- leadership transitions (unfenced) ----------------------------

    async fn grant_leadership(&self, session: ResourceManagerId) {
        if self.fencing_token.read().is_some() {
            self.clear_state_internal().await;
        }

        if !self.leader_election.is_leader(&session).await {
            tracing::info!(%session, "lost leadership race before confirmation, not starting services");
            return;
        }

        *self.fencing_token.write() = Some(session.clone());

        let sender = self.sender();
        let tm_tick_sender = sender.clone();
        let tm_timeout_sender = sender.clone();
        *self.task_manager_heartbeat.write() = Some(HeartbeatMonitor::start(
            self.task_manager_heartbeat_interval,
            self.task_manager_heartbeat_timeout,
            move |resource_id| {
                let sender = tm_tick_sender.clone();
                tokio::spawn(async move {
                    let _ = sender
                        .post_event(Command::RequestTaskManagerHeartbeat { resource_id })
                        .await;
                });
            },
            move |resource_id| {
                let sender = tm_timeout_sender.clone();
                tokio::spawn(async move {
                    let _ = sender
                        .post_event(Command::TaskManagerHeartbeatTimeout { resource_id })
                        .await;
                });
            },
        ));

        let jm_tick_sender = sender.clone();
        let jm_timeout_sender = sender.clone();
        *self.job_manager_heartbeat.write() = Some(HeartbeatMonitor::start(
            self.job_manager_heartbeat_interval,
            self.job_manager_heartbeat_timeout,
            move |resource_id| {
                let sender = jm_tick_sender.clone();
                tokio::spawn(async move {
                    let _ = sender
                        .post_event(Command::RequestJobManagerHeartbeat { resource_id })
                        .await;
                });
            },
            move |resource_id| {
                let sender = jm_timeout_sender.clone();
                tokio::spawn(async move {
                    let _ = sender
                        .post_event(Command::JobManagerHeartbeatTimeout { resource_id })
                        .await;
                });
            },
        ));

        let actions = Arc::new(ActorResourceActions::new(sender.clone()));
        self.slot_manager.start(session.clone(), actions).await;

        self.provisioner.prepare_leadership().await;

        if let Err(error) = self.leader_election.confirm_leadership(&session).await {
            self.escalate(error);
        }
    }

    async fn revoke_leadership(&self) {
        self.clear_state_internal().await;
        *self.fencing_token.write() = None;
        self.slot_manager.suspend().await;
        self.task_manager_heartbeat.write().take();
        self.job_manager_heartbeat.write().take();
    }

    async fn clear_state_internal(&self) {
        self.job_managers.clear();
        self.task_executors.clear();
        if let Err(error) = self.job_leader_id_service.clear() {
            self.escalate(error);
        }
        self.provisioner.clear_state().await;
    }

    // ---- registration state machine (C5) -------------------------------

    async fn register_job_manager(
        &self,
        request: RegisterJobManagerRequest,
        gateway: Arc<dyn JobManagerGateway>,
    ) -> AdmissionResult<RegisterJobManagerReply> {
        if !self.job_leader_id_service.contains_job(&request.job_id) {
            if let Err(error) = self.job_leader_id_service.add_job(request.job_id.clone()).await {
                self.escalate(error.clone());
                return Err(OperationFailure::new(format!(
                    "cannot register job {}: job-leader-id service unavailable: {error}",
                    request.job_id
                ))
                .into());
            }
        }

        let leader_id = match self.job_leader_id_service.get_leader_id(&request.job_id).await {
            Ok(leader_id) => leader_id,
            Err(error) => {
                // Fetching the leader id during registration is a genuine
                // internal fault per the error design, not a caller problem.
                let fatal = FatalError::new(format!(
                    "cannot fetch leader id for job {}: {error}",
                    request.job_id
                ));
                self.escalate(fatal);
                return Err(OperationFailure::new("job-leader-id service unavailable").into());
            }
        };

        if leader_id != request.job_master_id {
            self.metrics.record_decline("job_manager");
            return Err(Decline::new(format!(
                "registration declined: claimed job master id {} does not match current leader {leader_id}",
                request.job_master_id
            ))
            .into());
        }

        let existing = self.job_managers.get_by_job(&request.job_id);
        match existing {
            Some(existing) if existing.job_master_id == request.job_master_id => {
                // idempotent re-registration, tables unchanged
            }
            Some(existing) => {
                self.disconnect_job_manager_internal(&existing.job_id, "superseded by new registration".to_owned())
                    .await;
                self.install_job_manager(&request, gateway);
                self.metrics.record_registration("job_manager");
            }
            None => {
                self.install_job_manager(&request, gateway);
                self.metrics.record_registration("job_manager");
            }
        }

        Ok(RegisterJobManagerReply {
            fencing_token: self
                .current_fencing_token()
                .expect("fenced command admitted without a fencing token"),
            resource_manager_resource_id: self.own_resource_id.clone(),
        })
    }

    fn install_job_manager(&self, request: &RegisterJobManagerRequest, gateway: Arc<dyn JobManagerGateway>) {
        self.job_managers.insert(JobManagerRegistration {
            job_id: request.job_id.clone(),
            resource_id: request.job_manager_resource_id.clone(),
            gateway,
            job_master_id: request.job_master_id.clone(),
        });
        if let Some(monitor) = self.job_manager_heartbeat.read().as_ref() {
            monitor.monitor_target(request.job_manager_resource_id.clone());
        }
    }

    async fn register_task_executor(
        &self,
        request: RegisterTaskExecutorRequest,
        gateway: Arc<dyn TaskExecutorGateway>,
        attempt: u64,
    ) -> AdmissionResult<RegisterTaskExecutorReply> {
        if !self.task_executors.is_current_attempt(&request.resource_id, attempt) {
            self.metrics.record_decline("task_executor");
            return Err(Decline::new(format!(
                "registration for {} declined as outdated: a newer attempt is already in flight",
                request.resource_id
            ))
            .into());
        }

        if let Some(previous) = self.task_executors.get(&request.resource_id) {
            self.slot_manager
                .unregister_task_manager(previous.instance_id.clone(), "replaced by new registration".to_owned())
                .await;
            self.task_executors.remove(&request.resource_id);
            if let Some(monitor) = self.task_manager_heartbeat.read().as_ref() {
                monitor.stop_monitoring(&request.resource_id);
            }
        }

        let worker_handle = match self.provisioner.worker_started(&request.resource_id).await {
            Some(handle) => handle,
            None => {
                self.task_executors.clear_pending(&request.resource_id, attempt);
                self.metrics.record_decline("task_executor");
                return Err(Decline::new(format!(
                    "registration declined: {} is not a recognized worker",
                    request.resource_id
                ))
                .into());
            }
        };

        let instance_id = InstanceId::generate();
        self.task_executors.insert(WorkerRegistration {
            resource_id: request.resource_id.clone(),
            gateway,
            worker_handle,
            data_port: request.data_port,
            hardware: request.hardware,
            instance_id: instance_id.clone(),
        });
        if let Some(monitor) = self.task_manager_heartbeat.read().as_ref() {
            monitor.monitor_target(request.resource_id.clone());
        }
        self.task_executors.clear_pending(&request.resource_id, attempt);
        self.metrics.record_registration("task_executor");

        Ok(RegisterTaskExecutorReply {
            instance_id,
            resource_manager_resource_id: self.own_resource_id.clone(),
            cluster_information: self.cluster_information.clone(),
        })
    }

    async fn send_slot_report(
        &self,
        resource_id: ResourceId,
        instance_id: InstanceId,
        report: SlotReport,
    ) -> AdmissionResult<()> {
        let worker = match self.task_executors.get(&resource_id) {
            Some(worker) => worker,
            None => return Err(OperationFailure::new(format!("unknown task executor {resource_id}")).into()),
        };
        if worker.instance_id != instance_id {
            return Err(Decline::new(format!("stale slot report for {resource_id}")).into());
        }
        self.slot_manager
            .register_task_manager(resource_id, instance_id, report)
            .await
            .map_err(Admitted::from)
    }

    async fn disconnect_task_executor_internal(&self, resource_id: &ResourceId, cause: String) {
        if let Some(worker) = self.task_executors.remove(resource_id) {
            if let Some(monitor) = self.task_manager_heartbeat.read().as_ref() {
                monitor.stop_monitoring(resource_id);
            }
            self.slot_manager
                .unregister_task_manager(worker.instance_id.clone(), cause.clone())
                .await;
            worker.gateway.disconnect_resource_manager(&cause).await;
        }
    }

    async fn disconnect_job_manager_internal(&self, job_id: &JobId, cause: String) {
        if let Some(registration) = self.job_managers.remove_by_job(job_id) {
            if let Some(monitor) = self.job_manager_heartbeat.read().as_ref() {
                monitor.stop_monitoring(&registration.resource_id);
            }
            let token = self.current_fencing_token();
            registration
                .gateway
                .disconnect_resource_manager(token.as_ref().map(ResourceManagerId::as_str), &cause)
                .await;
        }
    }

    // ---- slot-request dispatcher (C6) ----------------------------------

    async fn request_slot(&self, job_master_id: JobMasterId, request: SlotRequestMessage) -> AdmissionResult<()> {
        let registration = match self.job_managers.get_by_job(&request.job_id) {
            Some(registration) => registration,
            None => return Err(Decline::new(format!("unregistered job manager for job {}", request.job_id)).into()),
        };
        if registration.job_master_id != job_master_id {
            return Err(Decline::new("requestSlot declined: leadership mismatch").into());
        }
        self.slot_manager
            .register_slot_request(SlotRequestSpec {
                job_id: request.job_id,
                allocation_id: request.allocation_id,
                profile: request.profile,
                preferred_resource_id: request.preferred_resource_id,
            })
            .await
            .map_err(Admitted::from)
    }

    /// Outbound half of the heartbeat protocol (C2): the monitor's own tick
    /// fires this, asking the remote target to reply via
    /// `heartbeatFromTaskManager`/`heartbeatFromJobManager`. The monitor's
    /// `last_contact` is only re-armed by that reply, never by sending the
    /// request -- a target that never replies still times out.
    async fn request_task_manager_heartbeat(&self, resource_id: ResourceId) {
        if let Some(worker) = self.task_executors.get(&resource_id) {
            worker.gateway.heartbeat_from_resource_manager(&resource_id).await;
        }
    }

    async fn request_job_manager_heartbeat(&self, resource_id: ResourceId) {
        if let Some(registration) = self.job_managers.get_by_resource(&resource_id) {
            registration.gateway.heartbeat_from_resource_manager(&resource_id).await;
        }
    }

    async fn notify_slot_available(&self, instance_id: InstanceId, slot_id: SlotId, allocation_id: AllocationId) {
        let _ = allocation_id;
        let resource_id = resource_id_of_slot(&slot_id);
        if let Some(worker) = self.task_executors.get(&resource_id) {
            if worker.instance_id == instance_id {
                self.slot_manager.free_slot(slot_id).await;
            }
        }
    }

    // ---- C4 callbacks ---------------------------------------------------

    async fn job_leader_lost_leadership(&self, job_id: JobId, old_job_master_id: JobMasterId) {
        if let Some(registration) = self.job_managers.get_by_job(&job_id) {
            if registration.job_master_id == old_job_master_id {
                self.disconnect_job_manager_internal(&job_id, "job manager lost leadership".to_owned())
                    .await;
            }
        }
    }

    async fn job_leader_timeout(&self, job_id: JobId, timeout_token: uuid::Uuid) {
        if self.job_leader_id_service.is_valid_timeout(&job_id, timeout_token) {
            self.job_leader_id_service.remove_job(&job_id);
            self.disconnect_job_manager_internal(&job_id, "job leader id idle timeout".to_owned())
                .await;
        }
    }

    // ---- resource-actions bridge (C7) ----------------------------------

    async fn release_resource(&self, instance_id: InstanceId, cause: String) {
        match self.task_executors.get_by_instance(&instance_id) {
            Some(worker) => {
                self.provisioner.stop_worker(&worker.resource_id, &worker.worker_handle).await;
                self.disconnect_task_executor_internal(&worker.resource_id, cause).await;
            }
            None => {
                self.slot_manager.unregister_task_manager(instance_id, cause).await;
            }
        }
    }

    async fn notify_allocation_failure(&self, job_id: JobId, allocation_id: AllocationId, cause: String) {
        if let Some(registration) = self.job_managers.get_by_job(&job_id) {
            registration.gateway.notify_allocation_failure(allocation_id.as_str(), &cause).await;
        }
    }
}

#[async_trait::async_trait]
impl<W: Send + Sync + 'static> EventAction<Command<W>> for ResourceManagerActor<W> {
    fn on_start(&self) {
        tracing::info!("resource manager actor loop started");
    }

    fn on_stop(&self) {
        tracing::info!("resource manager actor loop stopped");
    }

    async fn on_receive(&self, event: Command<W>) -> CoreResult<()> {
        match event {
            Command::RegisterJobManager {
                fencing_token,
                request,
                gateway,
                reply,
            } => {
                let result = match self.check_fenced(&fencing_token) {
                    Ok(()) => self.register_job_manager(request, gateway).await,
                    Err(declined) => Err(declined),
                };
                let _ = reply.send(result);
            }
            Command::RegisterTaskExecutor {
                fencing_token,
                request,
                gateway,
                attempt,
                reply,
            } => {
                let result = match self.check_fenced(&fencing_token) {
                    Ok(()) => self.register_task_executor(request, gateway, attempt).await,
                    Err(declined) => {
                        self.task_executors.clear_pending(&request.resource_id, attempt);
                        Err(declined)
                    }
                };
                let _ = reply.send(result);
            }
            Command::SendSlotReport {
                fencing_token,
                resource_id,
                instance_id,
                report,
                reply,
            } => {
                let result = match self.check_fenced(&fencing_token) {
                    Ok(()) => self.send_slot_report(resource_id, instance_id, report).await,
                    Err(declined) => Err(declined),
                };
                let _ = reply.send(result);
            }
            Command::RequestSlot {
                fencing_token,
                job_master_id,
                request,
                reply,
            } => {
                let result = match self.check_fenced(&fencing_token) {
                    Ok(()) => self.request_slot(job_master_id, request).await,
                    Err(declined) => Err(declined),
                };
                let _ = reply.send(result);
            }

            Command::HeartbeatFromTaskManager { resource_id, report } => {
                if let Some(monitor) = self.task_manager_heartbeat.read().as_ref() {
                    monitor.record_heartbeat(&resource_id);
                }
                if self.task_executors.get(&resource_id).is_some() {
                    self.slot_manager.report_slot_status(resource_id, report).await;
                }
            }
            Command::HeartbeatFromJobManager { resource_id } => {
                if let Some(monitor) = self.job_manager_heartbeat.read().as_ref() {
                    monitor.record_heartbeat(&resource_id);
                }
            }
            Command::DisconnectTaskManager { resource_id, cause } => {
                self.disconnect_task_executor_internal(&resource_id, cause).await;
            }
            Command::DisconnectJobManager { job_id, cause } => {
                self.disconnect_job_manager_internal(&job_id, cause).await;
            }
            Command::CancelSlotRequest { allocation_id } => {
                self.slot_manager.cancel_slot_request(allocation_id).await;
            }
            Command::NotifySlotAvailable {
                instance_id,
                slot_id,
                allocation_id,
            } => {
                self.notify_slot_available(instance_id, slot_id, allocation_id).await;
            }
            Command::DeregisterApplication { diagnostics } => {
                self.provisioner.internal_deregister_application(diagnostics).await;
            }

            Command::RequestTaskManagerHeartbeat { resource_id } => {
                self.request_task_manager_heartbeat(resource_id).await;
            }
            Command::RequestJobManagerHeartbeat { resource_id } => {
                self.request_job_manager_heartbeat(resource_id).await;
            }
            Command::TaskManagerHeartbeatTimeout { resource_id } => {
                self.metrics.record_heartbeat_timeout("task_executor");
                self.disconnect_task_executor_internal(&resource_id, "heartbeat timeout".to_owned())
                    .await;
            }
            Command::JobManagerHeartbeatTimeout { resource_id } => {
                if let Some(registration) = self.job_managers.get_by_resource(&resource_id) {
                    self.metrics.record_heartbeat_timeout("job_manager");
                    self.disconnect_job_manager_internal(&registration.job_id, "heartbeat timeout".to_owned())
                        .await;
                }
            }
            Command::JobLeaderLostLeadership {
                job_id,
                old_job_master_id,
            } => {
                self.job_leader_lost_leadership(job_id, old_job_master_id).await;
            }
            Command::JobLeaderTimeout { job_id, timeout_token } => {
                self.job_leader_timeout(job_id, timeout_token).await;
            }

            Command::ReleaseResource { instance_id, cause } => {
                self.release_resource(instance_id, cause).await;
            }
            Command::AllocateResource { profile, reply } => {
                let profiles = self.provisioner.start_new_worker(profile).await;
                let _ = reply.send(profiles);
            }
            Command::NotifyAllocationFailure {
                job_id,
                allocation_id,
                cause,
            } => {
                self.notify_allocation_failure(job_id, allocation_id, cause).await;
            }

            Command::GrantLeadership { session } => {
                self.grant_leadership(session).await;
            }
            Command::RevokeLeadership => {
                self.revoke_leadership().await;
            }
        }
        Ok(())
    }
}
