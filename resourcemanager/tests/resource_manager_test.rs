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

//! End-to-end scenarios (happy-path slot request, leader mismatch, stale
//! registration, heartbeat timeout, leadership revocation, allocation
//! failure callback), exercised directly against the actor's command
//! channel the way `scheduler_server/mod.rs`'s own `#[tokio::test]` suite
//! drives `SchedulerServer` -- no real transport or election backend, only
//! the in-memory fakes from `test_support`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use rm_core::event_loop::{EventLoop, EventSender};
use rm_core::ids::{AllocationId, InstanceId, JobId, JobMasterId, ResourceId, ResourceManagerId, SlotId};

use rm_server::actor::{Command, ResourceManagerActor};
use rm_server::config::ResourceManagerConfig;
use rm_server::leader::{JobLeaderIdService, LeaderElection};
use rm_server::metrics::NoopMetricsCollector;
use rm_server::model::{
    ClusterInformation, RegisterJobManagerReply, RegisterJobManagerRequest, RegisterTaskExecutorReply,
    RegisterTaskExecutorRequest, SlotRequestMessage,
};
use rm_server::outcome::{Admitted, AdmissionResult, LoggingFatalErrorHandler};
use rm_server::registration::task_executor::HardwareDescription;
use rm_server::slot_manager::{ResourceProfile, SlotManager};
use rm_server::test_support::{
    FakeJobLeaderIdService, FakeJobManagerGateway, FakeLeaderElection, FakeSlotManager, FakeTaskExecutorGateway,
    FakeWorkerProvisioner, GatewayCall,
};

type TestActor = ResourceManagerActor<u64>;

/// Yields enough times for a chain of tick -> spawned task -> posted command
/// -> actor-loop turn to actually run under a single-threaded paused-clock
/// runtime, where `tokio::time::advance` only wakes timers without polling
/// the tasks they wake.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

struct Harness {
    actor: Arc<TestActor>,
    sender: EventSender<Command<u64>>,
    leader_election: Arc<FakeLeaderElection>,
    job_leader_id_service: Arc<FakeJobLeaderIdService>,
    slot_manager: Arc<FakeSlotManager>,
    #[allow(dead_code)]
    event_loop: EventLoop<Command<u64>>,
}

impl Harness {
    fn new(config: ResourceManagerConfig) -> Self {
        let leader_election = Arc::new(FakeLeaderElection::default());
        let job_leader_id_service = Arc::new(FakeJobLeaderIdService::default());
        let slot_manager = Arc::new(FakeSlotManager::default());
        let provisioner = Arc::new(FakeWorkerProvisioner::default());

        let actor = TestActor::new(
            ResourceId::from("rm-0"),
            leader_election.clone() as Arc<dyn LeaderElection>,
            job_leader_id_service.clone() as Arc<dyn JobLeaderIdService>,
            slot_manager.clone() as Arc<dyn SlotManager>,
            provisioner,
            Arc::new(LoggingFatalErrorHandler),
            Arc::new(NoopMetricsCollector),
            ClusterInformation::default(),
            &config,
        );

        let mut event_loop = EventLoop::new("test-rm".to_owned(), 1024, actor.clone());
        let sender = event_loop.get_sender().unwrap();
        actor.bind_sender(sender.clone());
        event_loop.start().unwrap();

        Self {
            actor,
            sender,
            leader_election,
            job_leader_id_service,
            slot_manager,
            event_loop,
        }
    }

    async fn grant_leadership(&self, session: ResourceManagerId) {
        self.leader_election.grant(session.clone());
        self.sender.post_event(Command::GrantLeadership { session }).await.unwrap();
        settle().await;
    }

    async fn register_job_manager_with_gateway(
        &self,
        fencing_token: ResourceManagerId,
        job_id: &str,
        job_master_id: &str,
        resource_id: &str,
        gateway: Arc<FakeJobManagerGateway>,
    ) -> AdmissionResult<RegisterJobManagerReply> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .post_event(Command::RegisterJobManager {
                fencing_token,
                request: RegisterJobManagerRequest {
                    job_master_id: JobMasterId::from(job_master_id),
                    job_manager_resource_id: ResourceId::from(resource_id),
                    address: format!("{resource_id}:9999"),
                    job_id: JobId::from(job_id),
                },
                gateway,
                reply: tx,
            })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    async fn register_job_manager(
        &self,
        fencing_token: ResourceManagerId,
        job_id: &str,
        job_master_id: &str,
        resource_id: &str,
    ) -> AdmissionResult<RegisterJobManagerReply> {
        self.register_job_manager_with_gateway(
            fencing_token,
            job_id,
            job_master_id,
            resource_id,
            Arc::new(FakeJobManagerGateway::default()),
        )
        .await
    }

    async fn register_task_executor_with_gateway(
        &self,
        fencing_token: ResourceManagerId,
        resource_id: &str,
        gateway: Arc<FakeTaskExecutorGateway>,
    ) -> AdmissionResult<RegisterTaskExecutorReply> {
        let rid = ResourceId::from(resource_id);
        let attempt = self.actor.task_executor_table().begin_pending(rid.clone());
        let (tx, rx) = oneshot::channel();
        self.sender
            .post_event(Command::RegisterTaskExecutor {
                fencing_token,
                request: RegisterTaskExecutorRequest {
                    address: format!("{resource_id}:6000"),
                    resource_id: rid,
                    data_port: 6000,
                    hardware: HardwareDescription {
                        cpu_cores: 4,
                        memory_mb: 8192,
                    },
                },
                gateway,
                attempt,
                reply: tx,
            })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    async fn register_task_executor(
        &self,
        fencing_token: ResourceManagerId,
        resource_id: &str,
    ) -> AdmissionResult<RegisterTaskExecutorReply> {
        self.register_task_executor_with_gateway(fencing_token, resource_id, Arc::new(FakeTaskExecutorGateway::default()))
            .await
    }

    async fn send_slot_report(
        &self,
        fencing_token: ResourceManagerId,
        resource_id: &str,
        instance_id: InstanceId,
    ) -> AdmissionResult<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .post_event(Command::SendSlotReport {
                fencing_token,
                resource_id: ResourceId::from(resource_id),
                instance_id,
                report: rm_server::slot_manager::SlotReport::default(),
                reply: tx,
            })
            .await
            .unwrap();
        rx.await.unwrap()
    }
}

fn setup_job(harness: &Harness, job_id: &str, job_master_id: &str) {
    harness
        .job_leader_id_service
        .set_leader(JobId::from(job_id), JobMasterId::from(job_master_id));
}

#[tokio::test]
async fn happy_path_slot_request() {
    let harness = Harness::new(ResourceManagerConfig::default());
    let session = ResourceManagerId::from("rm-session-1");
    harness.grant_leadership(session.clone()).await;

    let te_reply = harness
        .register_task_executor(session.clone(), "r1")
        .await
        .expect("task executor registration should succeed");
    harness
        .send_slot_report(session.clone(), "r1", te_reply.instance_id)
        .await
        .expect("slot report should be accepted");

    setup_job(&harness, "job-1", "jid1");
    harness
        .register_job_manager(session.clone(), "job-1", "jid1", "jm-1")
        .await
        .expect("job manager registration should succeed");

    let (tx, rx) = oneshot::channel();
    harness
        .sender
        .post_event(Command::RequestSlot {
            fencing_token: session,
            job_master_id: JobMasterId::from("jid1"),
            request: SlotRequestMessage {
                job_id: JobId::from("job-1"),
                allocation_id: AllocationId::from("a1"),
                profile: ResourceProfile {
                    cpu_cores: 1,
                    memory_mb: 1024,
                },
                preferred_resource_id: None,
            },
            reply: tx,
        })
        .await
        .unwrap();
    rx.await.unwrap().expect("requestSlot should be acknowledged");

    assert_eq!(harness.slot_manager.requests().len(), 1);
}

#[tokio::test]
async fn leader_mismatch_is_declined_and_slot_manager_untouched() {
    let harness = Harness::new(ResourceManagerConfig::default());
    let session = ResourceManagerId::from("rm-session-1");
    harness.grant_leadership(session.clone()).await;

    setup_job(&harness, "job-1", "jid1");
    harness
        .register_job_manager(session.clone(), "job-1", "jid1", "jm-1")
        .await
        .expect("registration should succeed");

    let (tx, rx) = oneshot::channel();
    harness
        .sender
        .post_event(Command::RequestSlot {
            fencing_token: session,
            job_master_id: JobMasterId::from("jid2"),
            request: SlotRequestMessage {
                job_id: JobId::from("job-1"),
                allocation_id: AllocationId::from("a1"),
                profile: ResourceProfile::default(),
                preferred_resource_id: None,
            },
            reply: tx,
        })
        .await
        .unwrap();

    let result = rx.await.unwrap();
    assert!(matches!(result, Err(Admitted::Decline(_))));
    assert!(harness.slot_manager.requests().is_empty());
}

#[tokio::test]
async fn stale_fencing_token_is_declined() {
    let harness = Harness::new(ResourceManagerConfig::default());
    let stale_session = ResourceManagerId::from("rm-session-stale");
    harness.grant_leadership(stale_session.clone()).await;

    // a fresh grant (e.g. re-election) supersedes the old token
    let current_session = ResourceManagerId::from("rm-session-current");
    harness.grant_leadership(current_session).await;

    let result = harness
        .register_job_manager(stale_session, "job-1", "jid1", "jm-1")
        .await;
    assert!(matches!(result, Err(Admitted::Decline(_))));
}

#[tokio::test]
async fn stale_task_executor_registration_is_superseded() {
    let harness = Harness::new(ResourceManagerConfig::default());
    let session = ResourceManagerId::from("rm-session-1");
    harness.grant_leadership(session.clone()).await;

    let rid = ResourceId::from("r1");
    let first_attempt = harness.actor.task_executor_table().begin_pending(rid.clone());
    // A second, newer attempt supersedes the first before it completes.
    let second_attempt = harness.actor.task_executor_table().begin_pending(rid.clone());
    assert_ne!(first_attempt, second_attempt);

    let (tx1, rx1) = oneshot::channel();
    harness
        .sender
        .post_event(Command::RegisterTaskExecutor {
            fencing_token: session.clone(),
            request: RegisterTaskExecutorRequest {
                address: "r1:6000".to_owned(),
                resource_id: rid.clone(),
                data_port: 6000,
                hardware: HardwareDescription {
                    cpu_cores: 1,
                    memory_mb: 1024,
                },
            },
            gateway: Arc::new(FakeTaskExecutorGateway::default()),
            attempt: first_attempt,
            reply: tx1,
        })
        .await
        .unwrap();
    assert!(matches!(rx1.await.unwrap(), Err(Admitted::Decline(_))));

    let (tx2, rx2) = oneshot::channel();
    harness
        .sender
        .post_event(Command::RegisterTaskExecutor {
            fencing_token: session,
            request: RegisterTaskExecutorRequest {
                address: "r1:6000".to_owned(),
                resource_id: rid,
                data_port: 6000,
                hardware: HardwareDescription {
                    cpu_cores: 1,
                    memory_mb: 1024,
                },
            },
            gateway: Arc::new(FakeTaskExecutorGateway::default()),
            attempt: second_attempt,
            reply: tx2,
        })
        .await
        .unwrap();
    assert!(rx2.await.unwrap().is_ok());
}

#[tokio::test(start_paused = true)]
async fn heartbeat_timeout_disconnects_task_executor() {
    let config = ResourceManagerConfig::default()
        .with_task_manager_heartbeat(Duration::from_millis(10), Duration::from_millis(30));
    let harness = Harness::new(config);
    let session = ResourceManagerId::from("rm-session-1");
    harness.grant_leadership(session.clone()).await;

    let gateway = Arc::new(FakeTaskExecutorGateway::default());
    let reply = harness
        .register_task_executor_with_gateway(session.clone(), "r1", gateway.clone())
        .await
        .expect("registration should succeed");
    harness
        .send_slot_report(session, "r1", reply.instance_id.clone())
        .await
        .expect("slot report should be accepted");
    assert!(harness.slot_manager.has_task_manager(&reply.instance_id));

    tokio::time::advance(Duration::from_millis(100)).await;
    settle().await;

    assert!(harness.actor.task_executor_table().get(&ResourceId::from("r1")).is_none());
    assert!(!harness.slot_manager.has_task_manager(&reply.instance_id));
    assert!(gateway
        .calls()
        .iter()
        .any(|c| matches!(c, GatewayCall::Disconnected { .. })));
}

#[tokio::test(start_paused = true)]
async fn heartbeat_before_timeout_keeps_task_executor_registered() {
    let config = ResourceManagerConfig::default()
        .with_task_manager_heartbeat(Duration::from_millis(10), Duration::from_millis(30));
    let harness = Harness::new(config);
    let session = ResourceManagerId::from("rm-session-1");
    harness.grant_leadership(session.clone()).await;

    harness.register_task_executor(session, "r1").await.unwrap();

    tokio::time::advance(Duration::from_millis(15)).await;
    settle().await;
    harness
        .sender
        .post_event(Command::HeartbeatFromTaskManager {
            resource_id: ResourceId::from("r1"),
            report: rm_server::slot_manager::SlotReport::default(),
        })
        .await
        .unwrap();
    settle().await;

    tokio::time::advance(Duration::from_millis(15)).await;
    settle().await;

    assert!(harness.actor.task_executor_table().get(&ResourceId::from("r1")).is_some());
}

#[tokio::test]
async fn leadership_revocation_empties_tables_and_suspends_slot_manager() {
    let harness = Harness::new(ResourceManagerConfig::default());
    let session = ResourceManagerId::from("rm-session-1");
    harness.grant_leadership(session.clone()).await;

    setup_job(&harness, "job-1", "jid1");
    harness
        .register_job_manager(session.clone(), "job-1", "jid1", "jm-1")
        .await
        .unwrap();
    harness.register_task_executor(session.clone(), "r1").await.unwrap();

    assert!(!harness.actor.job_manager_table().is_empty());
    assert!(!harness.actor.task_executor_table().is_empty());

    harness.sender.post_event(Command::RevokeLeadership).await.unwrap();
    settle().await;

    assert!(harness.actor.job_manager_table().is_empty());
    assert!(harness.actor.task_executor_table().is_empty());
    assert!(harness.slot_manager.is_suspended());
    assert!(harness.actor.current_fencing_token().is_none());

    // subsequent fenced RPCs under the old token are declined
    let result = harness.register_job_manager(session, "job-2", "jid2", "jm-2").await;
    assert!(matches!(result, Err(Admitted::Decline(_))));
}

#[tokio::test]
async fn allocation_failure_reaches_registered_job_manager_and_is_dropped_after_disconnect() {
    let harness = Harness::new(ResourceManagerConfig::default());
    let session = ResourceManagerId::from("rm-session-1");
    harness.grant_leadership(session.clone()).await;

    setup_job(&harness, "job-1", "jid1");
    let gateway = Arc::new(FakeJobManagerGateway::default());
    harness
        .register_job_manager_with_gateway(session, "job-1", "jid1", "jm-1", gateway.clone())
        .await
        .unwrap();

    harness
        .sender
        .post_event(Command::NotifyAllocationFailure {
            job_id: JobId::from("job-1"),
            allocation_id: AllocationId::from("a1"),
            cause: "no matching slot".to_owned(),
        })
        .await
        .unwrap();
    settle().await;

    assert!(gateway
        .calls()
        .iter()
        .any(|c| matches!(c, GatewayCall::AllocationFailureNotified { .. })));

    harness
        .sender
        .post_event(Command::DisconnectJobManager {
            job_id: JobId::from("job-1"),
            cause: "done".to_owned(),
        })
        .await
        .unwrap();
    settle().await;
    assert!(harness.actor.job_manager_table().is_empty());

    // Silently dropped: no registered job manager left, no panic/error.
    harness
        .sender
        .post_event(Command::NotifyAllocationFailure {
            job_id: JobId::from("job-1"),
            allocation_id: AllocationId::from("a2"),
            cause: "still no slot".to_owned(),
        })
        .await
        .unwrap();
    settle().await;
}

#[tokio::test]
async fn reregistering_same_job_manager_is_idempotent() {
    let harness = Harness::new(ResourceManagerConfig::default());
    let session = ResourceManagerId::from("rm-session-1");
    harness.grant_leadership(session.clone()).await;

    setup_job(&harness, "job-1", "jid1");
    harness
        .register_job_manager(session.clone(), "job-1", "jid1", "jm-1")
        .await
        .unwrap();
    let before = harness.actor.job_manager_table().get_by_job(&JobId::from("job-1")).unwrap();

    harness
        .register_job_manager(session, "job-1", "jid1", "jm-1")
        .await
        .unwrap();
    let after = harness.actor.job_manager_table().get_by_job(&JobId::from("job-1")).unwrap();

    assert!(Arc::ptr_eq(&before, &after));
}

#[tokio::test]
async fn disconnecting_unknown_task_manager_twice_is_a_no_op() {
    let harness = Harness::new(ResourceManagerConfig::default());
    let session = ResourceManagerId::from("rm-session-1");
    harness.grant_leadership(session).await;

    for _ in 0..2 {
        harness
            .sender
            .post_event(Command::DisconnectTaskManager {
                resource_id: ResourceId::from("unknown"),
                cause: "cleanup".to_owned(),
            })
            .await
            .unwrap();
        settle().await;
    }

    assert!(harness.actor.task_executor_table().is_empty());
}

#[tokio::test]
async fn notify_slot_available_ignores_stale_instance_id() {
    let harness = Harness::new(ResourceManagerConfig::default());
    let session = ResourceManagerId::from("rm-session-1");
    harness.grant_leadership(session.clone()).await;

    harness.register_task_executor(session, "r1").await.unwrap();

    harness
        .sender
        .post_event(Command::NotifySlotAvailable {
            instance_id: InstanceId::generate(),
            slot_id: SlotId::from("r1/0"),
            allocation_id: AllocationId::from("a1"),
        })
        .await
        .unwrap();
    settle().await;

    assert!(harness.slot_manager.freed_slots().is_empty());
}
