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

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use rm_core::event_loop::EventLoop;
use rm_core::ids::ResourceId;
use rm_core::proto::resource_manager_server::ResourceManagerServer;

use rm_server::actor::{Command, ResourceManagerActor};
use rm_server::config::ResourceManagerConfig;
use rm_server::leader::{JobLeaderIdService, LeaderElection};
use rm_server::metrics::PrometheusMetricsCollector;
use rm_server::model::ClusterInformation;
use rm_server::outcome::LoggingFatalErrorHandler;
use rm_server::provisioner::WorkerProvisioner;
use rm_server::rpc::{JobManagerGatewayConnector, ResourceManagerService, TaskExecutorGatewayConnector};
use rm_server::slot_manager::SlotManager;
use rm_server::test_support::{FakeJobLeaderIdService, FakeLeaderElection, FakeSlotManager, FakeWorkerProvisioner};

/// Worker handle type for the standalone backend: a plain counter, since
/// the fake provisioner does not launch real processes.
type StandaloneWorkerHandle = u64;

#[derive(Debug, Parser)]
#[clap(name = "rm-server", about = "Resource manager control-plane endpoint")]
struct Args {
    #[clap(long, default_value = "0.0.0.0:7070")]
    bind_address: SocketAddr,

    #[clap(long, default_value = "10000")]
    event_loop_buffer_size: usize,

    #[clap(long, default_value = "10")]
    task_manager_heartbeat_interval_secs: u64,

    #[clap(long, default_value = "30")]
    task_manager_heartbeat_timeout_secs: u64,

    #[clap(long, default_value = "10")]
    job_manager_heartbeat_interval_secs: u64,

    #[clap(long, default_value = "30")]
    job_manager_heartbeat_timeout_secs: u64,
}

/// Connector that never actually dials out: standalone mode assumes the
/// caller-supplied address is unreachable for this demo backend and hands
/// back a gateway whose calls are no-ops. A production deployment replaces
/// this with a real tonic-client-backed connector.
struct NoopJobManagerConnector;

#[async_trait::async_trait]
impl JobManagerGatewayConnector for NoopJobManagerConnector {
    async fn connect(&self, _address: &str) -> Arc<dyn rm_server::registration::job_manager::JobManagerGateway> {
        Arc::new(rm_server::test_support::FakeJobManagerGateway::default())
    }
}

struct NoopTaskExecutorConnector;

#[async_trait::async_trait]
impl TaskExecutorGatewayConnector for NoopTaskExecutorConnector {
    async fn connect(
        &self,
        _address: &str,
        _resource_id: &ResourceId,
    ) -> Arc<dyn rm_server::registration::task_executor::TaskExecutorGateway> {
        Arc::new(rm_server::test_support::FakeTaskExecutorGateway::default())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = ResourceManagerConfig::default()
        .with_event_loop_buffer_size(args.event_loop_buffer_size)
        .with_task_manager_heartbeat(
            Duration::from_secs(args.task_manager_heartbeat_interval_secs),
            Duration::from_secs(args.task_manager_heartbeat_timeout_secs),
        )
        .with_job_manager_heartbeat(
            Duration::from_secs(args.job_manager_heartbeat_interval_secs),
            Duration::from_secs(args.job_manager_heartbeat_timeout_secs),
        );

    let own_resource_id = ResourceId::from(uuid::Uuid::new_v4().to_string());
    tracing::info!(%own_resource_id, bind_address = %args.bind_address, "starting resource manager");

    // Standalone backend: in-memory fakes for every external collaborator.
    // A clustered deployment swaps these for real election/job-leader-id
    // backends and a framework-specific provisioner.
    let leader_election = Arc::new(FakeLeaderElection::default());
    let job_leader_id_service: Arc<dyn JobLeaderIdService> = Arc::new(FakeJobLeaderIdService::default());
    let slot_manager: Arc<dyn SlotManager> = Arc::new(FakeSlotManager::default());
    let provisioner: Arc<dyn WorkerProvisioner<StandaloneWorkerHandle>> = Arc::new(FakeWorkerProvisioner::default());
    provisioner.initialize().await.map_err(|e| anyhow::anyhow!(e.0))?;

    let metrics = Arc::new(PrometheusMetricsCollector::new(prometheus::default_registry())?);

    let actor = ResourceManagerActor::<StandaloneWorkerHandle>::new(
        own_resource_id,
        leader_election.clone() as Arc<dyn LeaderElection>,
        job_leader_id_service,
        slot_manager.clone(),
        provisioner,
        Arc::new(LoggingFatalErrorHandler),
        metrics,
        ClusterInformation::default(),
        &config,
    );

    let mut event_loop = EventLoop::new("resource-manager".to_owned(), config.event_loop_buffer_size, actor.clone());
    let sender = event_loop.get_sender()?;
    actor.bind_sender(sender.clone());
    event_loop.start()?;

    let session = rm_core::ids::ResourceManagerId::from(uuid::Uuid::new_v4().to_string());
    leader_election.grant(session.clone());
    sender.post_event(Command::GrantLeadership { session }).await?;

    let service = ResourceManagerService::new(
        actor,
        sender,
        slot_manager,
        Arc::new(NoopJobManagerConnector),
        Arc::new(NoopTaskExecutorConnector),
    );

    tonic::transport::Server::builder()
        .add_service(ResourceManagerServer::new(service))
        .serve(args.bind_address)
        .await?;

    Ok(())
}
