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

use std::sync::Arc;

use tokio::sync::oneshot;
use tonic::{Request, Response, Status};

use rm_core::event_loop::EventSender;
use rm_core::ids::{AllocationId, InstanceId, JobId, JobMasterId, ResourceId, SlotId};
use rm_core::proto::resource_manager_server::ResourceManager;
use rm_core::proto::HardwareDescription as WireHardwareDescription;
use rm_core::proto::*;

use crate::actor::{Command, ResourceManagerActor};
use crate::introspection::{FileType as CoreFileType, Introspection};
use crate::model::{
    RegisterJobManagerRequest as CoreRegisterJobManagerRequest, RegisterTaskExecutorRequest as CoreRegisterTaskExecutorRequest,
    SlotRequestMessage,
};
use crate::outcome::Admitted;
use crate::registration::task_executor::HardwareDescription;
use crate::slot_manager::{ResourceProfile, SlotManager, SlotReport as CoreSlotReport, SlotStatus};

use super::{JobManagerGatewayConnector, TaskExecutorGatewayConnector};

/// Wires the generated tonic service trait to the actor's command channel.
/// Fencing is checked here, at RPC entry (invariant I5): while the resource
/// manager holds no fencing token, mutating RPCs are declined without ever
/// reaching the actor loop.
pub struct ResourceManagerService<W> {
    actor: Arc<ResourceManagerActor<W>>,
    sender: EventSender<Command<W>>,
    introspection: Introspection<W>,
    jm_connector: Arc<dyn JobManagerGatewayConnector>,
    te_connector: Arc<dyn TaskExecutorGatewayConnector>,
}

impl<W: Send + Sync + 'static> ResourceManagerService<W> {
    pub fn new(
        actor: Arc<ResourceManagerActor<W>>,
        sender: EventSender<Command<W>>,
        slot_manager: Arc<dyn SlotManager>,
        jm_connector: Arc<dyn JobManagerGatewayConnector>,
        te_connector: Arc<dyn TaskExecutorGatewayConnector>,
    ) -> Self {
        let introspection = Introspection::new(actor.clone(), slot_manager);
        Self {
            actor,
            sender,
            introspection,
            jm_connector,
            te_connector,
        }
    }

    fn require_leadership(&self) -> Result<rm_core::ids::ResourceManagerId, Status> {
        self.actor
            .current_fencing_token()
            .ok_or_else(|| Status::failed_precondition("resource manager is not currently leader"))
    }
}

fn admitted_to_status(error: Admitted) -> String {
    error.to_string()
}

fn slot_report_from_wire(report: SlotReport) -> CoreSlotReport {
    CoreSlotReport(
        report
            .slots
            .into_iter()
            .map(|s| SlotStatus {
                slot_id: SlotId::from(s.slot_id),
                resource_id: ResourceId::from(s.resource_id),
                allocation_id: s.allocation_id.map(AllocationId::from),
                profile: s
                    .profile
                    .map(|p| ResourceProfile {
                        cpu_cores: p.cpu_cores,
                        memory_mb: p.memory_mb,
                    })
                    .unwrap_or_default(),
            })
            .collect(),
    )
}

#[tonic::async_trait]
impl<W: Send + Sync + 'static> ResourceManager for ResourceManagerService<W> {
    async fn register_job_manager(
        &self,
        request: Request<RegisterJobManagerRequest>,
    ) -> Result<Response<RegisterJobManagerReply>, Status> {
        let fencing_token = match self.require_leadership() {
            Ok(token) => token,
            Err(_) => {
                return Ok(Response::new(RegisterJobManagerReply {
                    success: false,
                    fencing_token: String::new(),
                    resource_manager_resource_id: String::new(),
                    decline_reason: "resource manager is not currently leader".to_owned(),
                }))
            }
        };
        let req = request.into_inner();
        let gateway = self.jm_connector.connect(&req.address).await;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .post_event(Command::RegisterJobManager {
                fencing_token,
                request: CoreRegisterJobManagerRequest {
                    job_master_id: JobMasterId::from(req.job_master_id),
                    job_manager_resource_id: ResourceId::from(req.resource_id),
                    address: req.address,
                    job_id: JobId::from(req.job_id),
                },
                gateway,
                reply: reply_tx,
            })
            .await
            .map_err(|e| Status::unavailable(e.to_string()))?;

        match reply_rx.await.map_err(|_| Status::internal("actor loop dropped the reply"))? {
            Ok(reply) => Ok(Response::new(RegisterJobManagerReply {
                success: true,
                fencing_token: reply.fencing_token.to_string(),
                resource_manager_resource_id: reply.resource_manager_resource_id.to_string(),
                decline_reason: String::new(),
            })),
            Err(error) => Ok(Response::new(RegisterJobManagerReply {
                success: false,
                fencing_token: String::new(),
                resource_manager_resource_id: String::new(),
                decline_reason: admitted_to_status(error),
            })),
        }
    }

    async fn register_task_executor(
        &self,
        request: Request<RegisterTaskExecutorRequest>,
    ) -> Result<Response<RegisterTaskExecutorReply>, Status> {
        let fencing_token = match self.require_leadership() {
            Ok(token) => token,
            Err(_) => {
                return Ok(Response::new(RegisterTaskExecutorReply {
                    success: false,
                    instance_id: String::new(),
                    resource_manager_resource_id: String::new(),
                    cluster_information: None,
                    decline_reason: "resource manager is not currently leader".to_owned(),
                }))
            }
        };
        let req = request.into_inner();
        let resource_id = ResourceId::from(req.resource_id);

        // Begin the pending-attempt sequence number before connecting, so a
        // concurrent newer registration for the same ResourceID can
        // supersede this one while the connect is still in flight.
        let attempt = self.actor.task_executor_table().begin_pending(resource_id.clone());
        let gateway = self.te_connector.connect(&req.address, &resource_id).await;

        let hardware = req
            .hardware
            .map(|h| HardwareDescription {
                cpu_cores: h.cpu_cores,
                memory_mb: h.memory_mb,
            })
            .unwrap_or(HardwareDescription { cpu_cores: 0, memory_mb: 0 });

        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .post_event(Command::RegisterTaskExecutor {
                fencing_token,
                request: CoreRegisterTaskExecutorRequest {
                    address: req.address,
                    resource_id,
                    data_port: req.data_port,
                    hardware,
                },
                gateway,
                attempt,
                reply: reply_tx,
            })
            .await
            .map_err(|e| Status::unavailable(e.to_string()))?;

        match reply_rx.await.map_err(|_| Status::internal("actor loop dropped the reply"))? {
            Ok(reply) => Ok(Response::new(RegisterTaskExecutorReply {
                success: true,
                instance_id: reply.instance_id.to_string(),
                resource_manager_resource_id: reply.resource_manager_resource_id.to_string(),
                cluster_information: Some(ClusterInformation {
                    blob_server_address: reply.cluster_information.blob_server_address.unwrap_or_default(),
                }),
                decline_reason: String::new(),
            })),
            Err(error) => Ok(Response::new(RegisterTaskExecutorReply {
                success: false,
                instance_id: String::new(),
                resource_manager_resource_id: String::new(),
                cluster_information: None,
                decline_reason: admitted_to_status(error),
            })),
        }
    }

    async fn send_slot_report(
        &self,
        request: Request<SendSlotReportRequest>,
    ) -> Result<Response<SendSlotReportReply>, Status> {
        let fencing_token = match self.require_leadership() {
            Ok(token) => token,
            Err(_) => {
                return Ok(Response::new(SendSlotReportReply {
                    success: false,
                    decline_reason: "resource manager is not currently leader".to_owned(),
                }))
            }
        };
        let req = request.into_inner();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .post_event(Command::SendSlotReport {
                fencing_token,
                resource_id: ResourceId::from(req.resource_id),
                instance_id: InstanceId::from(
                    uuid::Uuid::parse_str(&req.instance_id).map_err(|e| Status::invalid_argument(e.to_string()))?,
                ),
                report: slot_report_from_wire(req.report.unwrap_or_default()),
                reply: reply_tx,
            })
            .await
            .map_err(|e| Status::unavailable(e.to_string()))?;

        match reply_rx.await.map_err(|_| Status::internal("actor loop dropped the reply"))? {
            Ok(()) => Ok(Response::new(SendSlotReportReply {
                success: true,
                decline_reason: String::new(),
            })),
            Err(error) => Ok(Response::new(SendSlotReportReply {
                success: false,
                decline_reason: admitted_to_status(error),
            })),
        }
    }

    async fn heartbeat_from_task_manager(
        &self,
        request: Request<HeartbeatFromTaskManagerRequest>,
    ) -> Result<Response<SendSlotReportReply>, Status> {
        let req = request.into_inner();
        self.sender
            .post_event(Command::HeartbeatFromTaskManager {
                resource_id: ResourceId::from(req.resource_id),
                report: slot_report_from_wire(req.report.unwrap_or_default()),
            })
            .await
            .map_err(|e| Status::unavailable(e.to_string()))?;
        Ok(Response::new(SendSlotReportReply {
            success: true,
            decline_reason: String::new(),
        }))
    }

    async fn heartbeat_from_job_manager(
        &self,
        request: Request<HeartbeatFromJobManagerRequest>,
    ) -> Result<Response<SendSlotReportReply>, Status> {
        let req = request.into_inner();
        self.sender
            .post_event(Command::HeartbeatFromJobManager {
                resource_id: ResourceId::from(req.resource_id),
            })
            .await
            .map_err(|e| Status::unavailable(e.to_string()))?;
        Ok(Response::new(SendSlotReportReply {
            success: true,
            decline_reason: String::new(),
        }))
    }

    async fn disconnect_task_manager(
        &self,
        request: Request<DisconnectTaskManagerRequest>,
    ) -> Result<Response<SendSlotReportReply>, Status> {
        let req = request.into_inner();
        self.sender
            .post_event(Command::DisconnectTaskManager {
                resource_id: ResourceId::from(req.resource_id),
                cause: req.cause,
            })
            .await
            .map_err(|e| Status::unavailable(e.to_string()))?;
        Ok(Response::new(SendSlotReportReply {
            success: true,
            decline_reason: String::new(),
        }))
    }

    async fn disconnect_job_manager(
        &self,
        request: Request<DisconnectJobManagerRequest>,
    ) -> Result<Response<SendSlotReportReply>, Status> {
        let req = request.into_inner();
        self.sender
            .post_event(Command::DisconnectJobManager {
                job_id: JobId::from(req.job_id),
                cause: req.cause,
            })
            .await
            .map_err(|e| Status::unavailable(e.to_string()))?;
        Ok(Response::new(SendSlotReportReply {
            success: true,
            decline_reason: String::new(),
        }))
    }

    async fn request_slot(&self, request: Request<RequestSlotRequest>) -> Result<Response<RequestSlotReply>, Status> {
        let fencing_token = match self.require_leadership() {
            Ok(token) => token,
            Err(_) => {
                return Ok(Response::new(RequestSlotReply {
                    success: false,
                    decline_reason: "resource manager is not currently leader".to_owned(),
                }))
            }
        };
        let req = request.into_inner();
        let slot_request = req.request.unwrap_or_default();
        let profile = slot_request
            .profile
            .map(|p| ResourceProfile {
                cpu_cores: p.cpu_cores,
                memory_mb: p.memory_mb,
            })
            .unwrap_or_default();

        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .post_event(Command::RequestSlot {
                fencing_token,
                job_master_id: JobMasterId::from(req.job_master_id),
                request: SlotRequestMessage {
                    job_id: JobId::from(slot_request.job_id),
                    allocation_id: AllocationId::from(slot_request.allocation_id),
                    profile,
                    preferred_resource_id: if slot_request.preferred_resource_id.is_empty() {
                        None
                    } else {
                        Some(ResourceId::from(slot_request.preferred_resource_id))
                    },
                },
                reply: reply_tx,
            })
            .await
            .map_err(|e| Status::unavailable(e.to_string()))?;

        match reply_rx.await.map_err(|_| Status::internal("actor loop dropped the reply"))? {
            Ok(()) => Ok(Response::new(RequestSlotReply {
                success: true,
                decline_reason: String::new(),
            })),
            Err(error) => Ok(Response::new(RequestSlotReply {
                success: false,
                decline_reason: admitted_to_status(error),
            })),
        }
    }

    async fn cancel_slot_request(
        &self,
        request: Request<CancelSlotRequestRequest>,
    ) -> Result<Response<SendSlotReportReply>, Status> {
        let req = request.into_inner();
        self.sender
            .post_event(Command::CancelSlotRequest {
                allocation_id: AllocationId::from(req.allocation_id),
            })
            .await
            .map_err(|e| Status::unavailable(e.to_string()))?;
        Ok(Response::new(SendSlotReportReply {
            success: true,
            decline_reason: String::new(),
        }))
    }

    async fn notify_slot_available(
        &self,
        request: Request<NotifySlotAvailableRequest>,
    ) -> Result<Response<SendSlotReportReply>, Status> {
        let req = request.into_inner();
        self.sender
            .post_event(Command::NotifySlotAvailable {
                instance_id: InstanceId::from(
                    uuid::Uuid::parse_str(&req.instance_id).map_err(|e| Status::invalid_argument(e.to_string()))?,
                ),
                slot_id: SlotId::from(req.slot_id),
                allocation_id: AllocationId::from(req.allocation_id),
            })
            .await
            .map_err(|e| Status::unavailable(e.to_string()))?;
        Ok(Response::new(SendSlotReportReply {
            success: true,
            decline_reason: String::new(),
        }))
    }

    async fn deregister_application(
        &self,
        request: Request<DeregisterApplicationRequest>,
    ) -> Result<Response<SendSlotReportReply>, Status> {
        let req = request.into_inner();
        self.sender
            .post_event(Command::DeregisterApplication {
                diagnostics: if req.diagnostics.is_empty() { None } else { Some(req.diagnostics) },
            })
            .await
            .map_err(|e| Status::unavailable(e.to_string()))?;
        Ok(Response::new(SendSlotReportReply {
            success: true,
            decline_reason: String::new(),
        }))
    }

    async fn get_number_of_registered_task_managers(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<GetNumberOfRegisteredTaskManagersReply>, Status> {
        Ok(Response::new(GetNumberOfRegisteredTaskManagersReply {
            count: self.introspection.number_of_registered_task_managers() as u32,
        }))
    }

    async fn request_task_manager_info(
        &self,
        request: Request<RequestTaskManagerInfoRequest>,
    ) -> Result<Response<TaskManagerInfoReply>, Status> {
        let req = request.into_inner();
        let infos = if req.resource_id.is_empty() {
            self.introspection.all_task_manager_info()
        } else {
            self.introspection
                .task_manager_info(&ResourceId::from(req.resource_id))
                .into_iter()
                .collect()
        };
        Ok(Response::new(TaskManagerInfoReply {
            task_managers: infos
                .into_iter()
                .map(|info| TaskManagerInfo {
                    resource_id: info.resource_id.to_string(),
                    data_port: info.data_port,
                    hardware: Some(WireHardwareDescription {
                        cpu_cores: info.hardware.cpu_cores,
                        memory_mb: info.hardware.memory_mb,
                    }),
                })
                .collect(),
        }))
    }

    async fn request_resource_overview(&self, _request: Request<Empty>) -> Result<Response<ResourceOverview>, Status> {
        let overview = self.introspection.resource_overview();
        Ok(Response::new(ResourceOverview {
            num_task_managers: overview.num_task_managers as u32,
            num_slots_total: overview.num_slots_total as u32,
            num_slots_free: overview.num_slots_free as u32,
        }))
    }

    async fn request_task_manager_metric_query_service_addresses(
        &self,
        _request: Request<RequestTaskManagerMetricQueryServiceAddressesRequest>,
    ) -> Result<Response<TaskManagerMetricQueryServiceAddressesReply>, Status> {
        let addresses = self.introspection.task_manager_metric_query_service_addresses().await;
        Ok(Response::new(TaskManagerMetricQueryServiceAddressesReply {
            addresses: addresses
                .into_iter()
                .map(|a| MetricQueryServiceAddress {
                    resource_id: a.resource_id.to_string(),
                    address: a.address,
                })
                .collect(),
        }))
    }

    async fn request_task_manager_file_upload(
        &self,
        request: Request<RequestTaskManagerFileUploadRequest>,
    ) -> Result<Response<RequestTaskManagerFileUploadReply>, Status> {
        let req = request.into_inner();
        let file_type = match FileType::from_i32(req.file_type) {
            Some(FileType::Stdout) => CoreFileType::Stdout,
            _ => CoreFileType::Log,
        };
        match self
            .introspection
            .task_manager_file_upload(&ResourceId::from(req.resource_id), file_type)
            .await
        {
            Ok(()) => Ok(Response::new(RequestTaskManagerFileUploadReply {
                success: true,
                decline_reason: String::new(),
            })),
            Err(error) => Ok(Response::new(RequestTaskManagerFileUploadReply {
                success: false,
                decline_reason: error.to_string(),
            })),
        }
    }
}
