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

//! Request/reply value types for the actor's command surface. Kept separate
//! from `rm_core::proto` so that the actor's internal vocabulary does not
//! have to track the wire schema one-for-one (the RPC layer is responsible
//! for that translation).

use rm_core::ids::{AllocationId, InstanceId, JobId, JobMasterId, ResourceId};

use crate::registration::task_executor::HardwareDescription;
use crate::slot_manager::ResourceProfile;

/// Static metadata returned to a task executor at registration time.
#[derive(Debug, Clone, Default)]
pub struct ClusterInformation {
    pub blob_server_address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RegisterJobManagerRequest {
    pub job_master_id: JobMasterId,
    pub job_manager_resource_id: ResourceId,
    pub address: String,
    pub job_id: JobId,
}

#[derive(Debug, Clone)]
pub struct RegisterJobManagerReply {
    pub fencing_token: rm_core::ids::ResourceManagerId,
    pub resource_manager_resource_id: ResourceId,
}

#[derive(Debug, Clone)]
pub struct RegisterTaskExecutorRequest {
    pub address: String,
    pub resource_id: ResourceId,
    pub data_port: u32,
    pub hardware: HardwareDescription,
}

#[derive(Debug, Clone)]
pub struct RegisterTaskExecutorReply {
    pub instance_id: InstanceId,
    pub resource_manager_resource_id: ResourceId,
    pub cluster_information: ClusterInformation,
}

#[derive(Debug, Clone)]
pub struct SlotRequestMessage {
    pub job_id: JobId,
    pub allocation_id: AllocationId,
    pub profile: ResourceProfile,
    pub preferred_resource_id: Option<ResourceId>,
}
