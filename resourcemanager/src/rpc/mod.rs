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

//! The tonic service implementation (C5/C6/C9's RPC-facing half) and the
//! gateway-connector collaborators it depends on. Connecting to a remote
//! job manager or task executor is itself an external collaborator per the
//! scope notes -- the RPC transport, not the core -- so it is modeled as a
//! trait here rather than a concrete tonic client.

mod service;

pub use service::ResourceManagerService;

use std::sync::Arc;

use rm_core::ids::ResourceId;

use crate::registration::job_manager::JobManagerGateway;
use crate::registration::task_executor::TaskExecutorGateway;

#[async_trait::async_trait]
pub trait JobManagerGatewayConnector: Send + Sync {
    async fn connect(&self, address: &str) -> Arc<dyn JobManagerGateway>;
}

#[async_trait::async_trait]
pub trait TaskExecutorGatewayConnector: Send + Sync {
    async fn connect(&self, address: &str, resource_id: &ResourceId) -> Arc<dyn TaskExecutorGateway>;
}
