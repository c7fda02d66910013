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

//! The framework-specific worker provisioner (standalone, container
//! orchestrator, or cloud scheduler). The design notes call for an injected
//! capability object rather than a base class to subclass -- `W` is
//! whatever handle the backend wants to remember per worker (a pod name, a
//! PID, a cloud instance id); this crate never looks inside it.

use rm_core::ids::ResourceId;

use crate::outcome::FatalError;
use crate::slot_manager::ResourceProfile;

#[async_trait::async_trait]
pub trait WorkerProvisioner<W>: Send + Sync {
    /// Called once, before the resource manager starts serving RPCs.
    async fn initialize(&self) -> Result<(), FatalError>;

    /// Asked by the resource-actions bridge to provision a new worker
    /// matching `profile`. Returns the resource profiles the new worker will
    /// advertise once it registers, or an empty vec if provisioning was
    /// refused. Does not itself install any registration -- that happens
    /// later, when the worker calls `registerTaskExecutor`.
    async fn start_new_worker(&self, profile: ResourceProfile) -> Vec<ResourceProfile>;

    /// Binds an already-launched worker's `ResourceID` to a backend-specific
    /// handle. Returning `None` means the worker is unrecognized (it was
    /// never started via `start_new_worker`) and the registration attempt
    /// must be declined.
    async fn worker_started(&self, resource_id: &ResourceId) -> Option<W>;

    /// Requests termination of a previously started worker.
    async fn stop_worker(&self, resource_id: &ResourceId, worker_handle: &W);

    /// Invoked on `deregisterApplication`.
    async fn internal_deregister_application(&self, diagnostics: Option<String>);

    /// Run once per leadership grant, after services have started but
    /// before leadership is confirmed to the election service.
    async fn prepare_leadership(&self);

    /// Run once per leadership loss or grant, to let the backend drop any
    /// state tied to the previous leadership epoch. The future this returns
    /// must complete before the next grant is confirmed.
    async fn clear_state(&self);
}
