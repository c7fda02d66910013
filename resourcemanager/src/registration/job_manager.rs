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

use dashmap::DashMap;
use rm_core::ids::{JobId, JobMasterId, ResourceId};

/// The RPC transport is an external collaborator (`spec.md` SS1); all the
/// resource manager needs from it is the ability to call back into a
/// specific job manager. Implementations live outside this crate (or, in
/// tests, in `test_support`).
#[async_trait::async_trait]
pub trait JobManagerGateway: Send + Sync {
    async fn heartbeat_from_resource_manager(&self, resource_id: &ResourceId);
    async fn disconnect_resource_manager(&self, fencing_token: Option<&str>, cause: &str);
    async fn notify_allocation_failure(&self, allocation_id: &str, cause: &str);
}

/// `(JobID, ResourceID of the job-manager process, remote gateway handle,
/// JobMasterId)`. Indexed by both JobID and ResourceID (invariant 2: the two
/// indexes always agree because both tables are only ever updated together,
/// from the same actor-loop turn, sharing this one `Arc`).
pub struct JobManagerRegistration {
    pub job_id: JobId,
    pub resource_id: ResourceId,
    pub gateway: Arc<dyn JobManagerGateway>,
    pub job_master_id: JobMasterId,
}

impl std::fmt::Debug for JobManagerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManagerRegistration")
            .field("job_id", &self.job_id)
            .field("resource_id", &self.resource_id)
            .field("job_master_id", &self.job_master_id)
            .finish()
    }
}

/// The dual-indexed table from invariant 2 in SS3: for every JobID key there
/// is exactly one matching entry in the ResourceID-indexed sibling, and vice
/// versa. Both maps hold the same `Arc`, so the two views can never diverge
/// in content, only (very briefly, mid-insert) in which key has been
/// published yet -- `insert` publishes both atomically from the caller's
/// point of view because it is only ever invoked from the single actor
/// turn that decided to install the registration.
#[derive(Default)]
pub struct JobManagerTable {
    by_job: DashMap<JobId, Arc<JobManagerRegistration>>,
    by_resource: DashMap<ResourceId, Arc<JobManagerRegistration>>,
}

impl JobManagerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_by_job(&self, job_id: &JobId) -> Option<Arc<JobManagerRegistration>> {
        self.by_job.get(job_id).map(|r| r.clone())
    }

    pub fn get_by_resource(&self, resource_id: &ResourceId) -> Option<Arc<JobManagerRegistration>> {
        self.by_resource.get(resource_id).map(|r| r.clone())
    }

    pub fn insert(&self, registration: JobManagerRegistration) -> Arc<JobManagerRegistration> {
        let registration = Arc::new(registration);
        self.by_job
            .insert(registration.job_id.clone(), registration.clone());
        self.by_resource
            .insert(registration.resource_id.clone(), registration.clone());
        registration
    }

    /// Remove by JobID, returning the removed registration if present.
    /// Idempotent: absence is not an error (SS4.5 "Explicit disconnect").
    pub fn remove_by_job(&self, job_id: &JobId) -> Option<Arc<JobManagerRegistration>> {
        let removed = self.by_job.remove(job_id).map(|(_, v)| v);
        if let Some(registration) = &removed {
            self.by_resource.remove(&registration.resource_id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.by_job.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_job.is_empty()
    }

    /// Empty both indexes atomically from the caller's point of view --
    /// used by `clearStateInternal` (C8) on leadership loss.
    pub fn clear(&self) {
        self.by_job.clear();
        self.by_resource.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeJobManagerGateway;

    fn registration(job_id: &str, resource_id: &str) -> JobManagerRegistration {
        JobManagerRegistration {
            job_id: JobId::from(job_id),
            resource_id: ResourceId::from(resource_id),
            gateway: Arc::new(FakeJobManagerGateway::default()),
            job_master_id: JobMasterId::from("jm-1"),
        }
    }

    #[test]
    fn insert_is_visible_from_both_indexes() {
        let table = JobManagerTable::new();
        table.insert(registration("job-1", "resource-1"));

        let by_job = table.get_by_job(&JobId::from("job-1")).unwrap();
        let by_resource = table.get_by_resource(&ResourceId::from("resource-1")).unwrap();
        assert!(Arc::ptr_eq(&by_job, &by_resource));
    }

    #[test]
    fn remove_drops_from_both_indexes() {
        let table = JobManagerTable::new();
        table.insert(registration("job-1", "resource-1"));
        table.remove_by_job(&JobId::from("job-1"));

        assert!(table.get_by_job(&JobId::from("job-1")).is_none());
        assert!(table.get_by_resource(&ResourceId::from("resource-1")).is_none());
    }

    #[test]
    fn removing_missing_job_is_not_an_error() {
        let table = JobManagerTable::new();
        assert!(table.remove_by_job(&JobId::from("missing")).is_none());
    }
}
