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

//! External collaborators consumed by C3 (leader election) and C4
//! (job-leader-id service). Both are high-availability primitives the spec
//! treats as out of scope (SS1); only their contract with the core matters.
//! In-memory fakes for tests live in `crate::test_support`.

use uuid::Uuid;

use rm_core::ids::{JobId, JobMasterId, ResourceManagerId};

use crate::outcome::{FatalError, OperationFailure};

/// Acquire/confirm/revoke leadership, with fencing-token management.
#[async_trait::async_trait]
pub trait LeaderElection: Send + Sync {
    /// Whether the caller still holds leadership under `session`. Checked
    /// after any in-flight clear-state future completes, immediately before
    /// confirming -- a leadership grant can be rescinded while we were busy
    /// clearing state.
    async fn is_leader(&self, session: &ResourceManagerId) -> bool;

    /// Announce to the rest of the cluster that `session` is now actively
    /// serving. Must only be called after heartbeat monitors and the slot
    /// manager are ready to accept traffic (SS4.3's confirm-after-prepare
    /// ordering).
    async fn confirm_leadership(&self, session: &ResourceManagerId) -> Result<(), FatalError>;
}

/// For each JobID, exposes a future that resolves to the current leading
/// JobMasterId and fires callbacks on change or idle timeout (C4).
#[async_trait::async_trait]
pub trait JobLeaderIdService: Send + Sync {
    fn contains_job(&self, job_id: &JobId) -> bool;

    /// Fatal if it fails: the spec treats "cannot interact with the
    /// job-leader-id service during registration add/fetch" as a broken
    /// dependency, not a recoverable failure.
    async fn add_job(&self, job_id: JobId) -> Result<(), FatalError>;

    fn remove_job(&self, job_id: &JobId);

    async fn get_leader_id(&self, job_id: &JobId) -> Result<JobMasterId, OperationFailure>;

    fn is_valid_timeout(&self, job_id: &JobId, timeout_token: Uuid) -> bool;

    /// Fatal if it fails, mirroring `add_job`.
    fn clear(&self) -> Result<(), FatalError>;
}
