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

//! The concrete `ResourceActions` bridge handed to the slot manager on
//! every leadership grant (C7): every operation it exposes posts a command
//! onto the actor loop, so that `releaseResource`/`allocateResource`/
//! `notifyAllocationFailure` are, like everything else, asserted to execute
//! on the actor loop rather than racing with it.

use tokio::sync::oneshot;

use rm_core::ids::{AllocationId, InstanceId, JobId};

use crate::actor::Command;
use crate::slot_manager::{ResourceActions, ResourceProfile};

pub struct ActorResourceActions<W> {
    sender: rm_core::event_loop::EventSender<Command<W>>,
}

impl<W> ActorResourceActions<W> {
    pub fn new(sender: rm_core::event_loop::EventSender<Command<W>>) -> Self {
        Self { sender }
    }
}

#[async_trait::async_trait]
impl<W: Send + Sync + 'static> ResourceActions for ActorResourceActions<W> {
    async fn release_resource(&self, instance_id: InstanceId, cause: String) {
        let _ = self
            .sender
            .post_event(Command::ReleaseResource { instance_id, cause })
            .await;
    }

    async fn allocate_resource(&self, profile: ResourceProfile) -> Vec<ResourceProfile> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .sender
            .post_event(Command::AllocateResource { profile, reply: reply_tx })
            .await
            .is_err()
        {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }

    async fn notify_allocation_failure(&self, job_id: JobId, allocation_id: AllocationId, cause: String) {
        let _ = self
            .sender
            .post_event(Command::NotifyAllocationFailure {
                job_id,
                allocation_id,
                cause,
            })
            .await;
    }
}
