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

//! Resource manager specific configuration.

use std::time::Duration;

/// Configuration for the resource manager actor loop, heartbeat monitors,
/// and the tunables a deployment is expected to adjust.
#[derive(Debug, Clone)]
pub struct ResourceManagerConfig {
    /// The event loop's bounded channel capacity. For a busy cluster a
    /// larger value like 100_000 is recommended.
    pub event_loop_buffer_size: usize,
    /// How often the task-manager heartbeat monitor requests a heartbeat
    /// from every registered task executor.
    pub task_manager_heartbeat_interval: Duration,
    /// How long a task executor may go without heartbeating before it is
    /// considered dead.
    pub task_manager_heartbeat_timeout: Duration,
    /// How often the job-manager heartbeat monitor requests a heartbeat
    /// from every registered job manager.
    pub job_manager_heartbeat_interval: Duration,
    /// How long a job manager may go without heartbeating before it is
    /// considered dead.
    pub job_manager_heartbeat_timeout: Duration,
    /// Idle timeout passed through to the job-leader-id service: how long a
    /// job may go without any registered job manager before it is dropped.
    pub job_leader_id_idle_timeout: Duration,
}

impl Default for ResourceManagerConfig {
    fn default() -> Self {
        Self {
            event_loop_buffer_size: 10_000,
            task_manager_heartbeat_interval: Duration::from_secs(10),
            task_manager_heartbeat_timeout: Duration::from_secs(30),
            job_manager_heartbeat_interval: Duration::from_secs(10),
            job_manager_heartbeat_timeout: Duration::from_secs(30),
            job_leader_id_idle_timeout: Duration::from_secs(300),
        }
    }
}

impl ResourceManagerConfig {
    pub fn with_event_loop_buffer_size(mut self, buffer_size: usize) -> Self {
        self.event_loop_buffer_size = buffer_size;
        self
    }

    pub fn with_task_manager_heartbeat(mut self, interval: Duration, timeout: Duration) -> Self {
        self.task_manager_heartbeat_interval = interval;
        self.task_manager_heartbeat_timeout = timeout;
        self
    }

    pub fn with_job_manager_heartbeat(mut self, interval: Duration, timeout: Duration) -> Self {
        self.job_manager_heartbeat_interval = interval;
        self.job_manager_heartbeat_timeout = timeout;
        self
    }

    pub fn with_job_leader_id_idle_timeout(mut self, timeout: Duration) -> Self {
        self.job_leader_id_idle_timeout = timeout;
        self
    }
}
