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

//! Shared wire types and actor-loop plumbing for the resource manager
//! control plane. Endpoints (the resource manager, and in principle any
//! other participant) depend on this crate the way `ballista-scheduler`
//! and `ballista-executor` both depend on `ballista-core`.

pub mod error;
pub mod event_loop;
pub mod ids;

pub mod proto {
    #![allow(clippy::all)]
    tonic::include_proto!("resourcemanager");
}

pub use error::{RmError, Result};
