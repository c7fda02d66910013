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

pub type Result<T, E = RmError> = std::result::Result<T, E>;

/// Low-level error type shared by anything that speaks the resource manager's
/// wire protocol or runs on its actor loop. Higher-level callers (the RPC
/// surface in particular) map this onto the decline/failure/fatal taxonomy
/// in `rm_server::outcome`.
#[derive(thiserror::Error, Debug)]
pub enum RmError {
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("rpc failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("event loop '{name}' channel closed")]
    EventLoopClosed { name: String },

    #[error("event loop '{name}' is already stopped")]
    EventLoopStopped { name: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl RmError {
    pub fn internal(msg: impl Into<String>) -> Self {
        RmError::Internal(msg.into())
    }
}
