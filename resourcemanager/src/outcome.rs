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

//! The three-way error taxonomy from the design: a semantic decline leaves
//! the system healthy, an operation failure is a transient local problem
//! that does not mutate state, and a fatal error means an invariant broke
//! or a dependency became unusable and must be escalated out of the actor
//! loop entirely.

use std::fmt;

/// Semantically rejected but the system remains healthy: leadership
/// mismatch, outdated registration, unknown worker, unfulfillable request.
/// Logged at info/debug and surfaced to the caller as a normal reply.
#[derive(Debug, Clone)]
pub struct Decline(pub String);

impl fmt::Display for Decline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Decline {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// A transient local problem (slot manager domain error, remote gateway
/// unreachable). Surfaced to the caller as a failed RPC; state is not
/// mutated.
#[derive(Debug, Clone)]
pub struct OperationFailure(pub String);

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OperationFailure {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// An invariant broke or a dependency is unusable: leader-election service
/// error, cannot interact with the job-leader-id service during
/// registration, cannot start resource-manager services. Delivered to the
/// fatal-error handler, which is expected to be non-blocking and typically
/// terminates the process for restart.
#[derive(Debug, Clone)]
pub struct FatalError(pub String);

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FatalError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl std::error::Error for Decline {}
impl std::error::Error for OperationFailure {}
impl std::error::Error for FatalError {}

/// What the registration state machine or slot dispatcher can produce:
/// either a concrete success value, a decline, or an operation failure.
pub type AdmissionResult<T> = Result<T, Admitted>;

#[derive(Debug, Clone)]
pub enum Admitted {
    Decline(Decline),
    Failure(OperationFailure),
}

impl From<Decline> for Admitted {
    fn from(d: Decline) -> Self {
        Admitted::Decline(d)
    }
}

impl From<OperationFailure> for Admitted {
    fn from(f: OperationFailure) -> Self {
        Admitted::Failure(f)
    }
}

impl fmt::Display for Admitted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Admitted::Decline(d) => write!(f, "declined: {d}"),
            Admitted::Failure(e) => write!(f, "failed: {e}"),
        }
    }
}

/// A sink for fatal errors. Logging of the fatal condition is itself
/// guarded against throwing (the closure is invoked inside a `catch_unwind`
/// by callers that install one); the default implementation logs and the
/// process is expected to be restarted by its supervisor.
pub trait FatalErrorHandler: Send + Sync {
    fn on_fatal_error(&self, error: FatalError);
}

pub struct LoggingFatalErrorHandler;

impl FatalErrorHandler for LoggingFatalErrorHandler {
    fn on_fatal_error(&self, error: FatalError) {
        tracing::error!(%error, "fatal error in resource manager, process should be restarted");
    }
}
