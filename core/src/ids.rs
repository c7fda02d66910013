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

//! Opaque identifiers from the data model (ResourceID, InstanceID, JobID,
//! fencing tokens). Each is a thin newtype over `String`/`Uuid` so that the
//! registration tables and the RPC surface cannot accidentally mix up, say,
//! a `ResourceId` and an `InstanceId` even though both are strings on the
//! wire.

use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

string_id!(
    ResourceId,
    "Opaque identifier of a physical host/process, stable across reconnects."
);
string_id!(
    JobId,
    "Opaque identifier of a job, stable for the job's lifetime."
);
string_id!(
    JobMasterId,
    "Leadership epoch token for a job's leading job-manager replica."
);
string_id!(
    ResourceManagerId,
    "Leadership epoch token (fencing token) for the resource manager itself."
);
string_id!(AllocationId, "Identifies one reservation of a slot by a job.");
string_id!(SlotId, "Identifies one unit of execution capacity.");

/// Invalidated on every re-registration or disconnect of a task executor;
/// used by the slot manager to scope slot ownership to one incarnation of a
/// `ResourceId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for InstanceId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_ids_are_unique_per_generation() {
        let a = InstanceId::generate();
        let b = InstanceId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn resource_id_round_trips_through_string() {
        let id = ResourceId::from("host-1".to_owned());
        assert_eq!(id.as_str(), "host-1");
        assert_eq!(id.to_string(), "host-1");
    }
}
