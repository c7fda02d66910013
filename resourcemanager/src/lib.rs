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

pub mod actor;
pub mod config;
pub mod heartbeat;
pub mod introspection;
pub mod leader;
pub mod metrics;
pub mod model;
pub mod outcome;
pub mod provisioner;
pub mod registration;
pub mod resource_actions;
pub mod rpc;
pub mod slot_manager;
pub mod test_support;
