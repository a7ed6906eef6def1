// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! SPP server application layer.
//!
//! One RFCOMM session at a time, a credit-paced bulk transfer engine with a
//! bounded retry budget, pairing policy for the stack's management events and
//! a single-slot link key store.

pub mod app;
pub mod bluetooth;
pub mod commands;
pub mod config;
pub mod events;
pub mod runtime;
pub mod session;
pub mod state;
pub mod storage;
pub mod transfer;
