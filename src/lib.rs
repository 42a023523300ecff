/*
 * Copyright 2026 ReMock Team
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! HTTP request interception that answers matching requests with stored mock
//! responses and sends everything else to the real network.

pub mod config;
pub mod error;
pub mod interceptor;
pub mod matcher;
pub mod rules;
pub mod telemetry;

pub use interceptor::{InterceptedRequest, InterceptedResponse, Interceptor};
pub use matcher::{AntPathMatcher, PathMatcher};
