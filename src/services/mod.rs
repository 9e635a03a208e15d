// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod ai_gateway;
pub mod extract;
pub mod generation;
pub mod pdf;
pub mod prompts;
pub mod quota;

pub use ai_gateway::AiGatewayClient;
pub use extract::TextExtractor;
pub use quota::{QuotaService, QuotaSnapshot};
