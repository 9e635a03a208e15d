// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Study Forge: turn lecture notes into study materials
//!
//! This crate provides the backend API that generates summaries,
//! flashcards, quizzes and explanations through an AI gateway, exports
//! them to PDF, enforces daily plan quotas and hosts community chat and
//! the admin console.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{AiGatewayClient, QuotaService, TextExtractor};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub ai_gateway: AiGatewayClient,
    pub extractor: TextExtractor,
    pub quota: QuotaService,
}

impl AppState {
    /// Wire services from configuration and a database handle.
    pub fn new(config: Config, db: FirestoreDb) -> error::Result<Self> {
        let ai_gateway = AiGatewayClient::new(&config)?;
        let extractor = TextExtractor::new(ai_gateway.clone());
        let quota = QuotaService::new(db.clone());

        Ok(Self {
            config,
            db,
            ai_gateway,
            extractor,
            quota,
        })
    }
}
