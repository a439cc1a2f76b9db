//! Lead Search Relay Library
//!
//! Server-side relay for the lead-generation CRM: authenticates a search
//! request, forwards it to an external automation webhook with a long retry
//! horizon, audits the delivery, and stores the returned businesses as leads.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Relay logic, normalization and ingestion.
//! - `integrations`: External service clients.
//! - `auth_client`: Auth provider client and bearer token extraction.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Datastore capabilities used by the relay.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `ingestion`: Webhook result to lead transformation.
//! - `messages`: Caller-facing localized messages.
//! - `models`: Core data models.
//! - `relay`: Request orchestration.
//! - `tokens`: Filter token normalization.
//! - `webhook_client`: Outbound webhook delivery with retry.
//! - `webhook_models`: Webhook result item model.

pub mod api;
pub mod core;
pub mod integrations;

pub mod auth_client;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod handlers;
pub mod ingestion;
pub mod messages;
pub mod models;
pub mod relay;
pub mod tokens;
pub mod webhook_client;
pub mod webhook_models;
