//! CertSync CRM Library
//!
//! Lead management for a digital-certificate sales business: the REST API
//! over leads, users and site settings, and the Kanban board controller that
//! moves leads through the sales pipeline with optimistic updates.
//!
//! # Modules
//!
//! - `api_client`: HTTP client implementing the lead store.
//! - `board`: Kanban board controller and the `LeadStore` trait.
//! - `config`: Configuration management.
//! - `db`: Database connection and schema bootstrap.
//! - `db_storage`: Repositories for leads, users and settings.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Records, domain types and request/response bodies.
//! - `openapi`: OpenAPI document.
//! - `pipeline`: Pipeline stages and grouping.
//! - `reports`: Dashboard counters and renewal rules.
//! - `routes`: Router assembly.
//! - `validation`: Form input validation.

pub mod api_client;
pub mod board;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod pipeline;
pub mod reports;
pub mod routes;
pub mod validation;
