//! Supermarket Storefront library.
//!
//! This crate provides the storefront functionality as a library, so the
//! CLI and the integration tests can reuse the stores and services.
//!
//! # Modules
//!
//! - [`db`] - Store traits with `PostgreSQL` and in-memory implementations
//! - [`services`] - Auth, cart, catalog and checkout logic
//! - [`routes`] - Axum handlers and Askama templates

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
