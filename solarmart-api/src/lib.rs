//! # SolarMart API Server Library
//!
//! REST backend of the SolarMart marketplace: sellers list solar solutions,
//! admins approve them, and buyers browse approved listings and register
//! interest after verifying their WhatsApp number.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `bootstrap`: First-run administrator account
//! - `config`: Environment configuration
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Response security headers
//! - `pagination`: Page parameters and envelopes
//! - `routes`: API route handlers

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod middleware;
pub mod pagination;
pub mod routes;
