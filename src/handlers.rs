// src/handlers.rs

pub mod audit;
pub mod auth;
pub mod documents;
pub mod jurisdictions;
pub mod obligations;
pub mod reports;
pub mod reviews;
pub mod tasks;
pub mod templates;
pub mod tenancy;
