pub mod audit;
pub mod auth;
pub mod dashboard;
pub mod document;
pub mod jurisdiction;
pub mod obligation;
pub mod review;
pub mod task;
pub mod template;
pub mod tenancy;
