//! HTTP handlers for billing-portal.

pub mod adjustment;
pub mod health;
pub mod pages;
pub mod payment;
pub mod retrieval;
