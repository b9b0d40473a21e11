//! Billing Portal - bill payment, retrieval and adjustment over HTML forms.

pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;
