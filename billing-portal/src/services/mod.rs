//! Services module for billing-portal.

pub mod database;
pub mod metrics;

pub use database::Database;
pub use metrics::{
    get_metrics, init_metrics, record_adjustment, record_error, record_payment, record_retrieval,
};
