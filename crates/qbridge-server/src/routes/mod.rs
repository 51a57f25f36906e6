//! HTTP routes.

pub mod admin;
pub mod query;

pub use admin::{
    config_category_handler, config_detail_handler, config_entry_handler, config_summary_handler, encrypt_handler,
    error_handler, metrics_handler, register_handler,
};
pub use query::query_handler;
