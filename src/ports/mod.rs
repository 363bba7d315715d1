//! Port traits the domain is driven through.

pub mod config_port;
pub mod price_data_port;
pub mod result_store_port;
