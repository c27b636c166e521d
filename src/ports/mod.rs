//! Port traits at the I/O boundary.

pub mod config_port;
pub mod data_port;
pub mod report_port;
