pub mod bootstrap;
pub mod config;
pub mod csv;
pub mod db;
pub mod log_buffer;
pub mod rates;
