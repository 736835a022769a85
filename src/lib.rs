pub mod config;
pub mod database;
pub mod dto;
pub mod http;
pub mod memory;
pub mod models;
pub mod store;
