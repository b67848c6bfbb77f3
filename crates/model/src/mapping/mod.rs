pub mod config;
pub mod correspondence;
