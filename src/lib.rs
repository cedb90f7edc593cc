pub mod actors;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod github;
pub mod models;
pub mod refresher;
pub mod schedule;
pub mod server;
pub mod store;
pub mod types;
