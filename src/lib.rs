pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod simulator;
pub mod store;
