pub mod admin;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod flash;
pub mod handlers;
pub mod legacy;
pub mod logging;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;
pub mod views;
