pub mod config;
pub mod context;
pub mod db;
pub mod domain;
pub mod logging;
pub mod models;
pub mod repositories;
pub mod services;
