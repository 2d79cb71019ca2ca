pub mod app;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod entries;
pub mod persistence;
pub mod scheduler;
pub mod storage;
pub mod ui;
pub mod viewport;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
