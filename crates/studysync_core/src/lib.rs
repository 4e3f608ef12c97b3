pub mod app;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod stats;
pub mod storage;
pub mod tasks;
pub mod timer;
