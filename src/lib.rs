// Library for tests to access modules

pub mod cli;
pub mod collector;
pub mod config;
pub mod display;
pub mod drivers;
pub mod engine;
pub mod error;
pub mod fleet;
pub mod latch;
pub mod models;
pub mod monitor;
pub mod registry;
pub mod version;
pub mod watcher;
