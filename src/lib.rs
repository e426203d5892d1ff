pub mod cli;
pub mod config;
pub mod core;
pub mod export;
pub mod ui;

pub use config::DashboardConfig;
pub use crate::core::*;
pub use export::KpiExporter;
