//! User interface module
//!
//! Terminal dashboard: filter bar, quick presets, KPI tiles and toasts

pub mod tui;

pub use tui::{restore_terminal, setup_terminal, DashboardApp, Focus, RangeEditor};
