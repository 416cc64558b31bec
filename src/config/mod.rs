//! Configuration module for panelql.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, DashboardSettings, QuerySettings, Settings, SettingsError, TransportSettings,
};
