pub mod api;
pub mod app_config;
pub mod error;
pub mod startup;
pub mod time_util;
