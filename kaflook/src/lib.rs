pub mod admin;
pub mod backend;
pub mod connection;
pub mod connection_settings;
pub mod consumer;
pub mod error;
pub mod facade;
pub mod format;
pub mod queries;
