//! Command handlers for the tox-edm binary

pub mod config;
pub mod context;
pub mod env;
