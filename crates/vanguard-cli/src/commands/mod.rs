//! Command implementations

pub mod chat;
pub mod config;
pub mod history;
pub mod key;
pub mod models;
pub mod speak;
pub mod state;
