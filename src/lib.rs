pub mod bot;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod format;
pub mod mail;
pub mod session;
pub mod store;
