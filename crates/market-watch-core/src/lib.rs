pub mod alert;
pub mod bar;
pub mod config;
pub mod error;
pub mod history;
pub mod indicators;
pub mod profile;
pub mod quote;
pub mod snapshot;
