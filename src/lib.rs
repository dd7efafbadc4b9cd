pub mod asset;
pub mod config;
pub mod document;
pub mod error;
pub mod fixer;
pub mod format;
