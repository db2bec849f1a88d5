pub mod adapters;
pub mod config;
pub mod error;
pub mod run;
