#![forbid(unsafe_code)]

pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod formats;
pub mod http;
pub mod logging;
pub mod progress;
pub mod reviews;
pub mod shelves;
pub mod statuses;
pub mod writers;
pub mod xml;
