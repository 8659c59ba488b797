pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod preferences;
pub mod records;
pub mod session;
pub mod source;
