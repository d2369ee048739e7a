pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod extract;
pub mod global;
pub mod limit;
pub mod publish;
pub mod source;
pub mod sync;
