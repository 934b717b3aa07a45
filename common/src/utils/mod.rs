pub mod config;
pub mod embedding;
pub mod finance;
pub mod input;
