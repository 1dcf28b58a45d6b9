pub mod config;
pub mod embedding;
pub mod fetcher;
pub mod retry;
pub mod state;
