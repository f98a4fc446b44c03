pub mod config;
pub mod creative;
pub mod error;
pub mod export;
pub mod gemini;
pub mod history;
pub mod models;
pub mod orchestrator;
pub mod routes;
pub mod storage;
pub mod studio;
pub mod upload;
