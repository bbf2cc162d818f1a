pub mod chunking;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod index;
pub mod loader;
pub mod retriever;
