pub mod app;
pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod media;
pub mod posts;
pub mod state;
pub mod storage;
pub mod store;
