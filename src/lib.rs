pub mod api;
pub mod config;
pub mod course;
pub mod enrollment;
pub mod error;
pub mod server;
pub mod user;
pub mod utils;
pub mod viewer;
