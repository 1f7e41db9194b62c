pub mod audit;
pub mod config;
pub mod dto;
pub mod enrich;
pub mod error;
pub mod import;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod session;
pub mod slug;
pub mod state;
pub mod store;
pub mod uploads;
