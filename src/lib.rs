pub mod agent;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod model;
pub mod store;
pub mod web;
