pub mod analysis;
pub mod assistant;
pub mod auth;
pub mod config;
pub mod errors;
pub mod models;
pub mod scoring_client;
pub mod state;

#[cfg(test)]
mod testing;
