//! Library crate for roulette-rooms, exposing modules for binaries and integration tests.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod spin;
pub mod state;
pub mod sync;
