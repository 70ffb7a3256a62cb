// src/lib.rs

//! Incremental post harvester library

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
