//! Core types for the census ETL pipeline.
//!
//! This crate decodes raw extract lines, reconstructs the characteristic
//! hierarchy and defines the [`store::CensusStore`] trait. It has no database
//! dependency; `census-store-sqlite` implements the trait.

pub mod characteristic;
pub mod dimension;
pub mod error;
pub mod hierarchy;
pub mod lines;
pub mod record;
pub mod store;

pub use error::{Error, Result};
