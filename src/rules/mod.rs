//! Rate-rule data: the normalized model, ingestion from facility records,
//! day-type classification, the optional hygiene stage and display helpers.

pub mod day_type;
pub mod hygiene;
pub mod model;
pub mod parse;
pub mod summary;
