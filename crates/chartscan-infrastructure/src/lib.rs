pub mod market_data;
pub mod persistence;
pub mod universe;
