pub mod market_data;
pub mod scan;
pub mod universe;
