pub mod config;
pub mod scanning;
pub mod shared;
