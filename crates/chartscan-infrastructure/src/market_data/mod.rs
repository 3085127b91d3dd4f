pub mod csv_bars;

pub use csv_bars::CsvBarProvider;
