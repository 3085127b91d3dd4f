pub mod dataset;
pub mod detectors;
pub mod preparation;
pub mod scoring;
pub mod signals;
pub mod universe;
