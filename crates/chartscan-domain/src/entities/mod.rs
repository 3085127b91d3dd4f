pub mod scan;
pub mod scan_result;
