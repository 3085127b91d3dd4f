pub mod bar;
pub mod pivot;
pub mod score;
pub mod ticker;
