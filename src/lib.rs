pub mod merge;
pub mod registry;
pub mod series;
