pub mod config;
pub mod load;
pub mod merge;
pub mod table;
pub mod view;
pub mod write;
