pub mod blocks;
pub mod stations;
pub mod tables;
