pub mod demo;
pub mod segment;
