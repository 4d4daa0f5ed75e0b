pub mod catalog;
pub mod definition;
pub mod gate;
