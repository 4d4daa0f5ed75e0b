pub mod controller;
pub mod docking;
pub mod flight;
pub mod proxy;
pub mod state;
