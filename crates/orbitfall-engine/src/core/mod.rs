pub mod guard;
pub mod math;
pub mod time;
pub mod world;
