pub mod gate;
pub mod pitch;
