pub mod capture;
pub mod devices;
pub mod frames;
pub mod recorder;
pub mod session;
pub mod wav;
