pub mod classify;
pub mod lookup;
pub mod notes;
