pub mod attendance;
pub mod face;
