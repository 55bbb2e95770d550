pub mod attendance;
pub mod face;
pub mod placement;
pub mod site_location;
