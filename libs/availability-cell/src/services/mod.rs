pub mod availability;

pub use availability::{project_slots, AvailabilityService};
