//! Value Objects - Immutable, identity-less domain primitives

mod admin_level;
mod geo_location;
mod transport_type;
mod walking_estimate;

pub use admin_level::AdminLevel;
pub use geo_location::{GeoLocation, InvalidCoordinates};
pub use transport_type::{TransportPriority, TransportType};
pub use walking_estimate::{WALKING_DETOUR_FACTOR, WALKING_SPEED_MPS, WalkingEstimate, round_to};
