pub mod alert;
pub mod journey;
pub mod liveness;
pub mod location_point;

pub use alert::{Alert, AlertKind};
pub use journey::Journey;
pub use liveness::{AppState, LivenessRecord};
pub use location_point::LocationPoint;
