pub mod connection;
pub mod handler;
pub mod keepalive;

/// Close code for missing or invalid credentials on the upgrade request.
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;
/// Close code for unexpected handler faults.
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;
