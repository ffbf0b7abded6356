//! Device domain module.

pub mod status;

pub use status::DeviceStatus;
