mod flow_bus;
mod hub;

pub use flow_bus::BroadcastFlowEvents;
pub use hub::NotificationHub;
