//! Concrete flows of the companion app.

pub mod device_setup;
pub mod send;
pub mod settings;

use kb_core::error::FlowError;

/// Maps a backend failure message from a device-interactive call. The device
/// backend reports user aborts in the message text ("aborted by user"); those
/// become the distinct abort indicator instead of a notice.
pub(crate) fn device_error(message: String) -> FlowError {
    if message.contains("aborted") {
        FlowError::DeviceAbort
    } else {
        FlowError::request(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_message_maps_to_device_abort() {
        assert_eq!(
            device_error("signing aborted by user".into()),
            FlowError::DeviceAbort
        );
    }

    #[test]
    fn test_other_messages_stay_request_errors() {
        assert_eq!(
            device_error("sd card full".into()),
            FlowError::request("sd card full")
        );
    }
}
