use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the external device backend.
///
/// Variants carry the exact wire spellings used by the backend status
/// endpoint. `Unknown` is the designated default before the first status pull
/// completes, or when the pull fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceStatus {
    #[default]
    #[serde(rename = "")]
    Unknown,
    #[serde(rename = "require_firmware_upgrade")]
    RequireFirmwareUpgrade,
    #[serde(rename = "require_app_upgrade")]
    RequireAppUpgrade,
    #[serde(rename = "connected")]
    Connected,
    #[serde(rename = "unpaired")]
    Unpaired,
    #[serde(rename = "pairingFailed")]
    PairingFailed,
    #[serde(rename = "uninitialized")]
    Uninitialized,
    #[serde(rename = "seeded")]
    Seeded,
    #[serde(rename = "initialized")]
    Initialized,
}

impl DeviceStatus {
    /// Whether the first status pull has delivered a value yet.
    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }

    /// Statuses that put the device inside the setup wizard.
    pub fn needs_wizard(self) -> bool {
        matches!(
            self,
            Self::Connected | Self::Unpaired | Self::PairingFailed | Self::Uninitialized | Self::Seeded
        )
    }

    /// Statuses that require a firmware or app upgrade before anything else.
    pub fn needs_upgrade(self) -> bool {
        matches!(self, Self::RequireFirmwareUpgrade | Self::RequireAppUpgrade)
    }

    /// Statuses that prove the device has never finished setup, which turns a
    /// plain unlock flow into a full setup flow.
    pub fn proves_fresh_device(self) -> bool {
        matches!(self, Self::Uninitialized | Self::Seeded)
    }

    /// Whether the surrounding panel should be restored for this status.
    pub fn restores_panel(self) -> bool {
        matches!(self, Self::Connected | Self::Initialized)
    }

    pub fn is_initialized(self) -> bool {
        self == Self::Initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_spellings_round_trip() {
        let cases = [
            (DeviceStatus::Unknown, "\"\""),
            (DeviceStatus::RequireFirmwareUpgrade, "\"require_firmware_upgrade\""),
            (DeviceStatus::RequireAppUpgrade, "\"require_app_upgrade\""),
            (DeviceStatus::Connected, "\"connected\""),
            (DeviceStatus::Unpaired, "\"unpaired\""),
            (DeviceStatus::PairingFailed, "\"pairingFailed\""),
            (DeviceStatus::Uninitialized, "\"uninitialized\""),
            (DeviceStatus::Seeded, "\"seeded\""),
            (DeviceStatus::Initialized, "\"initialized\""),
        ];
        for (status, wire) in cases {
            assert_eq!(serde_json::to_string(&status).unwrap(), wire);
            assert_eq!(serde_json::from_str::<DeviceStatus>(wire).unwrap(), status);
        }
    }

    #[test]
    fn test_wizard_statuses() {
        assert!(DeviceStatus::Connected.needs_wizard());
        assert!(DeviceStatus::Unpaired.needs_wizard());
        assert!(DeviceStatus::PairingFailed.needs_wizard());
        assert!(DeviceStatus::Uninitialized.needs_wizard());
        assert!(DeviceStatus::Seeded.needs_wizard());

        assert!(!DeviceStatus::Unknown.needs_wizard());
        assert!(!DeviceStatus::Initialized.needs_wizard());
        assert!(!DeviceStatus::RequireFirmwareUpgrade.needs_wizard());
    }

    #[test]
    fn test_fresh_device_statuses() {
        assert!(DeviceStatus::Uninitialized.proves_fresh_device());
        assert!(DeviceStatus::Seeded.proves_fresh_device());
        assert!(!DeviceStatus::Connected.proves_fresh_device());
        assert!(!DeviceStatus::Initialized.proves_fresh_device());
    }

    #[test]
    fn test_default_is_unknown() {
        assert_eq!(DeviceStatus::default(), DeviceStatus::Unknown);
        assert!(!DeviceStatus::default().is_known());
    }
}
