//! APDU framing for the Ledger Ethereum app.

/// A command sent to the device application.
///
/// The class byte is owned by the transport layer; commands here carry only
/// the instruction, its parameters and the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApduCommand {
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

/// A raw device answer: response payload plus the trailing status word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApduAnswer {
    pub data: Vec<u8>,
    pub status: u16,
}

impl ApduAnswer {
    pub fn is_success(&self) -> bool {
        self.status == sw::OK
    }
}

/// Status words reported by the device.
pub mod sw {
    pub const OK: u16 = 0x9000;
    /// Conditions of use not satisfied: the user declined on the device.
    pub const DENIED: u16 = 0x6985;
    /// Wrong or missing application.
    pub const APP_NOT_OPEN: u16 = 0x6511;
    pub const CLA_NOT_SUPPORTED: u16 = 0x6e00;
    pub const INS_NOT_SUPPORTED: u16 = 0x6d00;
    /// The app rejected the payload itself.
    pub const INCORRECT_DATA: u16 = 0x6a80;
    /// Device is PIN-locked.
    pub const LOCKED: u16 = 0x5515;
}

/// Human-readable description for a status word, for error surfaces.
pub fn status_message(status: u16) -> &'static str {
    match status {
        sw::OK => "success",
        sw::DENIED => "conditions of use not satisfied (denied by the user?)",
        sw::APP_NOT_OPEN => "required application is not open on the device",
        sw::CLA_NOT_SUPPORTED => "instruction class not supported by the current app",
        sw::INS_NOT_SUPPORTED => "instruction not supported by the current app",
        sw::INCORRECT_DATA => "the app rejected the provided data",
        sw::LOCKED => "device is locked",
        _ => "unknown device status",
    }
}
