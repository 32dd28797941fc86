//! This module is used to define the communication objects of the PS 2000.
//!
//! Each object is a numeric register identified together with a node
//! (output channel) byte. Scaled objects hold a u16 in the range
//! 0 - 25600, representing 0 - 100 % of the matching nominal value.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum PsObject {
    /// __R__ - Device type string, e.g. `"PS 2042-06B"`.
    DeviceType = 0,
    /// __R__ - Serial number string.
    SerialNumber = 1,
    /// __R__ - Nominal voltage in volts (IEEE-754 single).
    NominalVoltage = 2,
    /// __R__ - Nominal current in amps (IEEE-754 single).
    NominalCurrent = 3,
    /// __R__ - Nominal power in watts (IEEE-754 single).
    NominalPower = 4,
    /// __R__ - Article number string.
    ArticleNumber = 6,
    /// __R__ - Manufacturer string.
    Manufacturer = 8,
    /// __R__ - Firmware version string.
    Version = 9,
    /// __R__ - Device class identifier.
    DeviceClass = 19,
    /// __R/W__ - Over-voltage protection threshold, scaled u16.
    OvpThreshold = 38,
    /// __R/W__ - Over-current protection threshold, scaled u16.
    OcpThreshold = 39,
    /// __R/W__ - Voltage setpoint, scaled u16.
    VoltageSetpoint = 50,
    /// __R/W__ - Current setpoint, scaled u16.
    CurrentSetpoint = 51,
    /// __R/W__ - Control bitfield, 2 bytes.
    ///
    /// Byte 0 bit 0 is remote mode, byte 1 bit 0 is output on. Writes
    /// carry a mask byte followed by a data byte so the device only
    /// merges the masked bits.
    Control = 54,
    /// __R__ - Actual status, 6 bytes: control location, state flags,
    /// actual voltage u16, actual current u16.
    ActualStatus = 71,
    /// __R__ - Setpoint status, same layout as [`PsObject::ActualStatus`]
    /// but reporting the setpoints.
    SetpointStatus = 72,
}

impl From<PsObject> for u8 {
    fn from(value: PsObject) -> Self {
        value as u8
    }
}

/// Mask selecting the remote-mode bit in the control bitfield.
pub const CONTROL_MASK_REMOTE: u8 = 0x10;

/// Mask selecting the output-on bit in the control bitfield.
pub const CONTROL_MASK_OUTPUT: u8 = 0x01;
