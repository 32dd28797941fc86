//! Decoded value types for the PS 2000 binary objects.

use modular_bitfield::prelude::*;

/// Represents the two possible regulation modes of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Constant voltage regulation mode.
    Cv,
    /// Constant current regulation mode.
    Cc,
}

/// Decoded control bitfield (object 54).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    /// Remote-control mode active.
    pub remote: bool,
    /// Output stage enabled.
    pub output_on: bool,
}

impl Control {
    /// Decode the two-byte control payload.
    ///
    /// Byte 0 bit 0 is remote, byte 1 bit 0 is output on.
    pub fn from_payload(payload: &[u8; 2]) -> Self {
        Self {
            remote: payload[0] & 0x01 != 0,
            output_on: payload[1] & 0x01 != 0,
        }
    }
}

/// State flag byte shared by the actual-status and setpoint-status
/// objects (byte 1 of objects 71 and 72).
#[bitfield]
#[derive(Debug, Clone, Copy)]
pub struct StatusFlags {
    /// Output stage enabled.
    pub output_on: bool,
    /// Regulation mode; any non-zero value means constant current.
    pub regulation: B2,
    /// Tracking, only meaningful on dual/triple models.
    pub tracking: bool,
    /// Over-voltage protection tripped.
    pub ovp: bool,
    /// Over-current protection tripped.
    pub ocp: bool,
    /// Over-power protection tripped.
    pub opp: bool,
    /// Over-temperature protection tripped.
    pub otp: bool,
}

impl StatusFlags {
    /// The regulation mode encoded in bits 1-2.
    pub fn mode(&self) -> ControlMode {
        if self.regulation() != 0 {
            ControlMode::Cc
        } else {
            ControlMode::Cv
        }
    }
}

/// Decoded status record (objects 71 and 72).
///
/// For object 71 the voltage and current are the measured output values;
/// for object 72 they are the active setpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Status {
    /// Remote-control mode active.
    pub remote: bool,
    /// Output stage enabled.
    pub output_on: bool,
    /// Active regulation mode.
    pub mode: ControlMode,
    /// Over-voltage protection tripped.
    pub ovp: bool,
    /// Over-current protection tripped.
    pub ocp: bool,
    /// Over-power protection tripped.
    pub opp: bool,
    /// Over-temperature protection tripped.
    pub otp: bool,
    /// Voltage in volts, scaled by the nominal voltage.
    pub voltage: f32,
    /// Current in amps, scaled by the nominal current.
    pub current: f32,
}

impl Status {
    /// Decode the six-byte status payload with the session's nominal
    /// values as scaling base.
    pub fn from_payload(payload: &[u8; 6], u_nom: f32, i_nom: f32) -> Self {
        let flags = StatusFlags::from_bytes([payload[1]]);
        let raw_voltage = u16::from_be_bytes([payload[2], payload[3]]);
        let raw_current = u16::from_be_bytes([payload[4], payload[5]]);
        Self {
            remote: payload[0] & 0x03 != 0,
            output_on: flags.output_on(),
            mode: flags.mode(),
            ovp: flags.ovp(),
            ocp: flags.ocp(),
            opp: flags.opp(),
            otp: flags.otp(),
            voltage: crate::scaling::raw_to_physical(raw_voltage, u_nom),
            current: crate::scaling::raw_to_physical(raw_current, i_nom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_decoding() {
        let control = Control::from_payload(&[0x01, 0x01]);
        assert_eq!(
            control,
            Control {
                remote: true,
                output_on: true
            }
        );

        let control = Control::from_payload(&[0x00, 0x00]);
        assert_eq!(
            control,
            Control {
                remote: false,
                output_on: false
            }
        );
    }

    #[test]
    fn status_flag_bits() {
        // Output on, CC, OVP and OTP tripped.
        let flags = StatusFlags::from_bytes([0x01 | 0x02 | 0x10 | 0x80]);
        assert!(flags.output_on());
        assert_eq!(flags.mode(), ControlMode::Cc);
        assert!(flags.ovp());
        assert!(!flags.ocp());
        assert!(!flags.opp());
        assert!(flags.otp());
    }

    #[test]
    fn status_decoding_scales_with_nominals() {
        // Remote, output on, CV, 50 % of 24 V and 25 % of 10 A.
        let payload = [0x01, 0x01, 0x32, 0x00, 0x19, 0x00];
        let status = Status::from_payload(&payload, 24.0, 10.0);
        assert!(status.remote);
        assert!(status.output_on);
        assert_eq!(status.mode, ControlMode::Cv);
        assert!(!status.ovp && !status.ocp && !status.opp && !status.otp);
        assert_eq!(status.voltage, 12.0);
        assert_eq!(status.current, 2.5);
    }
}
