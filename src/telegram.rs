//! Telegram framing for the PS 2000 object protocol.
//!
//! A telegram is `[SD][node][object][data...][CS0][CS1]`. The start
//! delimiter encodes the direction in its upper bits and, when data is
//! present, `data.len() - 1` in its low nibble. The checksum is the
//! 16-bit sum of every preceding byte, split big-endian.

use crate::error::DeviceError;

/// Base value every start delimiter is built from.
pub const SD_BASE: u8 = 0x30;

/// Object byte value that marks a response as carrying an error code.
pub const ERROR_MARKER: u8 = 0xFF;

/// Shortest response that still carries a checksum.
pub const MIN_RESPONSE_LEN: usize = 5;

/// Longest possible answer from the device.
pub const MAX_RESPONSE_LEN: usize = 100;

/// Direction of a telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    /// Read an object from the device.
    Query = 0x40,
    /// Write an object to the device.
    Send = 0xC0,
}

/// 16-bit additive checksum over `bytes`.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes.iter().map(|&b| b as u16).sum()
}

/// Construct one outgoing telegram.
///
/// Only fails if the frame does not fit the buffer; the device-defined
/// maximum of 16 data bytes always fits the default session buffer.
pub fn build<const L: usize>(
    frame_type: FrameType,
    node: u8,
    object: u8,
    data: &[u8],
) -> Result<heapless::Vec<u8, L>, ()> {
    let mut telegram: heapless::Vec<u8, L> = heapless::Vec::new();
    telegram.push(SD_BASE + frame_type as u8).map_err(|_| ())?;
    telegram.push(node).map_err(|_| ())?;
    telegram.push(object).map_err(|_| ())?;
    if !data.is_empty() {
        telegram.extend_from_slice(data).map_err(|_| ())?;
        // Length field: low nibble of the start delimiter.
        telegram[0] += data.len() as u8 - 1;
    }
    let cs = checksum(&telegram);
    telegram.extend_from_slice(&cs.to_be_bytes()).map_err(|_| ())?;
    Ok(telegram)
}

/// Check the trailing checksum of a received frame.
pub fn verify_checksum(frame: &[u8]) -> bool {
    if frame.len() < MIN_RESPONSE_LEN {
        return false;
    }
    let cs = checksum(&frame[..frame.len() - 2]);
    frame[frame.len() - 2..] == cs.to_be_bytes()
}

/// Total length of a response whose start delimiter is `sd`.
///
/// Responses always carry at least one data byte, so the low nibble of
/// the delimiter is `data.len() - 1`.
pub fn expected_len(sd: u8) -> usize {
    6 + (sd & 0x0F) as usize
}

/// Inspect a checksum-valid response for a device-reported error.
///
/// A response with the error marker in the object byte and code `0x00`
/// is a plain acknowledge and is not treated as an error. Frames below
/// the minimum length carry no error code and pass through unchanged.
pub fn classify(response: &[u8]) -> Result<(), DeviceError> {
    if response.len() < MIN_RESPONSE_LEN || response[2] != ERROR_MARKER {
        return Ok(());
    }
    match response[3] {
        0x00 => Ok(()),
        code => Err(DeviceError::from_code(code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_without_data() {
        // Query for object 2 (nominal voltage) on node 0.
        let telegram: heapless::Vec<u8, 100> =
            build(FrameType::Query, 0x00, 0x02, &[]).unwrap();
        assert_eq!(telegram.as_slice(), &[0x70, 0x00, 0x02, 0x00, 0x72]);
    }

    #[test]
    fn send_with_data_updates_length_field() {
        let telegram: heapless::Vec<u8, 100> =
            build(FrameType::Send, 0x00, 0x32, &[0x32, 0x00]).unwrap();
        // SD = 0x30 + 0xC0 + (2 - 1).
        assert_eq!(telegram[0], 0xF1);
        assert_eq!(&telegram[1..5], &[0x00, 0x32, 0x32, 0x00]);
        let cs = checksum(&telegram[..5]);
        assert_eq!(&telegram[5..], &cs.to_be_bytes());
    }

    #[test]
    fn built_telegrams_verify() {
        let cases: &[(FrameType, u8, u8, &[u8])] = &[
            (FrameType::Query, 0, 0, &[]),
            (FrameType::Query, 1, 71, &[]),
            (FrameType::Send, 0, 54, &[0x10, 0x10]),
            (FrameType::Send, 1, 50, &[0xFF, 0xFF]),
        ];
        for &(frame_type, node, object, data) in cases {
            let telegram: heapless::Vec<u8, 100> =
                build(frame_type, node, object, data).unwrap();
            assert!(verify_checksum(&telegram));
        }
    }

    #[test]
    fn corrupted_frame_fails_verification() {
        let mut telegram: heapless::Vec<u8, 100> =
            build(FrameType::Query, 0x00, 0x02, &[]).unwrap();
        telegram[1] ^= 0x01;
        assert!(!verify_checksum(&telegram));
    }

    #[test]
    fn classify_access_denied() {
        let response = [0x70, 0x00, 0xFF, 0x09, 0x01, 0x78];
        assert_eq!(
            classify(&response),
            Err(DeviceError::AccessDenied)
        );
    }

    #[test]
    fn classify_acknowledge_is_not_an_error() {
        let response = [0x70, 0x00, 0xFF, 0x00, 0x01, 0x6F];
        assert_eq!(classify(&response), Ok(()));
    }

    #[test]
    fn classify_tolerates_short_slices() {
        assert_eq!(classify(&[]), Ok(()));
        assert_eq!(classify(&[0x70, 0x00, 0xFF]), Ok(()));
    }

    #[test]
    fn classify_plain_data_response() {
        let response = [0x73, 0x00, 0x02, 0x41, 0xC0, 0x00, 0x00, 0x01, 0x76];
        assert_eq!(classify(&response), Ok(()));
    }

    #[test]
    fn response_length_from_delimiter() {
        // One data byte.
        assert_eq!(expected_len(0x70), 6);
        // Four data bytes (a float payload).
        assert_eq!(expected_len(0x73), 9);
        // Sixteen data bytes, the device maximum.
        assert_eq!(expected_len(0x7F), 21);
    }
}
