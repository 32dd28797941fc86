//! Serial-port stand-in used by the unit tests.
//!
//! Answers are pre-loaded into a read buffer; once it runs dry, reads
//! fail like a timed-out port so the driver's short-response handling
//! can be exercised.

pub struct MockSerial {
    /// Everything the driver wrote, i.e. the outgoing telegrams.
    write_buffer: heapless::Vec<u8, 256>,
    /// Pre-loaded answer bytes.
    read_buffer: heapless::Vec<u8, 256>,
    read_position: usize,
    fail_writes: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum MockSerialError {
    /// No more pre-loaded data; stands in for a read timeout.
    #[error("no more queued answer bytes")]
    WouldBlock,
    /// Buffer capacity exceeded.
    #[error("mock buffer capacity exceeded")]
    Overflow,
    /// Injected write failure.
    #[error("injected write failure")]
    Injected,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::WouldBlock => embedded_io::ErrorKind::Other,
            MockSerialError::Overflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::Injected => embedded_io::ErrorKind::BrokenPipe,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fail_writes {
            return Err(MockSerialError::Injected);
        }
        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::Overflow)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.read_position >= self.read_buffer.len() {
            return Err(MockSerialError::WouldBlock);
        }

        let available = self.read_buffer.len() - self.read_position;
        let count = buf.len().min(available);
        buf[..count]
            .copy_from_slice(&self.read_buffer[self.read_position..self.read_position + count]);
        self.read_position += count;
        Ok(count)
    }
}

impl MockSerial {
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            read_buffer: heapless::Vec::new(),
            read_position: 0,
            fail_writes: false,
        }
    }

    /// Replace the pre-loaded answer bytes. Several answer frames can be
    /// queued back to back; the driver reads them one frame at a time.
    pub fn set_read_data(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        self.read_buffer.clear();
        self.read_position = 0;
        self.read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockSerialError::Overflow)
    }

    /// The telegrams written so far, in order.
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    pub fn clear_written_data(&mut self) {
        self.write_buffer.clear();
    }

    /// Make every subsequent write fail.
    pub fn set_write_error(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, Write};

    #[test]
    fn writes_accumulate() {
        let mut mock = MockSerial::new();
        mock.write(&[0x70, 0x00]).unwrap();
        mock.write(&[0x02]).unwrap();
        assert_eq!(mock.written_data(), &[0x70, 0x00, 0x02]);

        mock.clear_written_data();
        assert!(mock.written_data().is_empty());
    }

    #[test]
    fn reads_drain_the_queue_then_block() {
        let mut mock = MockSerial::new();
        mock.set_read_data(&[0x70, 0x00, 0x02, 0x00, 0x72]).unwrap();

        let mut first = [0u8; 1];
        assert_eq!(mock.read(&mut first).unwrap(), 1);
        assert_eq!(first[0], 0x70);

        let mut rest = [0u8; 8];
        assert_eq!(mock.read(&mut rest).unwrap(), 4);

        assert!(matches!(
            mock.read(&mut rest),
            Err(MockSerialError::WouldBlock)
        ));
    }

    #[test]
    fn error_type_formats_and_reports() {
        // embedded_io::Error requires the full core error contract.
        let err: &dyn core::error::Error = &MockSerialError::WouldBlock;
        assert_eq!(err.to_string(), "no more queued answer bytes");
    }

    #[test]
    fn injected_write_failure() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);
        assert!(matches!(
            mock.write(&[0x00]),
            Err(MockSerialError::Injected)
        ));
        assert!(mock.written_data().is_empty());
    }
}
