use crate::{
    error::{Error, Result},
    objects::{CONTROL_MASK_OUTPUT, CONTROL_MASK_REMOTE, PsObject},
    scaling,
    telegram::{self, FrameType, MIN_RESPONSE_LEN},
    types::{Control, Status},
};
use embedded_io::Error as _;

/// Node addressed when no other channel is selected. Single-output
/// models only ever use this one.
pub const DEFAULT_NODE: u8 = 0;

/// Payload a set operation is answered with when the device acknowledged
/// it ("error 0").
const ACKNOWLEDGE: [u8; 2] = [0xFF, 0x00];

/// You can create a Ps2000 using any interface which implements
/// [embedded_io::Read] & [embedded_io::Write]. The interface must apply
/// a read timeout of roughly 60 ms; the device needs a minimum interval
/// of 50 ms between commands and the timeout is what enforces it.
///
/// Creating the session reads the nominal voltage and current from the
/// device once; they are the scaling base for every setpoint, threshold
/// and measured value (raw 25600 = 100 % of nominal).
///
/// Set operations other than [`Ps2000::set_remote`] require remote mode,
/// entered with [`Ps2000::enter_remote`] or scoped via
/// [`Ps2000::with_remote`].
pub struct Ps2000<S: embedded_io::Read + embedded_io::Write, const L: usize = 100> {
    interface: S,
    /// Nominal voltage in volts, object 2.
    u_nom: f32,
    /// Nominal current in amps, object 3.
    i_nom: f32,
    /// Nodes whose remote mode this session manages. `[0]` for single
    /// models, `[0, 1]` for triple models.
    nodes: heapless::Vec<u8, 2>,
    remote: bool,
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> Ps2000<S, L> {
    /// Create a session for a single-output device.
    pub fn new(interface: S) -> Result<Self, S::Error> {
        Self::with_nodes(interface, &[DEFAULT_NODE])
    }

    /// Create a session managing the given output nodes. Triple models
    /// pass `&[0, 1]` so the remote handshake covers the second channel.
    ///
    /// Fetches the nominal voltage and current immediately; fails with
    /// [`Error::InvalidNominal`] if the device reports a zero or
    /// non-finite nominal, as every scaled operation would be undefined.
    pub fn with_nodes(interface: S, nodes: &[u8]) -> Result<Self, S::Error> {
        let nodes = heapless::Vec::from_slice(nodes).map_err(|_| Error::Buffer)?;
        let mut psu = Self {
            interface,
            u_nom: 0.0,
            i_nom: 0.0,
            nodes,
            remote: false,
        };
        let u_nom = psu.get_nominal_voltage(DEFAULT_NODE)?;
        let i_nom = psu.get_nominal_current(DEFAULT_NODE)?;
        if !(u_nom.is_finite() && u_nom > 0.0 && i_nom.is_finite() && i_nom > 0.0) {
            return Err(Error::InvalidNominal);
        }
        psu.u_nom = u_nom;
        psu.i_nom = i_nom;
        Ok(psu)
    }

    /// Nominal voltage fetched at session start.
    pub fn nominal_voltage(&self) -> f32 {
        self.u_nom
    }

    /// Nominal current fetched at session start.
    pub fn nominal_current(&self) -> f32 {
        self.i_nom
    }

    /// Send one telegram and receive one validated response.
    ///
    /// This is the single request/response primitive every other method
    /// goes through; the protocol is strictly half-duplex with no
    /// pipelining. The response is checked in order for length, checksum
    /// and a device-reported error code, and the first failure is
    /// returned without any retry.
    pub fn transfer(
        &mut self,
        frame_type: FrameType,
        node: u8,
        object: impl Into<u8>,
        data: &[u8],
    ) -> Result<heapless::Vec<u8, L>, S::Error> {
        let telegram = telegram::build::<L>(frame_type, node, object.into(), data)
            .map_err(|_| Error::Buffer)?;
        self.interface.write_all(&telegram).map_err(Error::Serial)?;

        let response = self.read_response()?;
        if response.len() < MIN_RESPONSE_LEN {
            return Err(Error::ShortResponse {
                received: response.len(),
            });
        }
        if !telegram::verify_checksum(&response) {
            return Err(Error::ChecksumMismatch);
        }
        telegram::classify(&response)?;
        Ok(response)
    }

    /// Read one response frame. The start delimiter is read first; its
    /// length field tells us how many more bytes the answer carries.
    fn read_response(&mut self) -> Result<heapless::Vec<u8, L>, S::Error> {
        let mut response: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut expected = 1usize;
        let mut chunk = [0u8; telegram::MAX_RESPONSE_LEN];
        while response.len() < expected {
            let want = (expected - response.len()).min(chunk.len());
            match self.interface.read(&mut chunk[..want]) {
                Ok(0) => break,
                Ok(n) => {
                    response
                        .extend_from_slice(&chunk[..n])
                        .map_err(|_| Error::Buffer)?;
                    expected = telegram::expected_len(response[0]).min(L);
                }
                Err(e) => {
                    // A timed-out read ends the answer; the caller turns
                    // anything below the minimum frame length into a
                    // short-response error.
                    if matches!(
                        e.kind(),
                        embedded_io::ErrorKind::TimedOut | embedded_io::ErrorKind::Other
                    ) {
                        break;
                    }
                    return Err(Error::Serial(e));
                }
            }
        }
        Ok(response)
    }

    //
    // Typed object accessors ############################################
    //

    /// Query a binary object and return its raw payload.
    pub fn get_binary(
        &mut self,
        object: impl Into<u8>,
        node: u8,
    ) -> Result<heapless::Vec<u8, L>, S::Error> {
        let response = self.transfer(FrameType::Query, node, object, &[])?;
        heapless::Vec::from_slice(&response[3..response.len() - 2]).map_err(|_| Error::Buffer)
    }

    /// Write a binary object. The mask byte selects which bits of the
    /// data byte the device merges. Returns the response payload.
    pub fn set_binary(
        &mut self,
        object: impl Into<u8>,
        mask: u8,
        data: u8,
        node: u8,
    ) -> Result<heapless::Vec<u8, L>, S::Error> {
        let response = self.transfer(FrameType::Send, node, object, &[mask, data])?;
        heapless::Vec::from_slice(&response[3..response.len() - 2]).map_err(|_| Error::Buffer)
    }

    /// Query a string object. The payload carries a trailing type marker
    /// byte which is stripped.
    pub fn get_string(
        &mut self,
        object: impl Into<u8>,
        node: u8,
    ) -> Result<heapless::String<16>, S::Error> {
        let response = self.transfer(FrameType::Query, node, object, &[])?;
        if response.len() < MIN_RESPONSE_LEN + 1 {
            return Err(Error::InvalidPayload);
        }
        let bytes = &response[3..response.len() - 3];
        let text = core::str::from_utf8(bytes).map_err(|_| Error::InvalidPayload)?;
        if !text.is_ascii() {
            return Err(Error::InvalidPayload);
        }
        let mut string = heapless::String::new();
        string.push_str(text).map_err(|_| Error::Buffer)?;
        Ok(string)
    }

    /// Query a float object (big-endian IEEE-754 single precision).
    pub fn get_float(&mut self, object: impl Into<u8>, node: u8) -> Result<f32, S::Error> {
        let response = self.transfer(FrameType::Query, node, object, &[])?;
        let bytes: [u8; 4] = response[3..response.len() - 2]
            .try_into()
            .map_err(|_| Error::InvalidPayload)?;
        Ok(f32::from_be_bytes(bytes))
    }

    /// Query an integer object (big-endian u16).
    pub fn get_integer(&mut self, object: impl Into<u8>, node: u8) -> Result<u16, S::Error> {
        let response = self.transfer(FrameType::Query, node, object, &[])?;
        if response.len() < 7 {
            return Err(Error::InvalidPayload);
        }
        Ok(u16::from_be_bytes([response[3], response[4]]))
    }

    /// Write an integer object and return the value the device echoes.
    /// The device may clamp out-of-range values silently, so callers
    /// compare the echo against the intended value.
    pub fn set_integer(
        &mut self,
        object: impl Into<u8>,
        value: u16,
        node: u8,
    ) -> Result<u16, S::Error> {
        let response = self.transfer(FrameType::Send, node, object, &value.to_be_bytes())?;
        if response.len() < 7 {
            return Err(Error::InvalidPayload);
        }
        Ok(u16::from_be_bytes([response[3], response[4]]))
    }

    //
    // Identification ####################################################
    //

    /// Device type string, object 0.
    pub fn get_type(&mut self) -> Result<heapless::String<16>, S::Error> {
        self.get_string(PsObject::DeviceType, DEFAULT_NODE)
    }

    /// Serial number string, object 1.
    pub fn get_serial(&mut self) -> Result<heapless::String<16>, S::Error> {
        self.get_string(PsObject::SerialNumber, DEFAULT_NODE)
    }

    /// Nominal voltage in volts, object 2.
    pub fn get_nominal_voltage(&mut self, node: u8) -> Result<f32, S::Error> {
        self.get_float(PsObject::NominalVoltage, node)
    }

    /// Nominal current in amps, object 3.
    pub fn get_nominal_current(&mut self, node: u8) -> Result<f32, S::Error> {
        self.get_float(PsObject::NominalCurrent, node)
    }

    /// Nominal power in watts, object 4.
    pub fn get_nominal_power(&mut self, node: u8) -> Result<f32, S::Error> {
        self.get_float(PsObject::NominalPower, node)
    }

    /// Article number string, object 6.
    pub fn get_article(&mut self, node: u8) -> Result<heapless::String<16>, S::Error> {
        self.get_string(PsObject::ArticleNumber, node)
    }

    /// Manufacturer string, object 8.
    pub fn get_manufacturer(&mut self, node: u8) -> Result<heapless::String<16>, S::Error> {
        self.get_string(PsObject::Manufacturer, node)
    }

    /// Firmware version string, object 9.
    pub fn get_version(&mut self, node: u8) -> Result<heapless::String<16>, S::Error> {
        self.get_string(PsObject::Version, node)
    }

    /// Device class identifier, object 19.
    pub fn get_device_class(&mut self, node: u8) -> Result<u16, S::Error> {
        self.get_integer(PsObject::DeviceClass, node)
    }

    //
    // Scaled setpoints and thresholds ###################################
    //

    /// Voltage setpoint in volts, object 50.
    pub fn get_voltage_setpoint(&mut self, node: u8) -> Result<f32, S::Error> {
        let raw = self.get_integer(PsObject::VoltageSetpoint, node)?;
        Ok(scaling::raw_to_physical(raw, self.u_nom))
    }

    /// Set the voltage setpoint. Returns the voltage the device
    /// acknowledged, which may differ if it clamped the value.
    pub fn set_voltage(&mut self, voltage: f32, node: u8) -> Result<f32, S::Error> {
        self.set_scaled(PsObject::VoltageSetpoint, voltage, self.u_nom, node)
    }

    /// Current setpoint in amps, object 51.
    pub fn get_current_setpoint(&mut self, node: u8) -> Result<f32, S::Error> {
        let raw = self.get_integer(PsObject::CurrentSetpoint, node)?;
        Ok(scaling::raw_to_physical(raw, self.i_nom))
    }

    /// Set the current setpoint. Returns the current the device
    /// acknowledged.
    pub fn set_current(&mut self, current: f32, node: u8) -> Result<f32, S::Error> {
        self.set_scaled(PsObject::CurrentSetpoint, current, self.i_nom, node)
    }

    /// Over-voltage protection threshold in volts, object 38.
    pub fn get_ovp_threshold(&mut self, node: u8) -> Result<f32, S::Error> {
        let raw = self.get_integer(PsObject::OvpThreshold, node)?;
        Ok(scaling::raw_to_physical(raw, self.u_nom))
    }

    /// Set the over-voltage protection threshold in volts.
    pub fn set_ovp_threshold(&mut self, voltage: f32, node: u8) -> Result<f32, S::Error> {
        self.set_scaled(PsObject::OvpThreshold, voltage, self.u_nom, node)
    }

    /// Over-current protection threshold in amps, object 39.
    pub fn get_ocp_threshold(&mut self, node: u8) -> Result<f32, S::Error> {
        let raw = self.get_integer(PsObject::OcpThreshold, node)?;
        Ok(scaling::raw_to_physical(raw, self.i_nom))
    }

    /// Set the over-current protection threshold in amps.
    pub fn set_ocp_threshold(&mut self, current: f32, node: u8) -> Result<f32, S::Error> {
        self.set_scaled(PsObject::OcpThreshold, current, self.i_nom, node)
    }

    fn set_scaled(
        &mut self,
        object: PsObject,
        value: f32,
        nominal: f32,
        node: u8,
    ) -> Result<f32, S::Error> {
        self.ensure_remote()?;
        let raw = scaling::physical_to_raw(value, nominal).ok_or(Error::InvalidNominal)?;
        let echoed = self.set_integer(object, raw, node)?;
        Ok(scaling::raw_to_physical(echoed, nominal))
    }

    //
    // Control and status ################################################
    //

    /// Decoded control bitfield, object 54.
    pub fn get_control(&mut self, node: u8) -> Result<Control, S::Error> {
        let payload = self.get_binary(PsObject::Control, node)?;
        let bytes: [u8; 2] = payload
            .as_slice()
            .try_into()
            .map_err(|_| Error::InvalidPayload)?;
        Ok(Control::from_payload(&bytes))
    }

    /// Whether the device is in remote mode.
    pub fn get_remote(&mut self, node: u8) -> Result<bool, S::Error> {
        Ok(self.get_control(node)?.remote)
    }

    /// Switch remote mode on or off for one node. Returns whether the
    /// device acknowledged. This is the only set operation permitted in
    /// local mode, since it is the transition into remote.
    pub fn set_remote(&mut self, remote: bool, node: u8) -> Result<bool, S::Error> {
        let data = if remote { CONTROL_MASK_REMOTE } else { 0x00 };
        self.set_control(CONTROL_MASK_REMOTE, data, node)
    }

    /// Switch local mode on or off; the inverse of [`Ps2000::set_remote`].
    pub fn set_local(&mut self, local: bool, node: u8) -> Result<bool, S::Error> {
        self.set_remote(!local, node)
    }

    /// Whether the output stage is enabled.
    pub fn get_output_on(&mut self, node: u8) -> Result<bool, S::Error> {
        Ok(self.get_control(node)?.output_on)
    }

    /// Switch the output stage on or off. Returns whether the device
    /// acknowledged.
    pub fn set_output_on(&mut self, on: bool, node: u8) -> Result<bool, S::Error> {
        self.ensure_remote()?;
        let data = if on { CONTROL_MASK_OUTPUT } else { 0x00 };
        self.set_control(CONTROL_MASK_OUTPUT, data, node)
    }

    /// Switch the output stage off or on; the inverse of
    /// [`Ps2000::set_output_on`].
    pub fn set_output_off(&mut self, off: bool, node: u8) -> Result<bool, S::Error> {
        self.set_output_on(!off, node)
    }

    /// Actual status of one node, object 71: control location, output
    /// and protection flags, measured voltage and current.
    pub fn get_actual_status(&mut self, node: u8) -> Result<Status, S::Error> {
        self.get_status(PsObject::ActualStatus, node)
    }

    /// Setpoint status of one node, object 72. Same layout as the actual
    /// status but reporting the setpoints.
    pub fn get_setpoint_status(&mut self, node: u8) -> Result<Status, S::Error> {
        self.get_status(PsObject::SetpointStatus, node)
    }

    fn get_status(&mut self, object: PsObject, node: u8) -> Result<Status, S::Error> {
        let payload = self.get_binary(object, node)?;
        let bytes: [u8; 6] = payload
            .as_slice()
            .try_into()
            .map_err(|_| Error::InvalidPayload)?;
        Ok(Status::from_payload(&bytes, self.u_nom, self.i_nom))
    }

    fn set_control(&mut self, mask: u8, data: u8, node: u8) -> Result<bool, S::Error> {
        let payload = self.set_binary(PsObject::Control, mask, data, node)?;
        Ok(payload.as_slice() == ACKNOWLEDGE.as_slice())
    }

    //
    // Remote mode as a scoped resource ##################################
    //

    fn ensure_remote(&self) -> Result<(), S::Error> {
        if self.remote {
            Ok(())
        } else {
            Err(Error::NotRemote)
        }
    }

    /// Enter remote mode on every node this session manages.
    ///
    /// Entry is all or nothing: if a later node refuses, the nodes
    /// already switched are returned to local and the entry error is
    /// surfaced.
    pub fn enter_remote(&mut self) -> Result<(), S::Error> {
        for i in 0..self.nodes.len() {
            let node = self.nodes[i];
            if let Err(e) = self.set_remote(true, node) {
                for j in (0..i).rev() {
                    let node = self.nodes[j];
                    let _ = self.set_remote(false, node);
                }
                return Err(e);
            }
        }
        self.remote = true;
        Ok(())
    }

    /// Return every managed node to local mode, symmetrically to
    /// [`Ps2000::enter_remote`].
    pub fn exit_remote(&mut self) -> Result<(), S::Error> {
        // Drop the flag first so a failed release cannot leave set
        // operations enabled.
        self.remote = false;
        for i in 0..self.nodes.len() {
            let node = self.nodes[i];
            self.set_remote(false, node)?;
        }
        Ok(())
    }

    /// Run `operation` inside a remote-mode scope.
    ///
    /// The release back to local mode is issued on every exit path of
    /// the operation, success or error, so a failing command cannot
    /// leave the front panel locked out. An error from the operation
    /// takes precedence over an error from the release. Panics are not
    /// caught; unwinding skips the release.
    pub fn with_remote<T, F>(&mut self, operation: F) -> Result<T, S::Error>
    where
        F: FnOnce(&mut Self) -> Result<T, S::Error>,
    {
        self.enter_remote()?;
        let outcome = operation(self);
        let released = self.exit_remote();
        let value = outcome?;
        released?;
        Ok(value)
    }
}
