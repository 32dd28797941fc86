use std::env;

use ea_ps2000::error::Error;
use ea_ps2000::psu::{DEFAULT_NODE, Ps2000};
use inquire::Select;
use serialport::SerialPort;

// Serial parameters the PS 2000 protocol depends on. The 60 ms read
// timeout also guarantees the device's 50 ms minimum command interval.
const BAUD_RATE: u32 = 115_200;
const SERIAL_TIMEOUT_MS: u64 = 60;

pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            std::io::ErrorKind::OutOfMemory => embedded_io::ErrorKind::OutOfMemory,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        // serialport signals a timed-out read as an error; the TimedOut
        // kind is what ends a response for the driver.
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

fn print_info(
    psu: &mut Ps2000<PortWrapper, 100>,
    node: u8,
) -> Result<(), Error<IoError>> {
    println!("type         {}", psu.get_type()?);
    println!("serial       {}", psu.get_serial()?);
    println!("article      {}", psu.get_article(node)?);
    println!("manufacturer {}", psu.get_manufacturer(node)?);
    println!("version      {}", psu.get_version(node)?);
    println!("nom. voltage {}", psu.get_nominal_voltage(node)?);
    println!("nom. current {}", psu.get_nominal_current(node)?);
    println!("nom. power   {}", psu.get_nominal_power(node)?);
    println!("class        0x{:04x}", psu.get_device_class(node)?);
    println!("OVP          {}", psu.get_ovp_threshold(node)?);
    println!("OCP          {}", psu.get_ocp_threshold(node)?);

    let actual = psu.get_actual_status(node)?;
    println!("control      {}", if actual.remote { "remote" } else { "local" });
    println!("output       {}", if actual.output_on { "on" } else { "off" });
    println!("mode         {:?}", actual.mode);
    println!("OVP tripped  {}", actual.ovp);
    println!("OCP tripped  {}", actual.ocp);
    println!("OPP tripped  {}", actual.opp);
    println!("OTP tripped  {}", actual.otp);
    println!("actual voltage {:.3} V", actual.voltage);
    println!("actual current {:.3} A", actual.current);
    Ok(())
}

fn main() {
    // Get serial port from command line arg or interactive selection
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

        Select::new("Select a serial port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    let node: u8 = env::args()
        .nth(2)
        .and_then(|n| n.parse().ok())
        .unwrap_or(DEFAULT_NODE);

    println!("Using port: {port_name} (node {node})");

    let port = serialport::new(&port_name, BAUD_RATE)
        .parity(serialport::Parity::Odd)
        .timeout(std::time::Duration::from_millis(SERIAL_TIMEOUT_MS))
        .open()
        .expect("Failed to open serial port");

    let port = PortWrapper(port);

    // Addressing node 1 means this is a triple model, so the remote
    // handshake has to cover the second channel too.
    let mut psu: Ps2000<PortWrapper, 100> = if node != DEFAULT_NODE {
        Ps2000::with_nodes(port, &[0, 1])
    } else {
        Ps2000::new(port)
    }
    .expect("Failed to open session");

    let action = Select::new("Action:", vec!["on", "off", "toggle", "info"])
        .prompt()
        .expect("Failed to select action");

    psu.with_remote(|psu| match action {
        "on" => {
            println!("turning on");
            psu.set_output_on(true, node).map(|_| ())
        }
        "off" => {
            println!("turning off");
            psu.set_output_on(false, node).map(|_| ())
        }
        "toggle" => {
            let output_on = psu.get_output_on(node)?;
            if output_on {
                println!("Output on -> turning off");
            } else {
                println!("Output off -> turning on");
            }
            psu.set_output_on(!output_on, node).map(|_| ())
        }
        _ => print_info(psu, node),
    })
    .expect("Operation failed");
}
