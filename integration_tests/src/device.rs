//! Device communication client.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use anyhow::Result;
use serialport::SerialPort;

use crate::protocol::{
    build_command, build_command_payload, cobs_decode, cobs_encode, parse_response,
    parse_settings, CommandId, Response, ResponseId, Settings,
};

/// Find the first ttyACM/ttyUSB port that answers GetVersion.
pub fn find_data_port() -> Result<String> {
    for port_info in serialport::available_ports()? {
        let name = &port_info.port_name;
        if !name.contains("ttyACM") && !name.contains("ttyUSB") {
            continue;
        }

        if let Ok(mut client) = DeviceClient::new(name, 115200) {
            client.set_timeout(Duration::from_millis(500));
            if let Ok(response) = client.send_command(CommandId::GetVersion, &[]) {
                if response.resp_id == ResponseId::Version {
                    return Ok(name.clone());
                }
            }
        }
    }
    anyhow::bail!("No data port found - ensure the transmitter is connected")
}

/// Resolve a port argument - returns the port path if not "auto", otherwise auto-detects.
pub fn resolve_port(port_arg: &str) -> Result<String> {
    if port_arg == "auto" {
        find_data_port()
    } else {
        Ok(port_arg.to_string())
    }
}

/// Client for talking to the transmitter over serial.
pub struct DeviceClient {
    port: Box<dyn SerialPort>,
    timeout: Duration,
}

impl DeviceClient {
    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_secs(2))
            .open()?;

        Ok(Self {
            port,
            timeout: Duration::from_secs(2),
        })
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Clear any pending data in the serial buffer.
    pub fn clear_buffer(&mut self) -> Result<()> {
        self.port.clear(serialport::ClearBuffer::All)?;
        Ok(())
    }

    /// Poll GetVersion until the transmitter answers or `patience` runs out.
    ///
    /// Commands queue while a setup run is in progress, so a freshly reset
    /// board held in setup stays silent until the run ends.
    pub fn wait_until_responsive(&mut self, patience: Duration) -> Result<[u8; 3]> {
        let start = Instant::now();
        let previous = self.timeout;
        self.timeout = Duration::from_millis(500);

        let result = loop {
            self.clear_buffer()?;
            match self.send_command(CommandId::GetVersion, &[]) {
                Ok(r) if r.resp_id == ResponseId::Version && r.payload.len() == 3 => {
                    break Ok([r.payload[0], r.payload[1], r.payload[2]]);
                }
                _ if start.elapsed() >= patience => {
                    break Err(anyhow::anyhow!(
                        "No answer to GetVersion within {:?} - is a setup run in progress?",
                        patience
                    ));
                }
                _ => continue,
            }
        };

        self.timeout = previous;
        result
    }

    /// Fetch and decode the settings currently in effect.
    pub fn read_settings(&mut self) -> Result<Settings> {
        let response = self.send_command(CommandId::GetSettings, &[])?;
        if response.resp_id != ResponseId::Settings {
            anyhow::bail!("Expected Settings response, got {:?}", response.resp_id);
        }
        parse_settings(&response.payload)
    }

    /// Send a command and wait for response.
    pub fn send_command(&mut self, cmd_id: CommandId, payload: &[u8]) -> Result<Response> {
        let frame = build_command(cmd_id, payload);
        self.exchange(&frame)
    }

    /// Send a command with an arbitrary id byte (for invalid command tests).
    pub fn send_raw_command(&mut self, cmd_id: u8, payload: &[u8]) -> Result<Response> {
        let frame = cobs_encode(&build_command_payload(cmd_id, payload));
        self.exchange(&frame)
    }

    /// Send a command whose CRC has been flipped.
    pub fn send_corrupt_command(&mut self, cmd_id: CommandId) -> Result<Response> {
        let mut raw = build_command_payload(cmd_id as u8, &[]);
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        self.exchange(&cobs_encode(&raw))
    }

    fn exchange(&mut self, frame: &[u8]) -> Result<Response> {
        self.port.write_all(frame)?;
        self.port.flush()?;

        // Add the zero delimiter back - corncobs expects it
        let mut response_data = self.read_frame()?;
        response_data.push(0x00);
        let decoded = cobs_decode(&response_data)?;
        parse_response(&decoded)
    }

    /// Read bytes until zero delimiter.
    fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut buf = [0u8; 1];
        let start = Instant::now();

        while start.elapsed() < self.timeout {
            match self.port.read(&mut buf) {
                Ok(1) => {
                    if buf[0] == 0x00 {
                        if !data.is_empty() {
                            return Ok(data);
                        }
                    } else {
                        data.push(buf[0]);
                    }
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }
        }

        anyhow::bail!(
            "Timeout waiting for response, got {} bytes: {:02x?}",
            data.len(),
            data
        );
    }
}
