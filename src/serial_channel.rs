use crate::config::SerialSettings;
use crate::instrument_channel::{BlockFormat, ChannelError, InstrumentChannel};
use serialport::SerialPort;
use std::io::{Read, Write};

const LINE_TERMINATOR: u8 = b'\n';

/// SCPI over a serial line (USB-CDC or RS-232 resources).
pub struct SerialChannel {
    port_name: String,
    settings: SerialSettings,
    serial: Option<Box<dyn SerialPort>>,
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("port_name", &self.port_name)
            .field("settings", &self.settings)
            .field("open", &self.serial.is_some())
            .finish()
    }
}

impl SerialChannel {
    /// Open the port and discard anything left in its buffers.
    pub fn open(port_name: &str, settings: SerialSettings) -> Result<Self, ChannelError> {
        let mut channel = Self {
            port_name: port_name.to_string(),
            settings,
            serial: None,
        };
        channel.connect()?;
        Ok(channel)
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn is_open(&self) -> bool {
        self.serial.is_some()
    }

    fn connect(&mut self) -> Result<(), ChannelError> {
        log::debug!("Opening serial port {}", self.port_name);
        let serial = serialport::new(&self.port_name, self.settings.baud_rate)
            .timeout(self.settings.timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => ChannelError::Unreachable {
                    resource: self.port_name.clone(),
                },
                _ => ChannelError::SerialPort(e),
            })?;
        serial.clear(serialport::ClearBuffer::All)?;
        self.serial = Some(serial);
        Ok(())
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, ChannelError> {
        self.serial.as_mut().ok_or(ChannelError::SessionClosed)
    }

    fn send(&mut self, message: &str) -> Result<(), ChannelError> {
        let port = self.port()?;
        port.write_all(message.as_bytes())?;
        port.write_all(&[LINE_TERMINATOR])?;
        port.flush()?;
        Ok(())
    }
}

impl InstrumentChannel for SerialChannel {
    fn write(&mut self, command: &str) -> Result<(), ChannelError> {
        self.send(command)
    }

    fn query(&mut self, query: &str) -> Result<String, ChannelError> {
        self.send(query)?;
        read_line(self.port()?)
    }

    fn query_binary_block(
        &mut self,
        query: &str,
        format: BlockFormat,
    ) -> Result<Vec<i16>, ChannelError> {
        self.send(query)?;
        let port = self.port()?;
        let payload = read_definite_block(port)?;
        // The block is followed by a line terminator we have no use for.
        port.clear(serialport::ClearBuffer::Input)?;
        format.decode(&payload)
    }

    fn close(&mut self) -> Result<(), ChannelError> {
        if self.serial.take().is_some() {
            log::debug!("Closed serial port {}", self.port_name);
        }
        Ok(())
    }

    fn reopen(&mut self) -> Result<(), ChannelError> {
        if self.serial.is_some() {
            log::warn!("Serial port {} already open", self.port_name);
            return Ok(());
        }
        self.connect()
    }
}

/// Read one reply line, without its terminator.
pub(crate) fn read_line<R: Read + ?Sized>(reader: &mut R) -> Result<String, ChannelError> {
    let mut response = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        reader.read_exact(&mut byte)?;
        if byte[0] == LINE_TERMINATOR {
            break;
        }
        response.push(byte[0]);
    }

    let response_str = String::from_utf8(response)?;
    Ok(response_str.trim_end_matches('\r').to_string())
}

/// Read an IEEE 488.2 definite-length block (`#<n><length><payload>`).
pub(crate) fn read_definite_block<R: Read + ?Sized>(
    reader: &mut R,
) -> Result<Vec<u8>, ChannelError> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    if byte[0] != b'#' {
        return Err(ChannelError::MalformedBlock(format!(
            "expected '#' header, got 0x{:02x}",
            byte[0]
        )));
    }

    reader.read_exact(&mut byte)?;
    let digits = match byte[0] {
        b'1'..=b'9' => usize::from(byte[0] - b'0'),
        b'0' => {
            return Err(ChannelError::MalformedBlock(
                "indefinite-length blocks are not supported".to_string(),
            ))
        }
        other => {
            return Err(ChannelError::MalformedBlock(format!(
                "invalid length digit count 0x{other:02x}"
            )))
        }
    };

    let mut length_field = vec![0u8; digits];
    reader.read_exact(&mut length_field)?;
    let length: usize = std::str::from_utf8(&length_field)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            ChannelError::MalformedBlock(format!(
                "invalid block length '{}'",
                String::from_utf8_lossy(&length_field)
            ))
        })?;

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_line_strips_terminators() {
        let mut reply = Cursor::new(b"TEKTRONIX,DPO2014,0,CF:91.1CT\r\nAVE\n".to_vec());
        assert_eq!(read_line(&mut reply).unwrap(), "TEKTRONIX,DPO2014,0,CF:91.1CT");
        assert_eq!(read_line(&mut reply).unwrap(), "AVE");
    }

    #[test]
    fn test_read_line_without_terminator_fails() {
        let mut reply = Cursor::new(b"SAMPLE".to_vec());
        assert!(matches!(read_line(&mut reply), Err(ChannelError::Io(_))));
    }

    #[test]
    fn test_read_definite_block() {
        let mut reply = Cursor::new(b"#16\x00\x00\x01\xF4\xFE\x0C\n".to_vec());
        let payload = read_definite_block(&mut reply).unwrap();
        assert_eq!(
            BlockFormat::RIBINARY_16.decode(&payload).unwrap(),
            vec![0, 500, -500]
        );
    }

    #[test]
    fn test_read_multi_digit_length() {
        let mut raw = b"#210".to_vec();
        raw.extend_from_slice(&[0u8; 10]);
        let payload = read_definite_block(&mut Cursor::new(raw)).unwrap();
        assert_eq!(payload.len(), 10);
    }

    #[test]
    fn test_malformed_blocks() {
        for raw in [&b"16\x00\x00"[..], b"#0\x00\x00\n", b"#x", b"#2ab\x00"] {
            assert!(matches!(
                read_definite_block(&mut Cursor::new(raw.to_vec())),
                Err(ChannelError::MalformedBlock(_))
            ));
        }
    }

    #[test]
    fn test_truncated_block() {
        let mut reply = Cursor::new(b"#14\x00\x01".to_vec());
        assert!(matches!(
            read_definite_block(&mut reply),
            Err(ChannelError::Io(_))
        ));
    }
}
