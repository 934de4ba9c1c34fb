use crate::config::SerialSettings;
use crate::instrument_channel::ChannelError;
use crate::serial_channel::SerialChannel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentResource {
    pub port: String,
    pub description: String,
}

impl InstrumentResource {
    pub fn new(port: String, description: String) -> Self {
        Self { port, description }
    }
}

pub struct ChannelConnector;

impl ChannelConnector {
    /// Open a channel to `identifier`, or to the first resource found when none is given.
    ///
    /// Accepts plain port names (`/dev/ttyACM0`, `COM3`) as well as VISA
    /// serial resource strings (`ASRL/dev/ttyACM0::INSTR`).
    pub fn open(
        identifier: Option<&str>,
        settings: SerialSettings,
    ) -> Result<SerialChannel, ChannelError> {
        let port = match identifier {
            Some(identifier) => Self::resolve_port(identifier),
            None => {
                let first = Self::get_available_resources()?
                    .into_iter()
                    .next()
                    .ok_or(ChannelError::NoResourceFound)?;
                log::debug!("No resource given, using {} ({})", first.port, first.description);
                first.port
            }
        };

        log::debug!("Connecting to instrument on port {}", port);
        SerialChannel::open(&port, settings)
    }

    /// Map a resource identifier onto the serial port it names.
    pub fn resolve_port(identifier: &str) -> String {
        let trimmed = identifier.trim();
        trimmed
            .strip_prefix("ASRL")
            .and_then(|rest| rest.strip_suffix("::INSTR"))
            .map_or_else(|| trimmed.to_string(), str::to_string)
    }

    /// All serial ports that could host an instrument.
    pub fn get_available_resources() -> Result<Vec<InstrumentResource>, ChannelError> {
        let ports = serialport::available_ports()?;

        Ok(ports
            .into_iter()
            .map(|port| {
                let description = match port.port_type {
                    serialport::SerialPortType::UsbPort(info) => format!(
                        "USB {:04x}:{:04x} {}",
                        info.vid,
                        info.pid,
                        info.product.unwrap_or_default()
                    ),
                    other => format!("{other:?}"),
                };
                InstrumentResource::new(port.port_name, description.trim_end().to_string())
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_port() {
        assert_eq!(
            ChannelConnector::resolve_port("ASRL/dev/ttyACM0::INSTR"),
            "/dev/ttyACM0"
        );
        assert_eq!(ChannelConnector::resolve_port("ASRLCOM3::INSTR"), "COM3");
        assert_eq!(ChannelConnector::resolve_port(" /dev/ttyUSB1 "), "/dev/ttyUSB1");
        assert_eq!(
            ChannelConnector::resolve_port("USB0::1689::883::C000489::0::INSTR"),
            "USB0::1689::883::C000489::0::INSTR"
        );
    }

    #[test]
    fn test_get_available_resources() {
        // Depends on what is plugged into the machine running the tests
        match ChannelConnector::get_available_resources() {
            Ok(resources) => {
                for resource in resources {
                    assert!(!resource.port.is_empty());
                }
            }
            Err(ChannelError::SerialPort(_)) => {
                // Expected where port enumeration is unavailable
            }
            Err(e) => panic!("Unexpected error: {e:?}"),
        }
    }

    #[test]
    fn test_open_missing_port_fails() {
        let result = ChannelConnector::open(
            Some("ASRL/dev/does-not-exist-tekscope::INSTR"),
            SerialSettings::default(),
        );
        assert!(result.is_err());
    }
}
