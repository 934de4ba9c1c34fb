use crate::channel_connector::ChannelConnector;
use crate::config::{ScopeConfig, SerialSettings};
use crate::instrument_channel::{
    BlockFormat, ChannelError, Command, InstrumentChannel, Query, ScpiError, ScpiMessage,
};
use crate::preamble::{Preamble, PreambleError};
use crate::serial_channel::SerialChannel;
use crate::waveform::{mean_rows, scale_samples, time_axis, Waveform};
use std::fmt;
use std::str::FromStr;
use std::thread;

#[derive(Debug, thiserror::Error)]
pub enum TekScopeError {
    #[error(transparent)]
    Scpi(#[from] ScpiError),

    #[error("Malformed preamble: {0}")]
    MalformedPreamble(#[from] PreambleError),

    #[error("Transport error: {0}")]
    Transport(#[from] ChannelError),

    #[error("Reply '{reply}' to {query} is not valid")]
    InvalidReply { query: String, reply: String },

    #[error("Capture returned {actual} samples but the preamble announced {expected}")]
    SampleCountMismatch { expected: usize, actual: usize },

    #[error("{requested} averages requested, at most {max} supported")]
    AveragingCountTooLarge { requested: u32, max: u32 },

    #[error("Cannot read manufacturer and model from identity '{0}'")]
    Identity(String),

    #[error("Unknown channel '{0}', expected CH1 to CH4")]
    UnknownChannel(String),
}

/// Analog input of a four channel DPO2000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeChannel {
    Ch1,
    Ch2,
    Ch3,
    Ch4,
}

impl ScopeChannel {
    pub const ALL: [Self; 4] = [Self::Ch1, Self::Ch2, Self::Ch3, Self::Ch4];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeChannel::Ch1 => "CH1",
            ScopeChannel::Ch2 => "CH2",
            ScopeChannel::Ch3 => "CH3",
            ScopeChannel::Ch4 => "CH4",
        }
    }
}

impl fmt::Display for ScopeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeChannel {
    type Err = TekScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|channel| channel.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TekScopeError::UnknownChannel(s.to_string()))
    }
}

/// Transfer configuration established by one [`TekScope::fetch`].
///
/// Captures taken against a context reuse the channel, encoding and range
/// already set on the instrument, and calibrate with this preamble.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionContext {
    pub channel: ScopeChannel,
    pub preamble: Preamble,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    pub waveform: Waveform,
    pub context: AcquisitionContext,
}

/// Run one transfer, then close and reopen the session.
///
/// DPO2000 firmware only answers a single read per session, so every query
/// goes through here. The recycle happens whether or not the transfer
/// succeeded; a transfer error wins over a recycle error.
fn recycled<C, T>(
    channel: &mut C,
    transfer: impl FnOnce(&mut C) -> Result<T, ChannelError>,
) -> Result<T, ChannelError>
where
    C: InstrumentChannel,
{
    let result = transfer(channel);
    let recycle = channel.close().and_then(|()| channel.reopen());

    match (result, recycle) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(recycle_error)) => {
            log::warn!("Session recycle failed after transfer error: {}", recycle_error);
            Err(e)
        }
    }
}

fn parse_identity(idn: &str) -> Result<(String, String), TekScopeError> {
    let mut fields = idn.split(',').map(str::trim);
    match (fields.next(), fields.next()) {
        (Some(make), Some(model)) if !make.is_empty() && !model.is_empty() => {
            Ok((make.to_string(), model.to_string()))
        }
        _ => Err(TekScopeError::Identity(idn.to_string())),
    }
}

fn is_averaging_mode(reply: &str) -> bool {
    let mode = reply.trim().trim_start_matches(':');
    // Replies may carry the header when verbose headers are on
    let mode = mode.rsplit(' ').next().unwrap_or(mode);
    mode.eq_ignore_ascii_case("AVE") || mode.eq_ignore_ascii_case("AVERAGE")
}

/// A session with a Tektronix DPO2000 series oscilloscope.
pub struct TekScope<C: InstrumentChannel> {
    channel: C,
    manufacturer: String,
    model: String,
    config: ScopeConfig,
}

impl TekScope<SerialChannel> {
    /// Connect to the instrument at `identifier`, or to the first one found.
    pub fn connect(
        identifier: Option<&str>,
        settings: SerialSettings,
        config: ScopeConfig,
    ) -> Result<Self, TekScopeError> {
        let channel = ChannelConnector::open(identifier, settings)?;
        Self::with_config(channel, config)
    }
}

impl<C: InstrumentChannel> TekScope<C> {
    pub fn new(channel: C) -> Result<Self, TekScopeError> {
        Self::with_config(channel, ScopeConfig::default())
    }

    /// Identify the instrument on `channel` and set it running.
    pub fn with_config(mut channel: C, config: ScopeConfig) -> Result<Self, TekScopeError> {
        let idn = recycled(&mut channel, |c| c.query("*IDN?"))?;
        let (manufacturer, model) = parse_identity(&idn)?;
        log::debug!("Connected to {} {}", manufacturer, model);

        let mut scope = Self {
            channel,
            manufacturer,
            model,
            config,
        };
        scope.send_command("ACQuire:STAte RUN")?;
        Ok(scope)
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn into_channel(self) -> C {
        self.channel
    }

    pub fn close(&mut self) -> Result<(), TekScopeError> {
        Ok(self.channel.close()?)
    }

    pub fn open(&mut self) -> Result<(), TekScopeError> {
        Ok(self.channel.reopen()?)
    }

    pub fn send(&mut self, command: &Command) -> Result<(), TekScopeError> {
        Ok(self.channel.write(command.as_str())?)
    }

    /// Send a query and recycle the session before returning its reply.
    pub fn ask(&mut self, query: &Query) -> Result<String, TekScopeError> {
        Ok(recycled(&mut self.channel, |c| c.query(query.as_str()))?)
    }

    /// Send either kind of message; only queries yield a reply.
    pub fn execute(&mut self, message: &ScpiMessage) -> Result<Option<String>, TekScopeError> {
        match message {
            ScpiMessage::Command(command) => self.send(command).map(|()| None),
            ScpiMessage::Query(query) => self.ask(query).map(Some),
        }
    }

    /// Change an instrument setting, e.g. `HORizontal:SCAle 4e-6`.
    pub fn send_command(&mut self, text: &str) -> Result<(), TekScopeError> {
        let command = Command::new(text)?;
        self.send(&command)
    }

    /// Read an instrument setting, e.g. `CH2:SCAle?`.
    pub fn query(&mut self, text: &str) -> Result<String, TekScopeError> {
        let query = Query::new(text)?;
        self.ask(&query)
    }

    /// Restore factory default settings.
    pub fn reset(&mut self) -> Result<(), TekScopeError> {
        self.send_command("*RST")
    }

    fn query_record_length(&mut self) -> Result<usize, TekScopeError> {
        const RECORD_LENGTH_QUERY: &str = "WFMOutpre:RECOrdlength?";

        let reply = self.query(RECORD_LENGTH_QUERY)?;
        let parsed = reply.trim().parse();
        parsed.map_err(|_| TekScopeError::InvalidReply {
            query: RECORD_LENGTH_QUERY.to_string(),
            reply,
        })
    }

    /// Capture one full record from `channel` in volts.
    ///
    /// Raw data cannot be read while the instrument is in hardware averaging
    /// mode, so the acquisition mode is switched to sample mode first.
    #[tracing::instrument(skip(self))]
    pub fn fetch(&mut self, channel: ScopeChannel) -> Result<Acquisition, TekScopeError> {
        if is_averaging_mode(&self.query("ACQuire:MODe?")?) {
            log::debug!("Leaving averaging mode to read raw data");
            self.send_command("ACQuire:MODe SAMple")?;
            thread::sleep(self.config.mode_settle_delay);
        }

        self.send_command(&format!("SELect:{channel} 1"))?;

        // RIBinary: signed, big-endian
        self.send_command(&format!("DATa:SOUrce {channel};:ENCdg RIBinary"))?;
        self.send_command("WFMOutpre:BYT_Nr 2")?;

        let record_length = self.query_record_length()?;
        self.send_command("DATa:STARt 1")?;
        self.send_command(&format!("DATa:STOP {record_length}"))?;
        self.send_command("DATa:WIDth 2")?;

        let preamble: Preamble = self.query("WFMOutpre?")?.parse()?;
        log::debug!(
            "{}: {} samples, {} s/sample, {} V/level",
            channel,
            preamble.record_length,
            preamble.x_increment,
            preamble.y_scale
        );

        let context = AcquisitionContext { channel, preamble };
        let voltage = self.capture(&context)?;
        let waveform = Waveform::new(time_axis(&context.preamble), voltage);

        Ok(Acquisition { waveform, context })
    }

    /// Read one more record with the transfer set up by an earlier fetch.
    #[tracing::instrument(skip_all, fields(channel = %context.channel))]
    pub fn capture(&mut self, context: &AcquisitionContext) -> Result<Vec<f64>, TekScopeError> {
        let raw = recycled(&mut self.channel, |c| {
            c.query_binary_block("CURVe?", BlockFormat::RIBINARY_16)
        })?;

        let expected = context.preamble.record_length;
        if raw.len() != expected {
            return Err(TekScopeError::SampleCountMismatch {
                expected,
                actual: raw.len(),
            });
        }

        Ok(scale_samples(&raw, context.preamble.y_scale))
    }

    /// Number of captures `average` takes for a requested count.
    pub fn rounded_average_count(&self, averages: u32) -> Result<u32, TekScopeError> {
        let max = self.config.max_averages;
        averages
            .max(1)
            .checked_next_power_of_two()
            .filter(|&rounded| rounded <= max)
            .ok_or(TekScopeError::AveragingCountTooLarge {
                requested: averages,
                max,
            })
    }

    /// Average `averages` captures of `channel`, rounded up to a power of two.
    ///
    /// The instrument cannot hand out raw data while averaging in hardware,
    /// so this takes one [`fetch`](Self::fetch) and then repeats single
    /// captures, each a full round trip plus a session recycle. Expect it to
    /// be slow for large counts.
    #[tracing::instrument(skip(self))]
    pub fn average(
        &mut self,
        channel: ScopeChannel,
        averages: u32,
    ) -> Result<Waveform, TekScopeError> {
        let repetitions = self.rounded_average_count(averages)?;

        let Acquisition { waveform, context } = self.fetch(channel)?;
        let mut rows = Vec::with_capacity(repetitions as usize);
        rows.push(waveform.voltage);

        for _ in 1..repetitions {
            rows.push(self.capture(&context)?);
        }

        log::debug!("Averaged {} captures of {}", rows.len(), channel);
        Ok(Waveform::new(waveform.time, mean_rows(&rows)))
    }
}

impl<C: InstrumentChannel> fmt::Display for TekScope<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "This is a {} {} oscilloscope", self.manufacturer, self.model)
    }
}
