use std::fmt;

/// Synchronous link to a single instrument.
///
/// Every call is a blocking round trip. Implementations own whatever
/// resource handle backs the link and must be able to drop and re-acquire
/// it through [`close`](InstrumentChannel::close) and
/// [`reopen`](InstrumentChannel::reopen).
pub trait InstrumentChannel {
    /// Send a command without waiting for a reply.
    fn write(&mut self, command: &str) -> Result<(), ChannelError>;

    /// Send a query and return the textual reply with line terminators removed.
    fn query(&mut self, query: &str) -> Result<String, ChannelError>;

    /// Send a query whose reply is a definite-length binary block of signed samples.
    fn query_binary_block(
        &mut self,
        query: &str,
        format: BlockFormat,
    ) -> Result<Vec<i16>, ChannelError>;

    fn close(&mut self) -> Result<(), ChannelError>;

    fn reopen(&mut self) -> Result<(), ChannelError>;
}

/// Layout of the samples inside a binary block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockFormat {
    pub big_endian: bool,
    pub word_width: usize,
}

impl BlockFormat {
    /// `RIBinary` with `DATa:WIDth 2`: signed, big-endian, two bytes per sample.
    pub const RIBINARY_16: Self = Self {
        big_endian: true,
        word_width: 2,
    };

    /// Decode a raw payload into samples.
    pub fn decode(self, payload: &[u8]) -> Result<Vec<i16>, ChannelError> {
        if self.word_width != 2 {
            return Err(ChannelError::UnsupportedWordWidth {
                width: self.word_width,
            });
        }
        if payload.len() % 2 != 0 {
            return Err(ChannelError::MalformedBlock(format!(
                "payload of {} bytes is not a whole number of 2-byte samples",
                payload.len()
            )));
        }

        Ok(payload
            .chunks_exact(2)
            .map(|pair| {
                let bytes = [pair[0], pair[1]];
                if self.big_endian {
                    i16::from_be_bytes(bytes)
                } else {
                    i16::from_le_bytes(bytes)
                }
            })
            .collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Malformed binary block: {0}")]
    MalformedBlock(String),

    #[error("Unsupported sample width of {width} bytes")]
    UnsupportedWordWidth { width: usize },

    #[error("Session is closed")]
    SessionClosed,

    #[error("No instrument resource found. Please connect an instrument or specify the resource manually")]
    NoResourceFound,

    #[error("Instrument {resource} is unreachable")]
    Unreachable { resource: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScpiError {
    #[error("'{command}' cannot be sent as a command")]
    InvalidCommand { command: String },

    #[error("Query '{query}' must finish with ?")]
    InvalidQuery { query: String },
}

const QUERY_TERMINATOR: char = '?';

fn is_issuable(text: &str) -> bool {
    !text.trim().is_empty() && text.chars().all(|c| c.is_ascii() && c != '\n' && c != '\r')
}

/// A SCPI program message that produces no reply, e.g. `SELect:CH2 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(String);

impl Command {
    pub fn new(text: impl Into<String>) -> Result<Self, ScpiError> {
        let text = text.into();
        if !is_issuable(&text) || text.trim_end().ends_with(QUERY_TERMINATOR) {
            return Err(ScpiError::InvalidCommand { command: text });
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A SCPI query, always terminated by `?`, e.g. `WFMOutpre?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn new(text: impl Into<String>) -> Result<Self, ScpiError> {
        let text = text.into();
        if !is_issuable(&text) || !text.ends_with(QUERY_TERMINATOR) {
            return Err(ScpiError::InvalidQuery { query: text });
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Either kind of message, for callers that build message lists up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScpiMessage {
    Command(Command),
    Query(Query),
}

impl ScpiMessage {
    /// Classify raw text by its terminator.
    pub fn parse(text: &str) -> Result<Self, ScpiError> {
        if text.ends_with(QUERY_TERMINATOR) {
            Query::new(text).map(ScpiMessage::Query)
        } else {
            Command::new(text).map(ScpiMessage::Command)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ScpiMessage::Command(c) => c.as_str(),
            ScpiMessage::Query(q) => q.as_str(),
        }
    }
}

impl From<Command> for ScpiMessage {
    fn from(command: Command) -> Self {
        ScpiMessage::Command(command)
    }
}

impl From<Query> for ScpiMessage {
    fn from(query: Query) -> Self {
        ScpiMessage::Query(query)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
