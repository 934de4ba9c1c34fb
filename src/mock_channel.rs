//! Scriptable in-memory [`InstrumentChannel`] for tests and demos.
//!
//! Replies are looked up by the exact query text. When more than one reply
//! is queued for a query they are served in order and the last one is
//! repeated from then on; binary blocks behave the same way. Every call that
//! reaches the channel is recorded as an [`Interaction`].

use crate::instrument_channel::{BlockFormat, ChannelError, InstrumentChannel};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Write(String),
    Query(String),
    QueryBinaryBlock(String),
    Close,
    Reopen,
}

#[derive(Debug)]
pub struct MockChannel {
    replies: HashMap<String, VecDeque<String>>,
    blocks: VecDeque<Vec<i16>>,
    failures: HashSet<String>,
    interactions: Vec<Interaction>,
    open: bool,
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChannel {
    pub const IDENTITY: &'static str = "TEKTRONIX,DPO2014,0,CF:91.1CT FV:v1.52 DPO2.000";

    /// An open channel with nothing scripted.
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            blocks: VecDeque::new(),
            failures: HashSet::new(),
            interactions: Vec::new(),
            open: true,
        }
    }

    /// A DPO2014 in sample mode whose every capture returns `samples`.
    pub fn dpo2014(samples: Vec<i16>, x_increment: f64, y_scale: f64) -> Self {
        let record_length = samples.len();
        Self::new()
            .with_reply("*IDN?", Self::IDENTITY)
            .with_reply("ACQuire:MODe?", "SAMPLE")
            .with_reply("WFMOutpre:RECOrdlength?", record_length.to_string())
            .with_reply(
                "WFMOutpre?",
                Self::preamble_reply(record_length, x_increment, 0.0, y_scale),
            )
            .with_block(samples)
    }

    /// A `WFMOutpre?` reply for a 16-bit `RIBinary` transfer.
    pub fn preamble_reply(
        record_length: usize,
        x_increment: f64,
        x_offset: f64,
        y_scale: f64,
    ) -> String {
        format!(
            "2;16;BIN;RI;MSB;\"Ch1, DC coupling, 1.0E+0 V/div, 1.0E-6 s/div, {record_length} points, Sample mode\";\
             {record_length};Y;\"s\";{x_increment:e};{x_offset:e};0;\"V\";{y_scale:e};0.0E+0;0.0E+0;\
             SINGULAR_YT;{record_length};200.0E+6"
        )
    }

    /// Queue a reply for `query`.
    pub fn with_reply(mut self, query: &str, reply: impl Into<String>) -> Self {
        self.replies
            .entry(query.to_string())
            .or_default()
            .push_back(reply.into());
        self
    }

    /// Queue a binary block for the next `CURVe?`-style query.
    pub fn with_block(mut self, samples: Vec<i16>) -> Self {
        self.blocks.push_back(samples);
        self
    }

    /// Make `message` fail as if the instrument had dropped off the bus.
    pub fn fail_on(mut self, message: &str) -> Self {
        self.failures.insert(message.to_string());
        self
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn clear_interactions(&mut self) {
        self.interactions.clear();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn count(&self, kind: fn(&Interaction) -> bool) -> usize {
        self.interactions.iter().filter(|i| kind(i)).count()
    }

    pub fn close_count(&self) -> usize {
        self.count(|i| matches!(i, Interaction::Close))
    }

    pub fn reopen_count(&self) -> usize {
        self.count(|i| matches!(i, Interaction::Reopen))
    }

    pub fn binary_query_count(&self) -> usize {
        self.count(|i| matches!(i, Interaction::QueryBinaryBlock(_)))
    }

    fn check(&self, message: &str) -> Result<(), ChannelError> {
        if !self.open {
            return Err(ChannelError::SessionClosed);
        }
        if self.failures.contains(message) {
            return Err(ChannelError::Unreachable {
                resource: "mock".to_string(),
            });
        }
        Ok(())
    }

    fn next_from<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

fn no_reply(message: &str) -> ChannelError {
    ChannelError::Io(std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        format!("no reply scripted for {message}"),
    ))
}

impl InstrumentChannel for MockChannel {
    fn write(&mut self, command: &str) -> Result<(), ChannelError> {
        self.check(command)?;
        self.interactions.push(Interaction::Write(command.to_string()));
        Ok(())
    }

    fn query(&mut self, query: &str) -> Result<String, ChannelError> {
        self.check(query)?;
        self.interactions.push(Interaction::Query(query.to_string()));
        self.replies
            .get_mut(query)
            .and_then(Self::next_from)
            .ok_or_else(|| no_reply(query))
    }

    fn query_binary_block(
        &mut self,
        query: &str,
        format: BlockFormat,
    ) -> Result<Vec<i16>, ChannelError> {
        self.check(query)?;
        if format.word_width != 2 {
            return Err(ChannelError::UnsupportedWordWidth {
                width: format.word_width,
            });
        }
        self.interactions
            .push(Interaction::QueryBinaryBlock(query.to_string()));
        Self::next_from(&mut self.blocks).ok_or_else(|| no_reply(query))
    }

    fn close(&mut self) -> Result<(), ChannelError> {
        self.interactions.push(Interaction::Close);
        self.open = false;
        Ok(())
    }

    fn reopen(&mut self) -> Result<(), ChannelError> {
        self.interactions.push(Interaction::Reopen);
        self.open = true;
        Ok(())
    }
}
