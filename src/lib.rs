//! # TekScope RS
//!
//! A Rust library for acquiring calibrated waveforms from Tektronix DPO2000
//! series oscilloscopes over a SCPI instrument link.
//!
//! ## Features
//!
//! - **Typed SCPI messages**: commands and `?`-terminated queries are distinct types
//! - **Waveform capture**: binary `CURVe?` transfers decoded into seconds and volts
//! - **Software averaging**: repeated captures averaged on the host, since the
//!   instrument will not hand out raw data while averaging in hardware
//! - **Session recycling**: every query closes and reopens the session, which the
//!   DPO2000 firmware needs to answer the next one
//! - **DataFrame output**: waveforms convert to `polars` frames
//!
//! ## Examples
//!
//! ### Connecting and configuring
//!
//! ```rust,no_run
//! use tekscope_rs::{ScopeConfig, SerialSettings, TekScope};
//!
//! // Connect to the first instrument found
//! let mut scope = TekScope::connect(None, SerialSettings::default(), ScopeConfig::default())?;
//! println!("{}", scope.query("*IDN?")?);
//!
//! scope.send_command("HORizontal:SCAle 4e-6")?;
//! scope.send_command("SELect:CH2 1")?;
//! scope.send_command("CH2:SCAle 2")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Averaging against a scripted instrument
//!
//! ```rust
//! use std::time::Duration;
//! use tekscope_rs::{MockChannel, ScopeChannel, ScopeConfig, TekScope};
//!
//! let channel = MockChannel::dpo2014(vec![0, 500, -500], 1e-9, 0.002);
//! let config = ScopeConfig::default().with_mode_settle_delay(Duration::ZERO);
//! let mut scope = TekScope::with_config(channel, config)?;
//!
//! // 3 is rounded up to 4 captures
//! let averaged = scope.average(ScopeChannel::Ch2, 3)?;
//! assert_eq!(averaged.voltage, vec![0.0, 1.0, -1.0]);
//! assert_eq!(scope.channel().binary_query_count(), 4);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Reusing a fetch
//!
//! ```rust
//! use std::time::Duration;
//! use tekscope_rs::{MockChannel, ScopeChannel, ScopeConfig, TekScope};
//!
//! let channel = MockChannel::dpo2014(vec![100, 200], 4e-9, 1e-3);
//! let config = ScopeConfig::default().with_mode_settle_delay(Duration::ZERO);
//! let mut scope = TekScope::with_config(channel, config)?;
//!
//! let acquisition = scope.fetch(ScopeChannel::Ch1)?;
//! let again = scope.capture(&acquisition.context)?;
//! assert_eq!(again.len(), acquisition.waveform.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod channel_connector;
pub mod config;
pub mod instrument_channel;
pub mod mock_channel;
pub mod preamble;
pub mod serial_channel;
pub mod tek_scope;
pub mod waveform;

// Re-export the main types for convenience
pub use instrument_channel::{
    BlockFormat, ChannelError, Command, InstrumentChannel, Query, ScpiError, ScpiMessage,
};

pub use channel_connector::{ChannelConnector, InstrumentResource};

pub use config::{ScopeConfig, SerialSettings};

pub use mock_channel::{Interaction, MockChannel};

pub use preamble::{Preamble, PreambleError};

pub use serial_channel::SerialChannel;

pub use tek_scope::{Acquisition, AcquisitionContext, ScopeChannel, TekScope, TekScopeError};

pub use waveform::Waveform;
