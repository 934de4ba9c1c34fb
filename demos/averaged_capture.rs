// Averaged capture example
//
// Configures timebase, channel and trigger, then takes a software averaged
// capture and a single raw capture of the same channel. Pass `--mock` to run
// against a scripted instrument.

use clap::Parser;
use polars::prelude::*;
use std::time::Duration;
use tekscope_rs::{
    InstrumentChannel, MockChannel, ScopeChannel, ScopeConfig, SerialSettings, TekScope,
    Waveform,
};

#[derive(Parser)]
#[command(name = "averaged_capture")]
#[command(about = "Average repeated captures of one DPO2000 channel")]
struct Args {
    /// Resource to connect to, e.g. ASRL/dev/ttyACM0::INSTR (first found if omitted)
    resource: Option<String>,

    #[arg(short, long, default_value = "CH2", help = "Channel to capture (CH1 to CH4)")]
    channel: ScopeChannel,

    #[arg(short, long, default_value_t = 8, help = "Number of captures, rounded up to a power of two")]
    averages: u32,

    #[arg(long, help = "Use a scripted instrument instead of real hardware")]
    mock: bool,

    #[arg(short, long, help = "Show debug information and detailed logs")]
    verbose: bool,
}

const SETUP: [&str; 13] = [
    "HORizontal:SCAle 4e-6",
    "HORizontal:DELay:TIMe 16e-6",
    "SELect:CH1 0",
    "SELect:CH3 0",
    "SELect:CH4 0",
    "SELect:CH2 1",
    "CH2:PROBE:GAIN 1",
    "CH2:SCAle 2",
    "CH2:POSition 0",
    "TRIGger:A:Type EDGE",
    "TRIGger:A:EDGE:SOUrce CH4",
    "TRIGger:A:MODe NORMal",
    "TRIGger:A:LEVel 2",
];

fn run<C: InstrumentChannel>(
    mut scope: TekScope<C>,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{scope}\n");

    for command in SETUP {
        scope.send_command(command)?;
    }

    println!("Averaging {} captures of {}, this takes a while...", args.averages, args.channel);
    let averaged = scope.average(args.channel, args.averages)?;
    print_summary("averaged", &averaged)?;

    let acquisition = scope.fetch(args.channel)?;
    print_summary("raw", &acquisition.waveform)?;

    Ok(())
}

fn print_summary(label: &str, waveform: &Waveform) -> Result<(), Box<dyn std::error::Error>> {
    let summary = waveform
        .to_dataframe()?
        .lazy()
        .select([
            col("time").min().alias("t_start"),
            col("time").max().alias("t_end"),
            col("voltage").min().alias("v_min"),
            col("voltage").max().alias("v_max"),
            col("voltage").mean().alias("v_mean"),
        ])
        .collect()?;

    println!("{label}: {} samples", waveform.len());
    println!("{summary}");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    if args.mock {
        let samples = (0..2000)
            .map(|i| ((f64::from(i) / 100.0).sin() * 20_000.0) as i16)
            .collect();
        let channel = MockChannel::dpo2014(samples, 4e-9, 8e-5);
        let config = ScopeConfig::default().with_mode_settle_delay(Duration::ZERO);
        run(TekScope::with_config(channel, config)?, &args)
    } else {
        let scope = TekScope::connect(
            args.resource.as_deref(),
            SerialSettings::default(),
            ScopeConfig::default(),
        )?;
        run(scope, &args)
    }
}
