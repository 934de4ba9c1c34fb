// Basic discovery and connection example
//
// Lists serial resources, connects to one and prints the instrument identity.

use tekscope_rs::{ChannelConnector, ScopeConfig, SerialSettings, TekScope};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("TekScope Discovery Example");
    println!("==========================\n");

    println!("1. Discovering serial resources...");
    let resources = ChannelConnector::get_available_resources()?;

    if resources.is_empty() {
        println!("No resources found. Please connect an oscilloscope and try again.");
        return Ok(());
    }

    for (i, resource) in resources.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, resource.port, resource.description);
    }
    println!();

    println!("2. Connecting to first available resource...");
    let identifier = std::env::args().nth(1);
    let mut scope = TekScope::connect(
        identifier.as_deref(),
        SerialSettings::default(),
        ScopeConfig::default(),
    )?;
    println!("{scope}");

    println!("\n3. Identity: {}", scope.query("*IDN?")?);
    println!("   Acquisition mode: {}", scope.query("ACQuire:MODe?")?);

    Ok(())
}
