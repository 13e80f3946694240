pub mod actions;

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

use crate::config::AdapterConfig;

/// Build the command line definition.
pub fn command() -> Command {
    Command::new("omnicomm-lls")
        .about("Poll an Omnicomm LLS fuel level sensor over a serial line")
        .arg(
            Arg::new("list-ports")
                .long("list-ports")
                .short('l')
                .help("List all available serial ports and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .short('j')
                .help("Print port listings and state values as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Load settings from a .toml or .json file")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .help("Serial port the sensor is attached to")
                .value_name("PORT"),
        )
        .arg(
            Arg::new("baud-rate")
                .long("baud-rate")
                .help("Serial port baud rate")
                .value_name("BAUD")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("address")
                .long("address")
                .short('a')
                .help("Bus address of the sensor")
                .value_name("ADDR")
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("poll-interval")
                .long("poll-interval")
                .help("Milliseconds between two polls (0 = default)")
                .value_name("MS")
                .value_parser(clap::value_parser!(u64)),
        )
}

/// Parse command line arguments and return ArgMatches.
pub fn parse_args() -> ArgMatches {
    command().get_matches()
}

/// Settings from `--config` (or defaults), overridden by explicit flags.
pub fn config_from_matches(matches: &ArgMatches) -> Result<AdapterConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => AdapterConfig::from_file(path)?,
        None => AdapterConfig::default(),
    };
    if let Some(port) = matches.get_one::<String>("port") {
        config.port = Some(port.clone());
    }
    if let Some(&baud_rate) = matches.get_one::<u32>("baud-rate") {
        config.baud_rate = baud_rate;
    }
    if let Some(&address) = matches.get_one::<u8>("address") {
        config.address = address;
    }
    if let Some(&ms) = matches.get_one::<u64>("poll-interval") {
        config.poll_interval_ms = ms;
    }
    Ok(config)
}
