use anyhow::{anyhow, Result};
use clap::ArgMatches;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    api::{sinks::StdoutSink, traits::StateSink},
    engine::{spawn_engine, EngineHandle},
    runtime::PortRuntimeHandle,
    state::{keys, StateValue},
    utils::ports::list_ports,
};

/// Handle `--list-ports`. Returns true when the flag was given.
pub fn run_one_shot_actions(matches: &ArgMatches) -> Result<bool> {
    if !matches.get_flag("list-ports") {
        return Ok(false);
    }

    let ports = list_ports()?;
    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&ports)?);
    } else {
        for p in &ports {
            println!("{p_port}", p_port = p.path);
        }
    }
    Ok(true)
}

/// Poll the configured sensor until Ctrl-C or end of stdin.
///
/// Every stdin line of the form `key=value` is handed to the engine as an
/// unacknowledged change, e.g. `mode=1` or `onPeriodData=true`.
pub async fn run_poller(matches: &ArgMatches) -> Result<()> {
    let config = super::config_from_matches(matches)?;
    let sink = StdoutSink::new(matches.get_flag("json"));
    sink.set_value(keys::CONNECTION, false.into(), true)?;

    let port = config.require_port()?.to_string();
    let (transport, events) = PortRuntimeHandle::spawn(&port, &config)?;
    let engine = spawn_engine(&config, transport, events, sink);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
            _ = engine.finished() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => forward_line(&engine, &line),
                Ok(None) => {
                    log::info!("stdin closed");
                    break;
                }
                Err(err) => {
                    log::warn!("Failed to read stdin: {err}");
                    break;
                }
            },
        }
    }

    engine.stop();
    engine.join().await
}

fn forward_line(engine: &EngineHandle, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match parse_change_line(line) {
        Ok((id, value)) => {
            if let Err(err) = engine.change(id, value, false) {
                log::warn!("{err}");
            }
        }
        Err(err) => log::warn!("{err}"),
    }
}

/// Split a `key=value` line into a state id and value.
pub fn parse_change_line(line: &str) -> Result<(&str, StateValue)> {
    let (id, value) = line
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected `key=value`, got {line:?}"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(anyhow!("Missing key in {line:?}"));
    }
    Ok((id, StateValue::parse(value.trim())))
}
