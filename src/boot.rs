use chrono::Local;
use log::LevelFilter;
use std::io::{self, Write};

use env_logger::{Builder, Target};

/// Environment variable naming a file that receives a copy of every log line
pub const LOG_FILE_ENV: &str = "LLS_LOG_FILE";

/// Multi-writer for logging to both file and stderr
struct DualWriter {
    file: std::fs::File,
    stderr: io::Stderr,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        self.stderr.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.stderr.flush()?;
        Ok(())
    }
}

/// Install the global logger.
///
/// Stdout carries published state values, so log lines always go to stderr.
pub fn init_logger() {
    match std::env::var(LOG_FILE_ENV) {
        Ok(path) if !path.trim().is_empty() => {
            if let Err(err) = init_dual_logger(&path) {
                eprintln!("Failed to initialize file logger at '{path}': {err}");
                init_stderr_logger();
            }
        }
        _ => init_stderr_logger(),
    }
}

fn init_stderr_logger() {
    // A second init (e.g. from tests) is not an error worth reporting
    let _ = Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .target(Target::Stderr)
        .try_init();
}

fn init_dual_logger(path: &str) -> io::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let dual_writer = DualWriter {
        file,
        stderr: io::stderr(),
    };

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} {} [{}] - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(dual_writer)))
        .filter_level(LevelFilter::Debug)
        .parse_default_env();
    if builder.try_init().is_err() {
        return Ok(());
    }

    log::info!("File logger initialized at {path}");

    Ok(())
}
