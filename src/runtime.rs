use anyhow::{anyhow, Result};
use flume::{Receiver, Sender};
use serialport::{DataBits, Parity, SerialPort, StopBits};
use std::{
    io::{Read, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crate::{api::traits::Transport, config::AdapterConfig};

/// Read timeout of the port; bounds how long a queued write can wait.
const READ_TIMEOUT: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramingConfig {
    /// Line silence that completes a frame
    pub gap: Duration,
    /// Buffer size at which a frame is emitted without waiting for silence
    pub max_frame_size: usize,
}

impl From<&AdapterConfig> for FramingConfig {
    fn from(cfg: &AdapterConfig) -> Self {
        Self {
            gap: cfg.frame_gap(),
            max_frame_size: cfg.max_frame_size.max(1),
        }
    }
}

#[derive(Debug)]
pub enum RuntimeCommand {
    Write(Vec<u8>),
    Stop,
}

#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    FrameReceived(bytes::Bytes),
    FrameSent(bytes::Bytes),
    Error(String),
    Stopped,
}

/// Handle to the I/O thread that owns one serial port
#[derive(Clone)]
pub struct PortRuntimeHandle {
    pub port_name: String,
    cmd_tx: Sender<RuntimeCommand>,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for PortRuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortRuntimeHandle")
            .field("port_name", &self.port_name)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl PortRuntimeHandle {
    /// Open `port_name` (8N1) and start its I/O thread.
    ///
    /// Returns the handle and the receiving side of the event channel.
    pub fn spawn(port_name: &str, cfg: &AdapterConfig) -> Result<(Self, Receiver<RuntimeEvent>)> {
        let handle = serialport::new(port_name, cfg.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|err| anyhow!("Failed to open port {port_name}: {err}"))?;
        log::info!("Opened {port_name} at {} baud", cfg.baud_rate);
        Ok(Self::from_existing(port_name, handle, FramingConfig::from(cfg)))
    }

    /// Start an I/O thread on an already opened port.
    pub fn from_existing(
        port_name: &str,
        serial: Box<dyn SerialPort>,
        framing: FramingConfig,
    ) -> (Self, Receiver<RuntimeEvent>) {
        let (cmd_tx, cmd_rx) = flume::unbounded();
        let (evt_tx, evt_rx) = flume::unbounded();
        thread::spawn(move || run_loop(serial, framing, cmd_rx, evt_tx));
        let handle = Self {
            port_name: port_name.to_string(),
            cmd_tx,
            closed: Arc::new(AtomicBool::new(false)),
        };
        (handle, evt_rx)
    }
}

impl Transport for PortRuntimeHandle {
    fn write(&self, frame: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(anyhow!("Port {} is closed", self.port_name));
        }
        self.cmd_tx
            .send(RuntimeCommand::Write(frame.to_vec()))
            .map_err(|_| anyhow!("I/O thread of {} has exited", self.port_name))
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // The thread may already be gone after a fatal error
        let _ = self.cmd_tx.send(RuntimeCommand::Stop);
        Ok(())
    }
}

fn run_loop(
    mut serial: Box<dyn SerialPort>,
    framing: FramingConfig,
    cmd_rx: Receiver<RuntimeCommand>,
    evt_tx: Sender<RuntimeEvent>,
) {
    let mut assembler = FrameAssembler::new(framing);
    let mut buf = [0u8; 256];
    loop {
        loop {
            match cmd_rx.try_recv() {
                Ok(RuntimeCommand::Write(bytes)) => {
                    match serial.write_all(&bytes).and_then(|_| serial.flush()) {
                        Ok(()) => {
                            let _ = evt_tx.send(RuntimeEvent::FrameSent(bytes.into()));
                        }
                        Err(e) => {
                            let _ =
                                evt_tx.send(RuntimeEvent::Error(format!("write error: {e}")));
                        }
                    }
                }
                Ok(RuntimeCommand::Stop) | Err(flume::TryRecvError::Disconnected) => {
                    // Partially assembled input is abandoned
                    let _ = evt_tx.send(RuntimeEvent::Stopped);
                    return;
                }
                Err(flume::TryRecvError::Empty) => break,
            }
        }

        let now = Instant::now();
        match serial.read(&mut buf) {
            Ok(n) if n > 0 => {
                for frame in assembler.push(&buf[..n], now) {
                    let _ = evt_tx.send(RuntimeEvent::FrameReceived(frame));
                }
            }
            Ok(_) => {}
            Err(e) if !is_fatal_read_error(&e) => {}
            Err(e) => {
                // Device gone, e.g. adapter unplugged
                let _ = evt_tx.send(RuntimeEvent::Error(format!("read error: {e}")));
                let _ = evt_tx.send(RuntimeEvent::Stopped);
                return;
            }
        }
        if let Some(frame) = assembler.poll_gap(Instant::now()) {
            let _ = evt_tx.send(RuntimeEvent::FrameReceived(frame));
        }
    }
}

fn is_fatal_read_error(err: &std::io::Error) -> bool {
    !matches!(
        err.kind(),
        std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::Interrupted
    )
}

/// Splits a byte stream into frames on line silence.
#[derive(Debug)]
pub struct FrameAssembler {
    framing: FramingConfig,
    assembling: Vec<u8>,
    last_byte: Option<Instant>,
}

impl FrameAssembler {
    pub fn new(framing: FramingConfig) -> Self {
        Self {
            assembling: Vec::with_capacity(framing.max_frame_size),
            framing,
            last_byte: None,
        }
    }

    /// Append received bytes; returns frames completed by the size limit.
    pub fn push(&mut self, data: &[u8], now: Instant) -> Vec<bytes::Bytes> {
        let mut frames = Vec::new();
        for &b in data {
            self.assembling.push(b);
            if self.assembling.len() >= self.framing.max_frame_size {
                frames.push(self.take());
            }
        }
        if !self.assembling.is_empty() {
            self.last_byte = Some(now);
        }
        frames
    }

    /// Emit the pending bytes once the line has been silent for the gap.
    pub fn poll_gap(&mut self, now: Instant) -> Option<bytes::Bytes> {
        let last = self.last_byte?;
        if self.assembling.is_empty() || now.duration_since(last) < self.framing.gap {
            return None;
        }
        Some(self.take())
    }

    fn take(&mut self) -> bytes::Bytes {
        self.last_byte = None;
        bytes::Bytes::from(std::mem::take(&mut self.assembling))
    }
}
