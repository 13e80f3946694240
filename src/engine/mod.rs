pub mod poller;
pub mod session;

use anyhow::{anyhow, Result};
use flume::{Receiver, Sender};
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

pub use poller::{parse_setting_change, Poller};
pub use session::{PollState, Session};

use crate::{
    api::traits::{StateSink, Transport},
    config::AdapterConfig,
    runtime::RuntimeEvent,
    state::StateValue,
};

/// Messages accepted by a running engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    /// A value was changed in the state store.
    UserChange {
        id: String,
        value: StateValue,
        ack: bool,
    },
    /// Stop polling and close the transport.
    Stop,
}

/// Handle to the task that drives one sensor connection
pub struct EngineHandle {
    cmd_tx: Sender<EngineCommand>,
    done_rx: Receiver<()>,
    task: JoinHandle<()>,
}

impl EngineHandle {
    /// Forward a state change to the engine.
    pub fn change(&self, id: &str, value: StateValue, ack: bool) -> Result<()> {
        self.cmd_tx
            .send(EngineCommand::UserChange {
                id: id.to_string(),
                value,
                ack,
            })
            .map_err(|_| anyhow!("Engine has stopped"))
    }

    /// Request a stop. Further calls, or calls after the engine ended, do nothing.
    pub fn stop(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Stop);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Resolves once the engine has left its loop. Safe to call repeatedly.
    pub async fn finished(&self) {
        let _ = self.done_rx.recv_async().await;
    }

    /// Wait for the engine task to end.
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|err| anyhow!("Engine task failed: {err}"))
    }
}

/// Start the engine for an open transport.
///
/// Timer ticks, received frames and user changes are all handled by one task,
/// each to completion, so sends and decodes never interleave.
pub fn spawn_engine<T, S>(
    config: &AdapterConfig,
    transport: T,
    events: Receiver<RuntimeEvent>,
    sink: S,
) -> EngineHandle
where
    T: Transport + 'static,
    S: StateSink + 'static,
{
    let (cmd_tx, cmd_rx) = flume::unbounded();
    let (done_tx, done_rx) = flume::bounded::<()>(1);
    let poller = Poller::new(config.address, sink);
    let period = config.poll_interval();
    let task = tokio::spawn(async move {
        run_engine(poller, transport, events, cmd_rx, period).await;
        drop(done_tx);
    });
    EngineHandle {
        cmd_tx,
        done_rx,
        task,
    }
}

async fn run_engine<T, S>(
    mut poller: Poller<S>,
    transport: T,
    events: Receiver<RuntimeEvent>,
    cmd_rx: Receiver<EngineCommand>,
    period: std::time::Duration,
) where
    T: Transport,
    S: StateSink,
{
    log::info!(
        "Polling address {} every {:?}",
        poller.session().address(),
        period
    );
    poller.set_connected(true);

    // First tick one full period after the connection opened
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv_async() => match cmd {
                Ok(EngineCommand::UserChange { id, value, ack }) => {
                    if let Some(frame) = poller.on_user_change(&id, &value, ack) {
                        send(&mut poller, &transport, &frame);
                    }
                }
                Ok(EngineCommand::Stop) | Err(_) => {
                    log::info!("Stop requested");
                    break;
                }
            },

            evt = events.recv_async() => match evt {
                Ok(RuntimeEvent::FrameReceived(frame)) => {
                    poller.on_frame(&frame);
                }
                Ok(RuntimeEvent::FrameSent(frame)) => {
                    log::debug!("sent {} bytes", frame.len());
                }
                Ok(RuntimeEvent::Error(err)) => {
                    log::error!("Error: {err}");
                    poller.set_connected(false);
                }
                Ok(RuntimeEvent::Stopped) | Err(_) => {
                    log::info!("Transport stopped");
                    break;
                }
            },

            _ = ticker.tick() => {
                let frame = poller.on_tick();
                send(&mut poller, &transport, &frame);
            }
        }
    }

    if let Err(err) = transport.close() {
        log::warn!("Failed to close transport: {err}");
    }
    poller.set_connected(false);
    log::info!("cleaned everything up...");
}

fn send<T: Transport, S: StateSink>(poller: &mut Poller<S>, transport: &T, frame: &[u8]) {
    if let Err(err) = transport.write(frame) {
        log::error!("Error: {err}");
        poller.set_connected(false);
    }
}
