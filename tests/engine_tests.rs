use anyhow::{anyhow, Result};
use bytes::Bytes;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use omnicomm_lls::{
    api::{sinks::MemoryStateStore, traits::Transport},
    config::AdapterConfig,
    engine::spawn_engine,
    runtime::RuntimeEvent,
    state::{keys, StateValue},
};

const READING_FRAME: [u8; 9] = [0x3E, 0x03, 0x06, 0x30, 0x10, 0x20, 0x20, 0x30, 0xE7];
const WAIT: Duration = Duration::from_secs(2);

/// Transport double that reports every written frame on a channel
struct MockTransport {
    written: flume::Sender<Vec<u8>>,
    closes: Arc<AtomicUsize>,
    fail_writes: bool,
}

impl Transport for MockTransport {
    fn write(&self, frame: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(anyhow!("port unplugged"));
        }
        self.written
            .send(frame.to_vec())
            .map_err(|_| anyhow!("test ended"))
    }

    fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    written: flume::Receiver<Vec<u8>>,
    events: flume::Sender<RuntimeEvent>,
    closes: Arc<AtomicUsize>,
    store: Arc<MemoryStateStore>,
    engine: omnicomm_lls::EngineHandle,
}

fn start(poll_interval_ms: u64, fail_writes: bool) -> Harness {
    let config = AdapterConfig {
        address: 3,
        poll_interval_ms,
        ..Default::default()
    };
    let (written_tx, written) = flume::unbounded();
    let (events, events_rx) = flume::unbounded();
    let closes = Arc::new(AtomicUsize::new(0));
    let store = Arc::new(MemoryStateStore::new());
    let transport = MockTransport {
        written: written_tx,
        closes: Arc::clone(&closes),
        fail_writes,
    };
    let engine = spawn_engine(&config, transport, events_rx, Arc::clone(&store));
    Harness {
        written,
        events,
        closes,
        store,
        engine,
    }
}

async fn next_write(h: &Harness) -> Vec<u8> {
    tokio::time::timeout(WAIT, h.written.recv_async())
        .await
        .expect("no frame written in time")
        .expect("transport dropped")
}

async fn wait_for(store: &MemoryStateStore, key: &str, expected: StateValue) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while store.get(key).as_ref() != Some(&expected) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "{key} never became {expected}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_first_poll_requests_device_info() -> Result<()> {
    let h = start(20, false);

    assert_eq!(next_write(&h).await, vec![0x31, 0x03, 0x10, 0xBD]);
    assert_eq!(next_write(&h).await, vec![0x31, 0x03, 0x06, 0xFD]);
    assert_eq!(next_write(&h).await, vec![0x31, 0x03, 0x06, 0xFD]);
    assert_eq!(h.store.get(keys::CONNECTION), Some(StateValue::Bool(true)));

    h.engine.stop();
    h.engine.join().await
}

#[tokio::test]
async fn test_received_reading_is_published() -> Result<()> {
    let h = start(60_000, false);

    h.events
        .send(RuntimeEvent::FrameReceived(Bytes::from_static(&READING_FRAME)))?;
    wait_for(&h.store, keys::LEVEL, StateValue::Float(18.0)).await;
    assert_eq!(h.store.get(keys::TEMPERATURE), Some(StateValue::Int(48)));
    assert_eq!(h.store.get(keys::RELATIVE_LEVEL), Some(StateValue::Int(8208)));
    assert_eq!(h.store.is_acknowledged(keys::LEVEL), Some(true));

    h.engine.stop();
    h.engine.join().await
}

#[tokio::test]
async fn test_user_change_is_written_immediately() -> Result<()> {
    let h = start(60_000, false);

    h.engine.change("omnicomm-lls.0.mode", StateValue::Int(5), false)?;
    assert_eq!(next_write(&h).await, vec![0x31, 0x03, 0x17, 0x02, 0x1D]);

    h.engine.change("filter", StateValue::Int(20), false)?;
    assert_eq!(next_write(&h).await, vec![0x31, 0x03, 0x0E, 0x14, 0x03]);

    // Acknowledged values come from the sensor and are not echoed back
    h.engine.change("interval", StateValue::Int(9), true)?;
    h.engine.change("onPeriodData", StateValue::Bool(true), false)?;
    assert_eq!(next_write(&h).await, vec![0x31, 0x03, 0x07, 0xA3]);

    h.engine.stop();
    h.engine.join().await
}

#[tokio::test]
async fn test_stop_is_idempotent_and_closes_transport() -> Result<()> {
    let h = start(60_000, false);

    h.engine.stop();
    h.engine.stop();
    tokio::time::timeout(WAIT, h.engine.finished()).await?;
    assert!(h.engine.change("mode", StateValue::Int(1), false).is_err());
    h.engine.stop();
    h.engine.join().await?;

    assert_eq!(h.closes.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.get(keys::CONNECTION), Some(StateValue::Bool(false)));
    assert!(h.written.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_transport_stop_ends_engine() -> Result<()> {
    let h = start(60_000, false);

    h.events.send(RuntimeEvent::Stopped)?;
    tokio::time::timeout(WAIT, h.engine.finished()).await?;
    h.engine.join().await?;

    assert_eq!(h.closes.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.get(keys::CONNECTION), Some(StateValue::Bool(false)));
    Ok(())
}

#[tokio::test]
async fn test_transport_error_marks_disconnected() -> Result<()> {
    let h = start(20, false);

    assert_eq!(next_write(&h).await[2], 0x10);
    h.events.send(RuntimeEvent::Error("read error".into()))?;
    wait_for(&h.store, keys::CONNECTION, StateValue::Bool(false)).await;

    // Polling carries on
    assert_eq!(next_write(&h).await[2], 0x06);

    h.engine.stop();
    h.engine.join().await
}

#[tokio::test]
async fn test_repeated_errors_publish_one_flag() -> Result<()> {
    let h = start(60_000, false);

    h.events.send(RuntimeEvent::Error("read error".into()))?;
    h.events.send(RuntimeEvent::Error("read error".into()))?;
    h.events.send(RuntimeEvent::Stopped)?;
    tokio::time::timeout(WAIT, h.engine.finished()).await?;
    h.engine.join().await?;

    let flags: Vec<_> = h
        .store
        .history()
        .into_iter()
        .filter(|update| update.key == keys::CONNECTION)
        .map(|update| update.value)
        .collect();
    assert_eq!(flags, vec![StateValue::Bool(true), StateValue::Bool(false)]);
    Ok(())
}

#[tokio::test]
async fn test_new_connection_requests_device_info_again() -> Result<()> {
    let first = start(20, false);
    assert_eq!(next_write(&first).await[2], 0x10);
    assert_eq!(next_write(&first).await[2], 0x06);
    first.engine.stop();
    first.engine.join().await?;

    let second = start(20, false);
    assert_eq!(next_write(&second).await, vec![0x31, 0x03, 0x10, 0xBD]);
    assert_eq!(next_write(&second).await, vec![0x31, 0x03, 0x06, 0xFD]);

    second.engine.stop();
    second.engine.join().await
}

#[tokio::test]
async fn test_failed_write_marks_disconnected() -> Result<()> {
    let h = start(10, true);

    wait_for(&h.store, keys::CONNECTION, StateValue::Bool(false)).await;
    assert!(!h.engine.is_finished());

    h.engine.stop();
    h.engine.join().await
}
