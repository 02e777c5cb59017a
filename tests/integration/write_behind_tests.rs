//! Slow storage and a slow boiler gateway must not hold up the decision
//! loop: both sit behind writer threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use zonetherm::adapters::outbox::spawn_boiler;
use zonetherm::adapters::store::{MemoryStore, WriteBehindStore};
use zonetherm::app::events::BoilerCommand;
use zonetherm::app::ports::{BoilerPort, PublishError, StorageError, StoragePort};
use zonetherm::context::{Context, NS_CONTROLLER, NS_ZONE};

use crate::mock_ports::{Harness, cmd, config};

const SLOW: Duration = Duration::from_millis(250);

/// Memory store that takes `SLOW` per write, like an fsync on a busy disk.
#[derive(Default)]
struct SlowStore {
    inner: MemoryStore,
    writes: AtomicUsize,
}

impl SlowStore {
    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl StoragePort for SlowStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.inner.read(namespace, key, buf)
    }

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        thread::sleep(SLOW);
        self.inner.write(namespace, key, data)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct SlowBoiler(mpsc::Sender<BoilerCommand>);

impl BoilerPort for SlowBoiler {
    fn publish(&mut self, command: &BoilerCommand) -> Result<(), PublishError> {
        thread::sleep(SLOW);
        self.0
            .send(*command)
            .map_err(|e| PublishError::Transport(e.to_string()))
    }
}

fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn slow_store_does_not_delay_the_boiler_command() {
    let slow = Arc::new(SlowStore::default());
    let store = WriteBehindStore::spawn(slow.clone()).unwrap();
    let mut h = Harness::with_store(&config(&["living"]), Arc::new(store));
    h.start();

    let wall = Instant::now();
    // Outside, room and setpoint are persisted, then the enable flag.
    h.seed_reference(&["living"]);
    h.send("zonetherm/control/enable", "on");
    h.advance_ms(50);
    let elapsed = wall.elapsed();

    assert_eq!(h.last_command(), Some(cmd(51.0, true)));
    assert!(elapsed < SLOW, "decision loop waited on storage for {elapsed:?}");

    wait_until("four background writes", || slow.writes() >= 4);
    let ctx = Context::new(slow.clone());
    assert_eq!(ctx.restore::<f64>(NS_ZONE, "living"), Some(20.0));
    assert_eq!(ctx.restore::<bool>(NS_CONTROLLER, "enabled"), Some(true));
}

#[test]
fn slow_gateway_does_not_stall_the_engine() {
    let (tx, rx) = mpsc::channel();
    let mut boiler = spawn_boiler(SlowBoiler(tx)).unwrap();
    let mut h = Harness::new(&config(&["living"]));
    h.start();
    h.seed_reference(&["living"]);

    // One recompute plus a heartbeat per 30 s: six publishes.
    let wall = Instant::now();
    for n in 1..=5 {
        let now = h.t0 + Duration::from_secs(30 * n);
        h.engine.poll(now, &mut boiler, &mut h.sink);
    }
    let elapsed = wall.elapsed();
    assert!(elapsed < SLOW, "engine waited on the gateway for {elapsed:?}");

    let wait = Duration::from_secs(10);
    for _ in 0..6 {
        assert_eq!(rx.recv_timeout(wait), Ok(cmd(51.0, true)));
    }
}
