//! Asynchronous delivery to controller simulators.
//!
//! One background worker owns the controller registrations and drains a
//! channel of pin updates. The tick side only ever enqueues, so simulator
//! code runs entirely off the tick loop, and a failed delivery is logged
//! and dropped rather than surfaced.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

use crate::error::Result;
use crate::levels::{PinKind, PinLevel};

/// Embedded controller simulator as seen from the electrical side.
///
/// Implementations live outside this workspace (the micro:bit runtime, a
/// test double); the bridge only pushes pin values at them.
pub trait ControllerSimulator: Send + Sync {
    fn set_external_pin_value(&self, pin: &str, value: f64, kind: PinKind) -> Result<()>;
}

enum Msg {
    Register {
        controller_id: String,
        simulator: Arc<dyn ControllerSimulator>,
    },
    Deregister {
        controller_id: String,
    },
    Pin {
        controller_id: String,
        pin: String,
        value: f64,
        kind: PinKind,
    },
    Shutdown,
}

/// Handle to the delivery worker.
///
/// Dropping the bridge shuts the worker down after the already-queued
/// updates have drained.
pub struct PinBridge {
    tx: Sender<Msg>,
    worker: Option<JoinHandle<()>>,
}

impl PinBridge {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        let worker = thread::spawn(move || run(rx));
        Self {
            tx,
            worker: Some(worker),
        }
    }

    pub fn register(&self, controller_id: &str, simulator: Arc<dyn ControllerSimulator>) {
        self.send(Msg::Register {
            controller_id: controller_id.to_owned(),
            simulator,
        });
    }

    pub fn deregister(&self, controller_id: &str) {
        self.send(Msg::Deregister {
            controller_id: controller_id.to_owned(),
        });
    }

    /// Queue one tick's pin levels for delivery. Each pin gets the
    /// measured voltage for analog reads, then the thresholded logic
    /// level, so the simulator can serve both kinds of read.
    pub fn notify(&self, levels: &[PinLevel]) {
        for level in levels {
            self.send(Msg::Pin {
                controller_id: level.controller_id.clone(),
                pin: level.pin.clone(),
                value: level.volts,
                kind: PinKind::Analog,
            });
            self.send(Msg::Pin {
                controller_id: level.controller_id.clone(),
                pin: level.pin.clone(),
                value: if level.digital { 1.0 } else { 0.0 },
                kind: PinKind::Digital,
            });
        }
    }

    fn send(&self, msg: Msg) {
        // An unbounded send only fails when the worker is gone; the tick
        // loop must not care either way.
        if self.tx.send(msg).is_err() {
            debug!("pin bridge worker is gone, dropping update");
        }
    }
}

impl Default for PinBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PinBridge {
    fn drop(&mut self) {
        let _ = self.tx.send(Msg::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run(rx: Receiver<Msg>) {
    let mut simulators: HashMap<String, Arc<dyn ControllerSimulator>> = HashMap::new();
    for msg in rx {
        match msg {
            Msg::Register {
                controller_id,
                simulator,
            } => {
                simulators.insert(controller_id, simulator);
            }
            Msg::Deregister { controller_id } => {
                simulators.remove(&controller_id);
            }
            Msg::Pin {
                controller_id,
                pin,
                value,
                kind,
            } => {
                let Some(simulator) = simulators.get(&controller_id) else {
                    continue;
                };
                if let Err(err) = simulator.set_external_pin_value(&pin, value, kind) {
                    debug!(controller = %controller_id, pin = %pin, %err, "pin update rejected");
                }
            }
            Msg::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crossbeam_channel::RecvTimeoutError;
    use std::time::Duration;

    struct Recorder {
        tx: Sender<(String, f64, PinKind)>,
    }

    impl ControllerSimulator for Recorder {
        fn set_external_pin_value(&self, pin: &str, value: f64, kind: PinKind) -> Result<()> {
            self.tx.send((pin.to_owned(), value, kind)).unwrap();
            Ok(())
        }
    }

    struct Rejecting;

    impl ControllerSimulator for Rejecting {
        fn set_external_pin_value(&self, pin: &str, _value: f64, _kind: PinKind) -> Result<()> {
            Err(Error::Rejected(pin.to_owned()))
        }
    }

    fn high(controller_id: &str, pin: &str) -> PinLevel {
        PinLevel {
            controller_id: controller_id.to_owned(),
            pin: pin.to_owned(),
            volts: 3.3,
            digital: true,
        }
    }

    #[test]
    fn test_registered_simulator_receives_levels() {
        let (tx, rx) = unbounded();
        let bridge = PinBridge::new();
        bridge.register("mb1", Arc::new(Recorder { tx }));

        bridge.notify(&[high("mb1", "P0")]);

        // Analog voltage first, then the thresholded logic level.
        let recv = || rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(recv(), ("P0".to_owned(), 3.3, PinKind::Analog));
        assert_eq!(recv(), ("P0".to_owned(), 1.0, PinKind::Digital));
    }

    #[test]
    fn test_unregistered_controller_is_ignored() {
        let (tx, rx) = unbounded();
        let bridge = PinBridge::new();
        bridge.register("mb1", Arc::new(Recorder { tx }));

        bridge.notify(&[high("other", "P0"), high("mb1", "P1")]);

        // Only the registered controller's update arrives; channel order
        // proves the unregistered one was skipped, not queued.
        let (pin, _, _) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(pin, "P1");
    }

    #[test]
    fn test_deregister_stops_delivery() {
        let (tx, rx) = unbounded();
        let bridge = PinBridge::new();
        bridge.register("mb1", Arc::new(Recorder { tx }));
        bridge.deregister("mb1");

        bridge.notify(&[high("mb1", "P0")]);
        drop(bridge); // drains the queue before the worker exits

        assert_eq!(
            rx.recv_timeout(Duration::from_millis(200)),
            Err(RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn test_rejection_is_swallowed() {
        let (tx, rx) = unbounded();
        let bridge = PinBridge::new();
        bridge.register("bad", Arc::new(Rejecting));
        bridge.register("mb1", Arc::new(Recorder { tx }));

        // The rejection from "bad" must not break later deliveries.
        bridge.notify(&[high("bad", "P0"), high("mb1", "P2")]);

        let (pin, _, _) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(pin, "P2");
    }
}
