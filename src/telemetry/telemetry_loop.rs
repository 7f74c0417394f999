//! Fixed-cadence orchestration

use crate::connectivity::{
    BrokerTransport, Clock, ConnectionState, ConnectivityEvent, ConnectivityManager,
    InboundMessage, SystemClock, Topic,
};
use crate::geofence::{GeofenceEvaluator, GeofenceStatus};
use crate::position::{GpsReceiver, PositionSource};
use crate::storage::{NvStorage, PersistentConfigStore};
use crate::telemetry::{CommandError, GeofenceCommand, StatusPayload};
use crate::utils::{ConfigError, DeviceConfig};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Loop counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetryStats {
    pub ticks: u64,
    pub ticks_without_fix: u64,
    /// Ticks where the receiver had a fix but delivered nothing new
    pub stale_ticks: u64,
    pub statuses_published: u64,
    pub publish_failures: u64,
    pub commands_applied: u64,
    pub commands_rejected: u64,
    pub retry_exhaustions: u64,
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub event: ConnectivityEvent,
    /// Geofence status, when fresh fix data arrived this tick
    pub status: Option<GeofenceStatus>,
    pub published: bool,
}

#[derive(Debug, Default)]
struct CommandLog {
    applied: u64,
    rejected: u64,
    last_error: Option<CommandError>,
}

/// Ties position, geofence, storage and connectivity together.
///
/// The store is shared with the inbound message callback, which only
/// runs inside [`ConnectivityManager::handle`], so a reconfiguration is
/// always applied between two evaluations.
pub struct TelemetryLoop<S, R, T, C = SystemClock>
where
    S: NvStorage + 'static,
    R: GpsReceiver,
    T: BrokerTransport,
    C: Clock,
{
    store: Rc<RefCell<PersistentConfigStore<S>>>,
    position: PositionSource<R>,
    connectivity: ConnectivityManager<T, C>,
    evaluator: GeofenceEvaluator,
    status_topic: Topic,
    tx_interval: Duration,
    commands: Rc<RefCell<CommandLog>>,
    last_status: Option<GeofenceStatus>,
    stats: TelemetryStats,
}

impl<S, R, T, C> TelemetryLoop<S, R, T, C>
where
    S: NvStorage + 'static,
    R: GpsReceiver,
    T: BrokerTransport,
    C: Clock,
{
    /// Wire the components together and register the reconfiguration topic
    pub fn new(
        config: &DeviceConfig,
        store: PersistentConfigStore<S>,
        position: PositionSource<R>,
        mut connectivity: ConnectivityManager<T, C>,
    ) -> Result<Self, ConfigError> {
        let status_topic = config.status_topic()?;
        let geofence_topic = config.geofence_topic()?;

        let store = Rc::new(RefCell::new(store));
        let commands = Rc::new(RefCell::new(CommandLog::default()));

        let callback_store = Rc::clone(&store);
        let callback_log = Rc::clone(&commands);
        connectivity.set_message_callback(Box::new(move |message: &InboundMessage| {
            let result = apply_command(&mut *callback_store.borrow_mut(), message);
            let mut log = callback_log.borrow_mut();
            match result {
                Ok(()) => {
                    log.applied += 1;
                    log.last_error = None;
                }
                Err(e) => {
                    warn!(topic = %message.topic, error = %e, "Rejected geofence command");
                    log.rejected += 1;
                    log.last_error = Some(e);
                }
            }
        }));
        connectivity.subscribe(geofence_topic);

        Ok(Self {
            store,
            position,
            connectivity,
            evaluator: GeofenceEvaluator::new(),
            status_topic,
            tx_interval: config.tx_interval(),
            commands,
            last_status: None,
            stats: TelemetryStats::default(),
        })
    }

    /// One cadence tick: maintain the link, poll the receiver, report
    pub fn tick(&mut self) -> TickReport {
        self.stats.ticks += 1;

        if self.connectivity.state() == ConnectionState::RetryExhausted {
            debug!("Starting new connect cycle");
            self.connectivity.reset();
        }

        let event = self.connectivity.handle();
        if event == ConnectivityEvent::RetryExhausted {
            self.stats.retry_exhaustions += 1;
        }

        let fresh = self.position.poll();
        let fix = self.position.fix();
        if !fresh || !fix.valid {
            if fix.valid {
                self.stats.stale_ticks += 1;
                debug!("No new GPS data, skipping report");
            } else {
                self.stats.ticks_without_fix += 1;
            }
            return TickReport {
                event,
                status: None,
                published: false,
            };
        }

        let geofence = self.store.borrow().config();
        let evaluation = self.evaluator.evaluate(&geofence, &fix);
        self.note_status(evaluation.status, evaluation.distance_m);

        let published = match StatusPayload::new(&fix, &evaluation).to_json() {
            Ok(payload) => match self.connectivity.publish(&self.status_topic, &payload) {
                Ok(()) => {
                    self.stats.statuses_published += 1;
                    true
                }
                Err(e) => {
                    self.stats.publish_failures += 1;
                    debug!(error = %e, "Status not published");
                    false
                }
            },
            Err(e) => {
                self.stats.publish_failures += 1;
                warn!(error = %e, "Failed to encode status payload");
                false
            }
        };

        TickReport {
            event,
            status: Some(evaluation.status),
            published,
        }
    }

    fn note_status(&mut self, status: GeofenceStatus, distance_m: Option<f64>) {
        if self.last_status == Some(status) {
            return;
        }

        if status.is_violation() {
            warn!(distance_m, "Position outside geofence");
        } else {
            info!(%status, distance_m, "Geofence status changed");
        }
        self.last_status = Some(status);
    }

    /// Run `ticks` ticks, one every `tx_interval`
    pub fn run(&mut self, ticks: u64) {
        for n in 0..ticks {
            let started = self.connectivity.clock().now();
            self.tick();
            if n + 1 < ticks {
                self.wait_next_tick(started);
            }
        }
    }

    /// Sleep until one `tx_interval` after `started`
    pub fn wait_next_tick(&self, started: Instant) {
        self.connectivity.clock().sleep_until(started + self.tx_interval);
    }

    pub fn stats(&self) -> TelemetryStats {
        let commands = self.commands.borrow();
        TelemetryStats {
            commands_applied: commands.applied,
            commands_rejected: commands.rejected,
            ..self.stats.clone()
        }
    }

    /// Error from the most recent rejected command, cleared by a success
    pub fn last_command_error(&self) -> Option<CommandError> {
        self.commands.borrow().last_error.clone()
    }

    pub fn store(&self) -> &Rc<RefCell<PersistentConfigStore<S>>> {
        &self.store
    }

    pub fn position(&self) -> &PositionSource<R> {
        &self.position
    }

    pub fn position_mut(&mut self) -> &mut PositionSource<R> {
        &mut self.position
    }

    pub fn connectivity(&self) -> &ConnectivityManager<T, C> {
        &self.connectivity
    }

    pub fn connectivity_mut(&mut self) -> &mut ConnectivityManager<T, C> {
        &mut self.connectivity
    }

    pub fn status_topic(&self) -> &Topic {
        &self.status_topic
    }
}

fn apply_command<S: NvStorage>(
    store: &mut PersistentConfigStore<S>,
    message: &InboundMessage,
) -> Result<(), CommandError> {
    let command = GeofenceCommand::parse(&message.payload)?;
    store.set_geofence(command.latitude, command.longitude, command.radius_m)?;
    Ok(())
}
