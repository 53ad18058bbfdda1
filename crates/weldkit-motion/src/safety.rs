//! Emergency stop and cooperative cancellation
//!
//! The handle is cheap to clone and safe to call from any thread. Every
//! polling loop in the controller checks it on each iteration, so a stop
//! raised while a wait is in progress takes effect on the next poll.

use crate::hardware::{Clock, ServoBus, WelderOutput};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use weldkit_core::{
    Axis, EventDispatcher, MachineEvent, MachinePhase, MotionError, SharedMachineState,
};

struct SafetyInner {
    stopped: AtomicBool,
    stop_requested: AtomicBool,
    paused: AtomicBool,
    bus: Arc<dyn ServoBus>,
    welder: Arc<dyn WelderOutput>,
    state: SharedMachineState,
    events: EventDispatcher,
}

/// Shared emergency-stop latch and job flags
#[derive(Clone)]
pub struct SafetyHandle {
    inner: Arc<SafetyInner>,
}

impl SafetyHandle {
    /// Create a handle acting on the given actuators and state
    pub fn new(
        bus: Arc<dyn ServoBus>,
        welder: Arc<dyn WelderOutput>,
        state: SharedMachineState,
        events: EventDispatcher,
    ) -> Self {
        Self {
            inner: Arc::new(SafetyInner {
                stopped: AtomicBool::new(false),
                stop_requested: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                bus,
                welder,
                state,
                events,
            }),
        }
    }

    /// Latch the emergency stop.
    ///
    /// De-energizes every axis and the welder. Calling it again repeats the
    /// outputs and leaves the same latched state.
    pub fn emergency_stop(&self) {
        let first = !self.inner.stopped.swap(true, Ordering::SeqCst);
        if first {
            tracing::error!("EMERGENCY STOP");
        }

        for axis in Axis::ALL {
            if let Err(e) = self.inner.bus.disable_torque(axis) {
                tracing::error!("Failed to disable torque on {} during emergency stop: {}", axis, e);
            }
        }
        if let Err(e) = self.inner.welder.set(false) {
            tracing::error!("Failed to switch welder off during emergency stop: {}", e);
        }

        {
            let mut state = self.inner.state.write();
            state.stopped = true;
            state.set_phase(MachinePhase::Stopped);
        }

        if first {
            self.inner.events.publish(MachineEvent::EmergencyStop);
            self.inner
                .events
                .publish(MachineEvent::PhaseChanged(MachinePhase::Stopped));
        }
    }

    /// Whether the emergency stop is latched
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Fail with [`MotionError::EmergencyStopped`] while latched
    pub fn check(&self) -> Result<(), MotionError> {
        if self.is_stopped() {
            Err(MotionError::EmergencyStopped)
        } else {
            Ok(())
        }
    }

    /// Ask the running job to stop after the current point
    pub fn request_stop(&self) {
        tracing::info!("Stop requested");
        self.inner.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Whether a job stop was requested
    pub fn is_stop_requested(&self) -> bool {
        self.inner.stop_requested.load(Ordering::SeqCst)
    }

    /// Hold the running job before its next point
    pub fn pause(&self) {
        tracing::info!("Pause requested");
        self.inner.paused.store(true, Ordering::SeqCst);
    }

    /// Release a paused job
    pub fn resume(&self) {
        tracing::info!("Resume requested");
        self.inner.paused.store(false, Ordering::SeqCst);
    }

    /// Whether the job is held
    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    /// Reset the stop and pause requests before a new job
    pub fn clear_requests(&self) {
        self.inner.stop_requested.store(false, Ordering::SeqCst);
        self.inner.paused.store(false, Ordering::SeqCst);
    }

    pub(crate) fn release_latch(&self) {
        self.inner.stopped.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for SafetyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyHandle")
            .field("stopped", &self.is_stopped())
            .field("stop_requested", &self.is_stop_requested())
            .field("paused", &self.is_paused())
            .finish()
    }
}

/// Longest uninterrupted sleep inside a wait
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Stop-aware sleeping for polling loops.
///
/// Every sleep is sliced so a latched emergency stop ends the wait within
/// one slice.
pub(crate) struct Pacer<'a> {
    clock: &'a dyn Clock,
    safety: &'a SafetyHandle,
}

impl<'a> Pacer<'a> {
    pub(crate) fn new(clock: &'a dyn Clock, safety: &'a SafetyHandle) -> Self {
        Self { clock, safety }
    }

    pub(crate) fn now(&self) -> Duration {
        self.clock.now()
    }

    pub(crate) fn check(&self) -> Result<(), MotionError> {
        self.safety.check()
    }

    pub(crate) fn sleep(&self, duration: Duration) -> Result<(), MotionError> {
        self.check()?;
        let mut remaining = duration;
        while !remaining.is_zero() {
            let slice = remaining.min(SLEEP_SLICE);
            self.clock.sleep(slice);
            remaining -= slice;
            self.check()?;
        }
        Ok(())
    }
}
