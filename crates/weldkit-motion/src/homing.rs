//! Two-phase sensor homing
//!
//! Each planar axis runs `Idle → FastApproach → Backoff → SlowApproach →
//! Homed`. The fast approach finds the sensor quickly, the backoff clears
//! its dead zone and the slow re-approach fixes the offset. Backoff
//! problems are logged and skipped; the slow approach alone decides zero.

use crate::hardware::{OperatingMode, ServoBus, TriggerSensor};
use crate::safety::Pacer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use weldkit_core::{Axis, MotionError};
use weldkit_settings::{HomingSettings, TimingSettings};

/// Homing state of one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HomingPhase {
    /// Not homing
    Idle,
    /// Moving towards the sensor at the fast speed
    FastApproach,
    /// Moving away from the sensor
    Backoff,
    /// Moving towards the sensor at the slow speed
    SlowApproach,
    /// Offset recorded
    Homed,
}

impl HomingPhase {
    /// Check if a transition from this phase to `target` is valid.
    ///
    /// Phases advance strictly in order; any phase may fall back to Idle
    /// and a homed axis may start over.
    pub fn can_transition_to(&self, target: HomingPhase) -> bool {
        use HomingPhase::*;
        matches!(
            (self, target),
            (_, Idle)
                | (Idle, FastApproach)
                | (FastApproach, Backoff)
                | (Backoff, SlowApproach)
                | (SlowApproach, Homed)
                | (Homed, FastApproach)
        )
    }
}

impl fmt::Display for HomingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::FastApproach => write!(f, "FastApproach"),
            Self::Backoff => write!(f, "Backoff"),
            Self::SlowApproach => write!(f, "SlowApproach"),
            Self::Homed => write!(f, "Homed"),
        }
    }
}

/// How the backoff move ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackoffOutcome {
    /// Reached the requested distance
    Completed {
        /// Pulses travelled
        moved: i32,
    },
    /// Time limit elapsed first
    TimedOut,
    /// A position read failed mid-move
    ReadFailed,
    /// The start position could not be read; no backoff was attempted
    Skipped,
}

/// Result of a completed homing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomingReport {
    /// Homed axis
    pub axis: Axis,
    /// Raw pulse count recorded as logical zero
    pub offset: i32,
    /// How the backoff went
    pub backoff: BackoffOutcome,
}

/// Sensor homing sequence for one planar axis
#[derive(Debug, Clone)]
pub struct AxisHoming {
    axis: Axis,
    homing_sign: i32,
    pulses_per_unit: f64,
    phase: HomingPhase,
}

impl AxisHoming {
    /// Create a sequence.
    ///
    /// `homing_sign` is the raw velocity sign that moves towards the sensor.
    pub fn new(axis: Axis, homing_sign: i32, pulses_per_unit: f64) -> Self {
        Self {
            axis,
            homing_sign: if homing_sign < 0 { -1 } else { 1 },
            pulses_per_unit,
            phase: HomingPhase::Idle,
        }
    }

    /// Current phase
    pub fn phase(&self) -> HomingPhase {
        self.phase
    }

    fn enter(&mut self, next: HomingPhase) {
        if !self.phase.can_transition_to(next) {
            tracing::warn!(
                "{} homing: unexpected transition {} -> {}",
                self.axis,
                self.phase,
                next
            );
        }
        tracing::debug!("{} homing: {} -> {}", self.axis, self.phase, next);
        self.phase = next;
    }

    fn fail(&mut self, reason: impl Into<String>) -> MotionError {
        self.phase = HomingPhase::Idle;
        MotionError::HomingFailed {
            axis: self.axis,
            reason: reason.into(),
        }
    }

    /// Run the full sequence and return the new offset.
    ///
    /// The caller records the offset; this type never touches machine state.
    /// On any error the phase falls back to Idle.
    pub(crate) fn run(
        &mut self,
        bus: &dyn ServoBus,
        sensor: &dyn TriggerSensor,
        pacer: &Pacer<'_>,
        homing: &HomingSettings,
        timing: &TimingSettings,
    ) -> Result<HomingReport, MotionError> {
        let result = self.run_phases(bus, sensor, pacer, homing, timing);
        if result.is_err() {
            self.phase = HomingPhase::Idle;
            if let Err(e) = bus.set_target_velocity(self.axis, 0) {
                tracing::warn!("{} homing: failed to stop axis after abort: {}", self.axis, e);
            }
        }
        result
    }

    fn run_phases(
        &mut self,
        bus: &dyn ServoBus,
        sensor: &dyn TriggerSensor,
        pacer: &Pacer<'_>,
        homing: &HomingSettings,
        timing: &TimingSettings,
    ) -> Result<HomingReport, MotionError> {
        let axis = self.axis;
        let sensor_poll = Duration::from_millis(timing.sensor_poll_ms);

        self.enter(HomingPhase::FastApproach);
        let fast = homing.fast_speed * self.homing_sign;
        tracing::info!("{} homing: fast approach at {}", axis, fast);
        bus.set_mode(axis, OperatingMode::Velocity)?;
        bus.set_target_velocity(axis, fast)?;
        if !wait_for_trigger(sensor, pacer, sensor_poll, homing.approach_timeout())? {
            return Err(self.fail("sensor not reached during fast approach"));
        }
        bus.set_target_velocity(axis, 0)?;
        tracing::info!("{} homing: sensor triggered", axis);
        pacer.sleep(Duration::from_millis(timing.trigger_settle_ms))?;

        self.enter(HomingPhase::Backoff);
        let backoff = self.back_off(bus, pacer, homing, timing)?;

        self.enter(HomingPhase::SlowApproach);
        let slow = homing.slow_speed * self.homing_sign;
        tracing::info!("{} homing: slow approach at {}", axis, slow);
        bus.set_mode(axis, OperatingMode::Velocity)?;
        bus.set_target_velocity(axis, slow)?;
        if !wait_for_trigger(sensor, pacer, sensor_poll, homing.approach_timeout())? {
            return Err(self.fail("sensor not reached during slow approach"));
        }
        bus.set_target_velocity(axis, 0)?;
        let offset = match bus.read_position(axis) {
            Ok(pulses) => pulses,
            Err(e) => return Err(self.fail(format!("cannot read home position: {}", e))),
        };
        tracing::info!("{} homing: zero at raw pulse {}", axis, offset);
        pacer.sleep(Duration::from_millis(timing.trigger_settle_ms))?;

        bus.set_mode(axis, OperatingMode::ExtendedPosition)?;
        self.enter(HomingPhase::Homed);
        Ok(HomingReport {
            axis,
            offset,
            backoff,
        })
    }

    fn back_off(
        &mut self,
        bus: &dyn ServoBus,
        pacer: &Pacer<'_>,
        homing: &HomingSettings,
        timing: &TimingSettings,
    ) -> Result<BackoffOutcome, MotionError> {
        let axis = self.axis;
        let start = match bus.read_position(axis) {
            Ok(pulses) => pulses,
            Err(e) => {
                tracing::warn!("{} homing: cannot read start position ({}), skipping backoff", axis, e);
                return Ok(BackoffOutcome::Skipped);
            }
        };

        let away = -self.homing_sign;
        let wanted = (homing.backoff_distance_mm * self.pulses_per_unit).round() as i32;
        let velocity = homing.backoff_speed.max(1) * away;
        tracing::info!(
            "{} homing: backing off {} pulses at {} from {}",
            axis,
            wanted,
            velocity,
            start
        );

        bus.set_mode(axis, OperatingMode::Velocity)?;
        bus.set_target_velocity(axis, velocity)?;

        let poll = Duration::from_millis(timing.backoff_poll_ms);
        let started_at = pacer.now();
        let outcome = loop {
            if pacer.now().saturating_sub(started_at) > homing.backoff_timeout() {
                tracing::warn!("{} homing: backoff timed out", axis);
                break BackoffOutcome::TimedOut;
            }
            match bus.read_position(axis) {
                Ok(pos) => {
                    let moved = (pos - start) * away;
                    if moved >= wanted {
                        break BackoffOutcome::Completed { moved };
                    }
                }
                Err(e) => {
                    tracing::warn!("{} homing: position read failed during backoff: {}", axis, e);
                    break BackoffOutcome::ReadFailed;
                }
            }
            pacer.sleep(poll)?;
        };

        bus.set_target_velocity(axis, 0)?;
        pacer.sleep(Duration::from_millis(timing.stop_settle_ms))?;
        Ok(outcome)
    }
}

/// Poll a sensor until it triggers or `timeout` elapses
fn wait_for_trigger(
    sensor: &dyn TriggerSensor,
    pacer: &Pacer<'_>,
    poll: Duration,
    timeout: Duration,
) -> Result<bool, MotionError> {
    let started_at = pacer.now();
    loop {
        pacer.check()?;
        if sensor.is_triggered() {
            return Ok(true);
        }
        if pacer.now().saturating_sub(started_at) > timeout {
            return Ok(false);
        }
        pacer.sleep(poll)?;
    }
}
