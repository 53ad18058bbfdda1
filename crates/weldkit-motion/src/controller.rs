//! Machine controller
//!
//! Owns the actuators, the configuration and the machine state. One worker
//! thread drives it; monitor threads read state snapshots, subscribe to
//! events and raise the emergency stop through a [`SafetyHandle`].
//!
//! Every blocking wait polls with a bounded interval and a timeout. A timed
//! out wait logs a warning and proceeds. A latched emergency stop ends any
//! wait on its next poll.

use crate::axis::{calibrated_scale, AxisConversion, ZLimits};
use crate::calibration::{fit_plane, tilt_targets, ProbeSample};
use crate::envelope::WorkEnvelope;
use crate::hardware::{MachineIo, OperatingMode, ServoBus};
use crate::homing::AxisHoming;
use crate::safety::{Pacer, SafetyHandle};
use crate::MotionResult;
use std::sync::Arc;
use std::time::Duration;
use weldkit_core::{
    shared_machine_state, Axis, EventDispatcher, MachineEvent, MachinePhase, MachineState,
    MotionError, Point, SharedMachineState, TiltPlane,
};
use weldkit_settings::{scale_key, Config, HomingSettings, ScaleStore, WeldPreset};

/// Single owner of the welder hardware
pub struct MachineController {
    io: MachineIo,
    config: Config,
    store: Arc<dyn ScaleStore>,
    state: SharedMachineState,
    events: EventDispatcher,
    safety: SafetyHandle,
}

impl MachineController {
    /// Create a controller.
    ///
    /// Scales are taken from `store`, falling back to the configured
    /// defaults. No actuator is commanded until [`setup_motors`](Self::setup_motors).
    pub fn new(io: MachineIo, config: Config, store: Arc<dyn ScaleStore>) -> Self {
        let scale = |axis: Axis| {
            let default = config.axes.get(axis).pulses_per_unit;
            match store.load(axis) {
                Some(value) => {
                    tracing::info!("Loaded {} = {}", scale_key(axis), value);
                    value
                }
                None => default,
            }
        };
        let state = shared_machine_state(MachineState::new(
            scale(Axis::X),
            scale(Axis::Y),
            scale(Axis::Z),
        ));
        let events = EventDispatcher::default();
        let safety = SafetyHandle::new(
            io.bus.clone(),
            io.welder.clone(),
            state.clone(),
            events.clone(),
        );
        Self {
            io,
            config,
            store,
            state,
            events,
            safety,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Snapshot of the machine state
    pub fn state(&self) -> MachineState {
        self.state.read().clone()
    }

    /// Shared state for monitor threads
    pub fn shared_state(&self) -> SharedMachineState {
        self.state.clone()
    }

    /// Event dispatcher
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Handle for emergency stop, job stop and pause from other threads
    pub fn safety(&self) -> SafetyHandle {
        self.safety.clone()
    }

    /// Work envelope from the machine settings
    pub fn envelope(&self) -> WorkEnvelope {
        let m = &self.config.machine;
        WorkEnvelope::new(m.max_x_mm, m.max_y_mm, m.envelope_tolerance_mm)
    }

    /// Conversion for an axis using its current scale and offset
    pub fn conversion(&self, axis: Axis) -> AxisConversion {
        let snapshot = *self.state.read().axis(axis);
        AxisConversion::new(
            snapshot.pulses_per_unit,
            snapshot.homing_offset.unwrap_or(0),
            self.config.axes.get(axis).direction,
        )
    }

    /// Z soft limits
    pub fn z_limits(&self) -> ZLimits {
        ZLimits::new(self.config.machine.z_min_pulse, self.config.machine.z_max_pulse)
    }

    pub(crate) fn bus(&self) -> &dyn ServoBus {
        self.io.bus.as_ref()
    }

    pub(crate) fn pacer(&self) -> Pacer<'_> {
        Pacer::new(self.io.clock.as_ref(), &self.safety)
    }

    pub(crate) fn publish(&self, event: MachineEvent) {
        self.events.publish(event);
    }

    pub(crate) fn require_homed(&self) -> MotionResult<()> {
        self.safety.check()?;
        if self.state.read().is_homed {
            Ok(())
        } else {
            Err(MotionError::NotHomed)
        }
    }

    pub(crate) fn set_phase(&self, phase: MachinePhase) {
        let changed = {
            let mut state = self.state.write();
            let before = state.phase;
            state.set_phase(phase);
            state.phase != before
        };
        if changed {
            self.publish(MachineEvent::PhaseChanged(phase));
        }
    }

    /// Run `f` with the machine in `phase`, returning to Idle afterwards
    /// unless the emergency stop latched meanwhile.
    pub(crate) fn in_phase<T>(
        &self,
        phase: MachinePhase,
        f: impl FnOnce() -> MotionResult<T>,
    ) -> MotionResult<T> {
        self.safety.check()?;
        self.set_phase(phase);
        let result = f();
        if !self.safety.is_stopped() {
            self.set_phase(MachinePhase::Idle);
        }
        result
    }

    fn sleep_ms(&self, ms: u64) -> MotionResult<()> {
        self.pacer().sleep(Duration::from_millis(ms))
    }

    /// Energize all axes and select their working modes
    pub fn setup_motors(&self) -> MotionResult<()> {
        tracing::info!("Setting up motors");
        let bus = self.bus();
        for axis in Axis::ALL {
            bus.enable_torque(axis)?;
            if axis.is_planar() {
                bus.set_mode(axis, OperatingMode::ExtendedPosition)?;
            } else {
                bus.set_mode(axis, OperatingMode::Position)?;
                bus.set_profile(
                    axis,
                    self.config.machine.z_profile_velocity,
                    self.config.machine.z_profile_acceleration,
                )?;
            }
        }
        Ok(())
    }

    /// Check that an axis answers on the bus
    pub fn check_connection(&self, axis: Axis) -> bool {
        match self.bus().ping(axis) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("{} axis not responding: {}", axis, e);
                false
            }
        }
    }

    /// Replace the homing parameters used by the next [`home_axes`](Self::home_axes)
    pub fn set_homing_settings(&mut self, homing: HomingSettings) {
        tracing::info!(
            "Homing backoff updated: speed={}, accel={}, distance={}mm, timeout={}ms",
            homing.backoff_speed,
            homing.backoff_acceleration,
            homing.backoff_distance_mm,
            homing.backoff_timeout_ms
        );
        self.config.homing = homing;
    }

    fn publish_position(&self) {
        let (x, y, z) = {
            let s = self.state.read();
            (s.x.position_mm, s.y.position_mm, s.z.position_mm)
        };
        self.publish(MachineEvent::PositionChanged { x, y, z });
    }

    // XY

    /// Move XY to absolute logical coordinates
    pub fn move_xy_abs(&self, x: f64, y: f64, preset: &WeldPreset) -> MotionResult<()> {
        self.require_homed()?;
        self.drive_xy(Point::new(x, y), preset)
    }

    /// Move XY relative to the current logical position
    pub fn move_xy_rel(&self, dx: f64, dy: f64, preset: &WeldPreset) -> MotionResult<()> {
        let here = self.state.read().xy();
        self.move_xy_abs(here.x + dx, here.y + dy, preset)
    }

    pub(crate) fn drive_xy(&self, target: Point, preset: &WeldPreset) -> MotionResult<()> {
        self.safety.check()?;
        tracing::debug!("XY -> {}", target);
        let bus = self.bus();
        let x_pulse = self.conversion(Axis::X).to_pulses(target.x);
        let y_pulse = self.conversion(Axis::Y).to_pulses(target.y);
        for axis in Axis::PLANAR {
            bus.set_profile(axis, preset.velocity_xy, preset.acceleration_xy)?;
        }
        bus.set_target_position(Axis::X, x_pulse)?;
        bus.set_target_position(Axis::Y, y_pulse)?;
        self.wait_xy_idle()?;
        {
            let mut state = self.state.write();
            state.x.position_mm = target.x;
            state.y.position_mm = target.y;
        }
        self.publish_position();
        Ok(())
    }

    fn wait_xy_idle(&self) -> MotionResult<()> {
        let pacer = self.pacer();
        let bus = self.bus();
        let poll = Duration::from_millis(self.config.timing.poll_interval_ms);
        let timeout = Duration::from_millis(self.config.timing.move_timeout_ms);
        let started_at = pacer.now();
        loop {
            pacer.check()?;
            let moving = match (bus.read_is_moving(Axis::X), bus.read_is_moving(Axis::Y)) {
                (Ok(x), Ok(y)) => x || y,
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!("Motion status read failed, not waiting further: {}", e);
                    return Ok(());
                }
            };
            if !moving {
                return Ok(());
            }
            if pacer.now().saturating_sub(started_at) > timeout {
                tracing::warn!("XY move timed out after {:?}", timeout);
                return Ok(());
            }
            pacer.sleep(poll)?;
        }
    }

    // Z

    /// Move Z to a raw pulse target, clamped into the soft limits.
    ///
    /// Waits until within the position threshold or the Z timeout.
    /// Returns the target actually commanded.
    pub fn move_z_abs_pulse(&self, pulse: i32) -> MotionResult<i32> {
        self.safety.check()?;
        let target = self.z_limits().clamp(pulse);
        tracing::debug!("Z -> pulse {}", target);
        let bus = self.bus();
        bus.set_mode(Axis::Z, OperatingMode::Position)?;
        bus.set_profile(
            Axis::Z,
            self.config.machine.z_profile_velocity,
            self.config.machine.z_profile_acceleration,
        )?;
        bus.set_target_position(Axis::Z, target)?;

        let pacer = self.pacer();
        let timing = &self.config.timing;
        let poll = Duration::from_millis(timing.poll_interval_ms);
        let timeout = Duration::from_millis(timing.z_move_timeout_ms);
        let started_at = pacer.now();
        loop {
            pacer.check()?;
            match bus.read_position(Axis::Z) {
                Ok(current) if (target - current).abs() <= timing.z_position_threshold => break,
                Ok(current) => {
                    if pacer.now().saturating_sub(started_at) > timeout {
                        tracing::warn!("Z move timed out at pulse {} (target {})", current, target);
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Z position read failed, not waiting further: {}", e);
                    break;
                }
            }
            pacer.sleep(poll)?;
        }

        let z_mm = self.conversion(Axis::Z).to_mm(target);
        self.state.write().z.position_mm = z_mm;
        Ok(target)
    }

    /// Move Z to a logical height, adding the tilt correction at the
    /// current XY position
    pub fn move_z_abs_mm(&self, z_mm: f64) -> MotionResult<()> {
        self.safety.check()?;
        let (xy, tilt) = {
            let s = self.state.read();
            (s.xy(), s.tilt_plane)
        };
        let corrected = z_mm + tilt.map_or(0.0, |plane| plane.z_offset(xy.x, xy.y));
        let pulse = self.conversion(Axis::Z).to_pulses(corrected);
        self.move_z_abs_pulse(pulse)?;
        self.state.write().z.position_mm = z_mm;
        self.publish_position();
        Ok(())
    }

    /// Move Z relative to the current logical height
    pub fn move_z_rel(&self, dz_mm: f64) -> MotionResult<()> {
        let z = self.state.read().z.position_mm;
        self.move_z_abs_mm(z + dz_mm)
    }

    /// Take the current Z position as logical zero
    pub fn set_z_origin_here(&self) -> MotionResult<i32> {
        self.safety.check()?;
        let pulse = self.bus().read_position(Axis::Z)?;
        {
            let mut state = self.state.write();
            state.z.homing_offset = Some(pulse);
            state.z.position_mm = 0.0;
        }
        tracing::info!("Z origin set at pulse {}", pulse);
        self.publish(MachineEvent::AxisHomed {
            axis: Axis::Z,
            offset: pulse,
        });
        Ok(pulse)
    }

    // Press

    /// Lower Z at the gentle current until it rests on the work and return
    /// the contact pulse.
    ///
    /// The axis is current-limited, so the head stops on the surface; the
    /// position read after the settle window is the contact.
    pub fn descend_until_contact(&self, preset: &WeldPreset) -> MotionResult<i32> {
        self.safety.check()?;
        let bus = self.bus();
        let direction = self.config.axes.z.direction;
        let timing = &self.config.timing;
        bus.set_profile(
            Axis::Z,
            self.config.machine.z_profile_velocity,
            self.config.machine.z_profile_acceleration,
        )?;
        bus.set_mode(Axis::Z, OperatingMode::Current)?;
        bus.set_target_current(Axis::Z, preset.gentle_current * direction)?;
        self.sleep_ms(timing.contact_settle_ms)?;
        bus.set_target_current(Axis::Z, 0)?;
        self.sleep_ms(timing.contact_release_ms)?;

        let contact = bus.read_position(Axis::Z);
        bus.set_mode(Axis::Z, OperatingMode::Position)?;
        match contact {
            Ok(pulse) => {
                tracing::info!("Contact at Z pulse {}", pulse);
                self.publish(MachineEvent::ContactDetected { z_pulse: pulse });
                Ok(pulse)
            }
            Err(e) => {
                tracing::error!("Contact detection failed: {}", e);
                Err(MotionError::ContactFailed {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Contact, press, weld and retract to the safe Z pulse.
    ///
    /// Returns the contact pulse.
    pub fn execute_welding_press(&self, preset: &WeldPreset) -> MotionResult<i32> {
        self.press(preset, self.config.machine.safe_z_pulse)
    }

    pub(crate) fn press(&self, preset: &WeldPreset, retract_pulse: i32) -> MotionResult<i32> {
        let contact = self.descend_until_contact(preset)?;

        let bus = self.bus();
        let direction = self.config.axes.z.direction;
        bus.set_mode(Axis::Z, OperatingMode::Current)?;

        // Once pressing current may be applied it is always released, and
        // the first failure is the one reported.
        let pressed = bus
            .set_target_current(Axis::Z, preset.weld_current * direction)
            .map_err(MotionError::from)
            .and_then(|()| self.weld_under_pressure(preset));
        let released = bus.set_target_current(Axis::Z, 0);
        if let Err(e) = &pressed {
            tracing::warn!("Weld press failed, pressing current released: {}", e);
        }
        pressed?;
        released?;

        self.move_z_abs_pulse(retract_pulse)?;
        Ok(contact)
    }

    fn weld_under_pressure(&self, preset: &WeldPreset) -> MotionResult<()> {
        self.sleep_ms(self.config.timing.press_ramp_ms)?;

        self.io.welder.set(true)?;
        tracing::debug!("Welding for {:?}", preset.weld_time());
        let held = self.pacer().sleep(preset.weld_time());
        let off = self.io.welder.set(false);
        held?;
        off?;
        Ok(())
    }

    /// One complete weld at a single point.
    ///
    /// The point is translated by `origin` and checked against the work
    /// envelope before anything moves. Then: safe Z, XY move, contact,
    /// press, weld, retract.
    pub fn execute_weld_cycle(
        &self,
        point: Point,
        preset: &WeldPreset,
        origin: Point,
    ) -> MotionResult<i32> {
        self.require_homed()?;
        self.envelope().validate(&[point], origin)?;
        self.move_z_abs_pulse(self.config.machine.safe_z_pulse)?;
        let target = point.offset(origin.x, origin.y);
        self.drive_xy(target, preset)?;
        self.press(preset, self.config.machine.safe_z_pulse)
    }

    // Homing and calibration

    /// Home X then Y against their sensors and move to the logical origin.
    ///
    /// `is_homed` is cleared first and set only after both axes homed.
    pub fn home_axes(&self) -> MotionResult<()> {
        self.in_phase(MachinePhase::Homing, || {
            tracing::info!("XY homing started");
            self.state.write().is_homed = false;
            for axis in Axis::PLANAR {
                self.home_axis(axis)?;
            }
            self.state.write().is_homed = true;
            tracing::info!("XY homing complete");
            let preset = self.config.default_preset();
            self.drive_xy(Point::new(0.0, 0.0), &preset)
        })
    }

    fn home_axis(&self, axis: Axis) -> MotionResult<()> {
        let sensor = self.io.sensor(axis).ok_or_else(|| MotionError::HomingFailed {
            axis,
            reason: "axis has no homing sensor".to_string(),
        })?;
        let ppu = self.state.read().axis(axis).pulses_per_unit;
        let mut homing = AxisHoming::new(axis, self.config.axes.get(axis).homing_sign, ppu);
        let report = homing.run(
            self.bus(),
            sensor.as_ref(),
            &self.pacer(),
            &self.config.homing,
            &self.config.timing,
        )?;
        {
            let mut state = self.state.write();
            let snapshot = state.axis_mut(axis);
            snapshot.homing_offset = Some(report.offset);
            snapshot.position_mm = 0.0;
        }
        self.publish(MachineEvent::AxisHomed {
            axis,
            offset: report.offset,
        });
        Ok(())
    }

    /// Probe the work surface and fit the tilt plane.
    ///
    /// Requires a user-set Z origin and homed XY; both are checked before
    /// anything moves. `count` is 3 or 16. The fitted plane is stored and
    /// applied to later Z moves, not to the probes themselves.
    pub fn calibrate_tilt(&self, count: usize, preset: &WeldPreset) -> MotionResult<TiltPlane> {
        self.safety.check()?;
        if self.state.read().z.homing_offset.is_none() {
            return Err(MotionError::ZNotZeroed);
        }
        self.require_homed()?;
        let m = &self.config.machine;
        let targets = tilt_targets(count, m.max_x_mm, m.max_y_mm)?;

        self.in_phase(MachinePhase::Calibrating, || {
            tracing::info!("Tilt calibration with {} points", count);
            let safe = self.config.machine.safe_z_pulse;
            self.move_z_abs_pulse(safe)?;

            let mut samples = Vec::with_capacity(targets.len());
            for (i, target) in targets.iter().enumerate() {
                self.drive_xy(*target, preset)?;
                let contact = self.descend_until_contact(preset)?;
                let z = self.conversion(Axis::Z).to_mm(contact);
                tracing::info!(
                    "Probe {}/{} at ({:.1}, {:.1}): z = {:.4} mm",
                    i + 1,
                    targets.len(),
                    target.x,
                    target.y,
                    z
                );
                samples.push(ProbeSample::new(target.x, target.y, z));
                self.publish(MachineEvent::TiltSample {
                    index: i + 1,
                    total: targets.len(),
                    x: target.x,
                    y: target.y,
                    z,
                });
                self.move_z_abs_pulse(safe)?;
            }
            self.return_to_origin()?;

            let plane = fit_plane(&samples)?;
            tracing::info!("Tilt plane: {}", plane);
            self.state.write().tilt_plane = Some(plane);
            self.publish(MachineEvent::TiltPlaneComputed(plane));
            Ok(plane)
        })
    }

    /// Replace or clear the stored tilt plane
    pub fn set_tilt_plane(&self, plane: Option<TiltPlane>) {
        self.state.write().tilt_plane = plane;
    }

    // Scale

    /// Correct an axis scale from a measured move and persist it.
    ///
    /// Only X and Y are calibrated this way. Returns the new scale.
    pub fn apply_scale_calibration(
        &self,
        axis: Axis,
        target_mm: f64,
        measured_mm: f64,
    ) -> MotionResult<f64> {
        if !axis.is_planar() {
            return Err(MotionError::InvalidCalibration {
                reason: format!("{} scale cannot be calibrated by distance", axis),
            });
        }
        let current = self.state.read().axis(axis).pulses_per_unit;
        let scale = calibrated_scale(current, target_mm, measured_mm)?;
        tracing::info!(
            "{} scale {:.6} -> {:.6} (target {} mm, measured {} mm)",
            axis,
            current,
            scale,
            target_mm,
            measured_mm
        );
        self.set_pulses_per_unit(axis, scale)?;
        Ok(scale)
    }

    /// Persist and apply a scale
    pub fn set_pulses_per_unit(&self, axis: Axis, value: f64) -> MotionResult<()> {
        if !(value.is_finite() && value > 0.0) {
            return Err(MotionError::InvalidCalibration {
                reason: format!("pulses per unit must be positive, got {}", value),
            });
        }
        self.store
            .save(axis, value)
            .map_err(|e| MotionError::PersistFailed {
                key: scale_key(axis),
                reason: e.to_string(),
            })?;
        self.state.write().axis_mut(axis).pulses_per_unit = value;
        Ok(())
    }

    // Manual drive

    /// Drive an axis in current mode; the sign selects the direction
    pub fn set_axis_current(&self, axis: Axis, milliamps: i32) -> MotionResult<()> {
        self.safety.check()?;
        let current = milliamps * self.config.axes.get(axis).direction;
        let bus = self.bus();
        bus.set_mode(axis, OperatingMode::Current)?;
        bus.set_target_current(axis, current)?;
        tracing::info!("{} driven at {} mA", axis, current);
        Ok(())
    }

    /// Stop a current-mode drive and return the axis to position control
    pub fn stop_continuous(&self, axis: Axis) -> MotionResult<()> {
        let bus = self.bus();
        bus.set_target_current(axis, 0)?;
        self.sleep_ms(self.config.timing.stop_settle_ms)?;
        let mode = if axis.is_planar() {
            OperatingMode::ExtendedPosition
        } else {
            OperatingMode::Position
        };
        bus.set_mode(axis, mode)?;
        match bus.read_position(axis) {
            Ok(pulse) => {
                let mm = self.conversion(axis).to_mm(pulse);
                self.state.write().axis_mut(axis).position_mm = mm;
                self.publish_position();
            }
            Err(e) => tracing::warn!("{} position unknown after manual drive: {}", axis, e),
        }
        tracing::info!("{} stopped", axis);
        Ok(())
    }

    // Returns

    /// Safe Z, then XY to the logical origin with the default preset
    pub fn return_to_origin(&self) -> MotionResult<()> {
        tracing::info!("Returning to origin");
        self.retract_and_home_xy(self.config.machine.safe_z_pulse)
    }

    /// Final retract height, then XY to the logical origin
    pub fn final_return_to_origin(&self) -> MotionResult<()> {
        tracing::info!("Final retract and return to origin");
        self.retract_and_home_xy(self.config.machine.final_retract_pulse)
    }

    fn retract_and_home_xy(&self, z_pulse: i32) -> MotionResult<()> {
        self.require_homed()?;
        self.move_z_abs_pulse(z_pulse)?;
        let preset = self.config.default_preset();
        self.drive_xy(Point::new(0.0, 0.0), &preset)
    }

    // Safety

    /// Latch the emergency stop
    pub fn emergency_stop(&self) {
        self.safety.emergency_stop();
    }

    /// Re-energize the axes and release the emergency stop.
    ///
    /// Does not re-home; positions may be stale after the axes were free.
    pub fn recover(&self) -> MotionResult<()> {
        if !self.safety.is_stopped() {
            tracing::info!("Recover requested but emergency stop is not latched");
            return Ok(());
        }
        tracing::info!("Recovering from emergency stop");
        self.setup_motors()?;
        self.safety.release_latch();
        self.safety.clear_requests();
        self.state.write().stopped = false;
        self.set_phase(MachinePhase::Idle);
        self.publish(MachineEvent::Recovered);
        Ok(())
    }

    /// De-energize every axis and the welder
    pub fn shutdown(&self) {
        tracing::info!("Shutting down");
        if let Err(e) = self.io.welder.set(false) {
            tracing::warn!("Failed to switch welder off: {}", e);
        }
        for axis in Axis::ALL {
            if let Err(e) = self.bus().disable_torque(axis) {
                tracing::warn!("Failed to disable torque on {}: {}", axis, e);
            }
        }
    }
}

impl std::fmt::Debug for MachineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineController")
            .field("state", &*self.state.read())
            .field("safety", &self.safety)
            .finish_non_exhaustive()
    }
}
