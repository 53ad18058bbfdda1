//! Simulated machine
//!
//! A deterministic stand-in for the servo bus, homing sensors, welder and
//! clock. Time is virtual: it only advances when the controller sleeps, and
//! the axes integrate their commanded motion over that time. Homing,
//! contact detection, timeouts and emergency stops can therefore be tested
//! without hardware and without wall-clock delays.

use super::{Clock, MachineIo, OperatingMode, ServoBus, TriggerSensor, WelderOutput};
use std::sync::Arc;
use std::time::Duration;
use weldkit_core::{thread_safe, ActuatorError, ActuatorResult, Axis, ThreadSafe};

/// Homing sensor placement of one simulated axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimAxisSpec {
    /// Pulse position at power-up
    pub start_pulse: f64,
    /// Pulse at which the sensor switches
    pub sensor_pulse: f64,
    /// +1 if the sensor reads triggered above `sensor_pulse`, -1 if below
    pub sensor_side: i32,
}

impl SimAxisSpec {
    fn triggered_at(&self, position: f64) -> bool {
        (position - self.sensor_pulse) * self.sensor_side as f64 >= 0.0
    }
}

/// Work surface under the press, in raw pulses.
///
/// Z pulses grow downwards; the press stops at
/// `base_pulse + slope_x * x_pulse + slope_y * y_pulse`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimSurface {
    /// Contact pulse at the raw XY origin
    pub base_pulse: f64,
    /// Z pulses per X pulse
    pub slope_x: f64,
    /// Z pulses per Y pulse
    pub slope_y: f64,
}

impl SimSurface {
    /// A level surface at the given Z pulse
    pub fn flat(base_pulse: f64) -> Self {
        Self {
            base_pulse,
            slope_x: 0.0,
            slope_y: 0.0,
        }
    }

    fn contact_pulse(&self, x: f64, y: f64) -> f64 {
        self.base_pulse + self.slope_x * x + self.slope_y * y
    }
}

/// Simulation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// X axis sensor placement
    pub x: SimAxisSpec,
    /// Y axis sensor placement
    pub y: SimAxisSpec,
    /// Z pulse at power-up
    pub z_start_pulse: f64,
    /// Work surface
    pub surface: SimSurface,
    /// Pulses per second for one velocity unit
    pub pulses_per_velocity_unit: f64,
    /// Pulses per second for one profile-velocity unit
    pub pulses_per_profile_unit: f64,
    /// Position-mode speed with an unlimited (zero) profile, in pulses per second
    pub max_position_speed: f64,
    /// Pulses per second per mA in current mode
    pub current_gain: f64,
    /// Integration step
    pub step: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            x: SimAxisSpec {
                start_pulse: 15_000.0,
                sensor_pulse: 0.0,
                sensor_side: -1,
            },
            y: SimAxisSpec {
                start_pulse: 12_000.0,
                sensor_pulse: 0.0,
                sensor_side: -1,
            },
            z_start_pulse: 0.0,
            surface: SimSurface::flat(5_000.0),
            pulses_per_velocity_unit: 15.6,
            pulses_per_profile_unit: 15.6,
            max_position_speed: 20_000.0,
            current_gain: 1_000.0,
            step: Duration::from_millis(1),
        }
    }
}

/// One primitive received by the simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimCommand {
    /// Torque enable/disable
    Torque(Axis, bool),
    /// Mode change
    Mode(Axis, OperatingMode),
    /// Profile change
    Profile(Axis, u32, u32),
    /// Position target
    Position(Axis, i32),
    /// Velocity target
    Velocity(Axis, i32),
    /// Current target
    Current(Axis, i32),
    /// Welder output
    Welder(bool),
}

#[derive(Debug, Clone)]
struct SimAxis {
    torque: bool,
    mode: OperatingMode,
    position: f64,
    target_position: i32,
    velocity: i32,
    current: i32,
    profile_velocity: u32,
    stalled: bool,
    offline: bool,
    reads_before_failure: usize,
    failing_reads: usize,
}

impl SimAxis {
    fn new(position: f64) -> Self {
        Self {
            torque: false,
            mode: OperatingMode::Position,
            position,
            target_position: position.round() as i32,
            velocity: 0,
            current: 0,
            profile_velocity: 0,
            stalled: false,
            offline: false,
            reads_before_failure: 0,
            failing_reads: 0,
        }
    }
}

type Scheduled = (Duration, Box<dyn FnOnce() + Send>);

struct SimState {
    config: SimConfig,
    axes: [SimAxis; 3],
    welder_on: bool,
    welder_activations: usize,
    welder_on_time: Duration,
    welder_faulty: bool,
    time: Duration,
    commands: Vec<SimCommand>,
    scheduled: Vec<Scheduled>,
}

fn index(axis: Axis) -> usize {
    match axis {
        Axis::X => 0,
        Axis::Y => 1,
        Axis::Z => 2,
    }
}

impl SimState {
    fn axis(&self, axis: Axis) -> &SimAxis {
        &self.axes[index(axis)]
    }

    fn axis_mut(&mut self, axis: Axis) -> &mut SimAxis {
        &mut self.axes[index(axis)]
    }

    fn contact_pulse(&self) -> f64 {
        self.config
            .surface
            .contact_pulse(self.axes[0].position, self.axes[1].position)
    }

    fn position_speed(&self, axis: &SimAxis) -> f64 {
        if axis.profile_velocity == 0 {
            self.config.max_position_speed
        } else {
            axis.profile_velocity as f64 * self.config.pulses_per_profile_unit
        }
    }

    fn integrate(&mut self, dt: f64) {
        for i in 0..3 {
            let axis = self.axes[i].clone();
            if !axis.torque {
                continue;
            }
            let next = match axis.mode {
                OperatingMode::Velocity if !axis.stalled => {
                    axis.position + axis.velocity as f64 * self.config.pulses_per_velocity_unit * dt
                }
                OperatingMode::Current if !axis.stalled => {
                    axis.position + axis.current as f64 * self.config.current_gain * dt
                }
                OperatingMode::Position | OperatingMode::ExtendedPosition if !axis.stalled => {
                    let delta = axis.target_position as f64 - axis.position;
                    let reach = self.position_speed(&axis) * dt;
                    if delta.abs() <= reach {
                        axis.target_position as f64
                    } else {
                        axis.position + reach * delta.signum()
                    }
                }
                _ => axis.position,
            };
            self.axes[i].position = next;
        }
        let contact = self.contact_pulse();
        if self.axes[2].position > contact {
            self.axes[2].position = contact;
        }
        if self.welder_on {
            self.welder_on_time += Duration::from_secs_f64(dt);
        }
    }

    fn advance(&mut self, duration: Duration) {
        let mut remaining = duration;
        while !remaining.is_zero() {
            let dt = remaining.min(self.config.step);
            self.integrate(dt.as_secs_f64());
            self.time += dt;
            remaining -= dt;
        }
    }

    fn is_moving(&self, axis: Axis) -> bool {
        let a = self.axis(axis);
        if !a.torque || a.stalled {
            return false;
        }
        let blocked_down = axis == Axis::Z && a.position >= self.contact_pulse();
        match a.mode {
            OperatingMode::Velocity => a.velocity != 0,
            OperatingMode::Current => a.current != 0 && !(blocked_down && a.current > 0),
            OperatingMode::Position | OperatingMode::ExtendedPosition => {
                let delta = a.target_position as f64 - a.position;
                delta.abs() > 0.5 && !(blocked_down && delta > 0.0)
            }
        }
    }
}

/// Deterministic simulated machine.
///
/// Cloning shares the same simulated hardware.
#[derive(Clone)]
pub struct SimulatedMachine {
    state: ThreadSafe<SimState>,
}

impl SimulatedMachine {
    /// Create a simulation with the given parameters
    pub fn new(config: SimConfig) -> Self {
        let state = SimState {
            axes: [
                SimAxis::new(config.x.start_pulse),
                SimAxis::new(config.y.start_pulse),
                SimAxis::new(config.z_start_pulse),
            ],
            config,
            welder_on: false,
            welder_activations: 0,
            welder_on_time: Duration::ZERO,
            welder_faulty: false,
            time: Duration::ZERO,
            commands: Vec::new(),
            scheduled: Vec::new(),
        };
        Self {
            state: thread_safe(state),
        }
    }

    /// Actuator bundle backed by this simulation
    pub fn io(&self) -> MachineIo {
        MachineIo {
            bus: Arc::new(self.clone()),
            sensor_x: Arc::new(SimSensor {
                machine: self.clone(),
                axis: Axis::X,
            }),
            sensor_y: Arc::new(SimSensor {
                machine: self.clone(),
                axis: Axis::Y,
            }),
            welder: Arc::new(self.clone()),
            clock: Arc::new(self.clone()),
        }
    }

    /// Raw position of an axis, in pulses
    pub fn position(&self, axis: Axis) -> f64 {
        self.state.lock().axis(axis).position
    }

    /// Place an axis at a raw position
    pub fn set_position(&self, axis: Axis, pulses: f64) {
        let mut state = self.state.lock();
        let a = state.axis_mut(axis);
        a.position = pulses;
        a.target_position = pulses.round() as i32;
    }

    /// Whether the axis is energized
    pub fn torque_enabled(&self, axis: Axis) -> bool {
        self.state.lock().axis(axis).torque
    }

    /// Active control mode of an axis
    pub fn mode(&self, axis: Axis) -> OperatingMode {
        self.state.lock().axis(axis).mode
    }

    /// Last commanded current of an axis
    pub fn current(&self, axis: Axis) -> i32 {
        self.state.lock().axis(axis).current
    }

    /// Whether the welder output is on
    pub fn welder_on(&self) -> bool {
        self.state.lock().welder_on
    }

    /// Number of off-to-on welder transitions
    pub fn welder_activations(&self) -> usize {
        self.state.lock().welder_activations
    }

    /// Accumulated welder on-time
    pub fn welder_on_time(&self) -> Duration {
        self.state.lock().welder_on_time
    }

    /// Every primitive received so far
    pub fn commands(&self) -> Vec<SimCommand> {
        self.state.lock().commands.clone()
    }

    /// Velocity targets sent to one axis, in order
    pub fn velocity_commands(&self, axis: Axis) -> Vec<i32> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                SimCommand::Velocity(a, v) if a == axis => Some(v),
                _ => None,
            })
            .collect()
    }

    /// Forget the command log
    pub fn clear_commands(&self) {
        self.state.lock().commands.clear();
    }

    /// Make the next `count` position reads of an axis fail
    pub fn fail_next_reads(&self, axis: Axis, count: usize) {
        self.fail_reads_after(axis, 0, count);
    }

    /// Let `skip` position reads succeed, then fail the following `count`
    pub fn fail_reads_after(&self, axis: Axis, skip: usize, count: usize) {
        let mut state = self.state.lock();
        let a = state.axis_mut(axis);
        a.reads_before_failure = skip;
        a.failing_reads = count;
    }

    /// Freeze an axis mechanically; commands are accepted but nothing moves
    pub fn set_stalled(&self, axis: Axis, stalled: bool) {
        self.state.lock().axis_mut(axis).stalled = stalled;
    }

    /// Make every primitive addressed to an axis fail
    pub fn set_offline(&self, axis: Axis, offline: bool) {
        self.state.lock().axis_mut(axis).offline = offline;
    }

    /// Make every welder output write fail; the output keeps its last state
    pub fn set_welder_faulty(&self, faulty: bool) {
        self.state.lock().welder_faulty = faulty;
    }

    /// Replace the work surface
    pub fn set_surface(&self, surface: SimSurface) {
        self.state.lock().config.surface = surface;
    }

    /// Z pulse at which the press touches the surface at the current XY
    pub fn contact_pulse(&self) -> f64 {
        self.state.lock().contact_pulse()
    }

    /// Run `action` once virtual time has advanced by `after` from now.
    ///
    /// The action runs on the sleeping thread, outside the simulation lock,
    /// so it may call back into the machine.
    pub fn schedule(&self, after: Duration, action: impl FnOnce() + Send + 'static) {
        let mut state = self.state.lock();
        let at = state.time + after;
        state.scheduled.push((at, Box::new(action)));
    }

    fn command(
        &self,
        axis: Axis,
        operation: &str,
        apply: impl FnOnce(&mut SimAxis),
        record: SimCommand,
    ) -> ActuatorResult<()> {
        let mut state = self.state.lock();
        if state.axis(axis).offline {
            return Err(offline(axis, operation));
        }
        apply(state.axis_mut(axis));
        state.commands.push(record);
        Ok(())
    }
}

impl Default for SimulatedMachine {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

fn offline(axis: Axis, operation: &str) -> ActuatorError {
    ActuatorError::Communication {
        axis,
        operation: operation.to_string(),
        reason: "no response".to_string(),
    }
}

impl ServoBus for SimulatedMachine {
    fn ping(&self, axis: Axis) -> ActuatorResult<()> {
        if self.state.lock().axis(axis).offline {
            return Err(offline(axis, "ping"));
        }
        Ok(())
    }

    fn enable_torque(&self, axis: Axis) -> ActuatorResult<()> {
        self.command(axis, "enable_torque", |a| a.torque = true, SimCommand::Torque(axis, true))
    }

    fn disable_torque(&self, axis: Axis) -> ActuatorResult<()> {
        self.command(
            axis,
            "disable_torque",
            |a| {
                a.torque = false;
                a.velocity = 0;
                a.current = 0;
                a.target_position = a.position.round() as i32;
            },
            SimCommand::Torque(axis, false),
        )
    }

    fn set_mode(&self, axis: Axis, mode: OperatingMode) -> ActuatorResult<()> {
        self.command(
            axis,
            "set_mode",
            |a| {
                if a.mode != mode {
                    a.mode = mode;
                    a.velocity = 0;
                    a.current = 0;
                    a.target_position = a.position.round() as i32;
                }
            },
            SimCommand::Mode(axis, mode),
        )
    }

    fn set_profile(&self, axis: Axis, velocity: u32, acceleration: u32) -> ActuatorResult<()> {
        self.command(
            axis,
            "set_profile",
            |a| a.profile_velocity = velocity,
            SimCommand::Profile(axis, velocity, acceleration),
        )
    }

    fn set_target_position(&self, axis: Axis, pulses: i32) -> ActuatorResult<()> {
        self.command(
            axis,
            "set_target_position",
            |a| a.target_position = pulses,
            SimCommand::Position(axis, pulses),
        )
    }

    fn set_target_velocity(&self, axis: Axis, velocity: i32) -> ActuatorResult<()> {
        self.command(
            axis,
            "set_target_velocity",
            |a| a.velocity = velocity,
            SimCommand::Velocity(axis, velocity),
        )
    }

    fn set_target_current(&self, axis: Axis, milliamps: i32) -> ActuatorResult<()> {
        self.command(
            axis,
            "set_target_current",
            |a| a.current = milliamps,
            SimCommand::Current(axis, milliamps),
        )
    }

    fn read_position(&self, axis: Axis) -> ActuatorResult<i32> {
        let mut state = self.state.lock();
        let a = state.axis_mut(axis);
        if a.offline {
            return Err(offline(axis, "read_position"));
        }
        if a.reads_before_failure > 0 {
            a.reads_before_failure -= 1;
        } else if a.failing_reads > 0 {
            a.failing_reads -= 1;
            return Err(ActuatorError::ReadFailed { axis });
        }
        Ok(a.position.round() as i32)
    }

    fn read_is_moving(&self, axis: Axis) -> ActuatorResult<bool> {
        let state = self.state.lock();
        if state.axis(axis).offline {
            return Err(offline(axis, "read_is_moving"));
        }
        Ok(state.is_moving(axis))
    }
}

impl WelderOutput for SimulatedMachine {
    fn set(&self, on: bool) -> ActuatorResult<()> {
        let mut state = self.state.lock();
        if state.welder_faulty {
            return Err(ActuatorError::OutputFailed {
                reason: format!("welder output did not switch {}", if on { "on" } else { "off" }),
            });
        }
        if on && !state.welder_on {
            state.welder_activations += 1;
        }
        state.welder_on = on;
        state.commands.push(SimCommand::Welder(on));
        Ok(())
    }
}

impl Clock for SimulatedMachine {
    fn now(&self) -> Duration {
        self.state.lock().time
    }

    fn sleep(&self, duration: Duration) {
        let end = self.state.lock().time + duration;
        loop {
            let due: Vec<Box<dyn FnOnce() + Send>> = {
                let mut state = self.state.lock();
                let next_event = state
                    .scheduled
                    .iter()
                    .map(|(at, _)| *at)
                    .filter(|at| *at <= end)
                    .min();
                let target = next_event.unwrap_or(end).max(state.time);
                let span = target - state.time;
                state.advance(span);
                let now = state.time;
                let (ready, pending): (Vec<Scheduled>, Vec<Scheduled>) =
                    state.scheduled.drain(..).partition(|(at, _)| *at <= now);
                state.scheduled = pending;
                if ready.is_empty() && now >= end {
                    break;
                }
                ready.into_iter().map(|(_, action)| action).collect()
            };
            for action in due {
                action();
            }
        }
    }
}

/// Homing sensor view of a simulated axis
struct SimSensor {
    machine: SimulatedMachine,
    axis: Axis,
}

impl TriggerSensor for SimSensor {
    fn is_triggered(&self) -> bool {
        let state = self.machine.state.lock();
        let spec = match self.axis {
            Axis::X => state.config.x,
            Axis::Y => state.config.y,
            Axis::Z => return false,
        };
        spec.triggered_at(state.axis(self.axis).position)
    }
}
