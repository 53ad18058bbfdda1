//! Weld jobs and previews
//!
//! A job is a list of weld points in the part frame plus the work origin
//! that places the part on the machine. The whole path is validated
//! against the envelope before the first move; a path that does not fit
//! never starts.

use crate::controller::MachineController;
use crate::MotionResult;
use std::time::Duration;
use weldkit_core::{MachineEvent, MachinePhase, MotionError, Point};
use weldkit_path::{Bounds, WeldPoint};
use weldkit_settings::WeldPreset;

/// Points to weld and where to weld them
#[derive(Debug, Clone, PartialEq)]
pub struct WeldJob {
    /// Weld points in the part frame, in order
    pub points: Vec<WeldPoint>,
    /// Machine position of the part origin
    pub origin: Point,
    /// Weld parameters
    pub preset: WeldPreset,
    /// Contact-detection current for the first point only, in mA
    pub first_gentle_current: Option<i32>,
}

impl WeldJob {
    /// Create a job
    pub fn new(points: Vec<WeldPoint>, origin: Point, preset: WeldPreset) -> Self {
        Self {
            points,
            origin,
            preset,
            first_gentle_current: None,
        }
    }

    /// Use a different contact-detection current for the first point.
    ///
    /// The value is signed; a negative current lifts the head while it settles.
    pub fn with_first_gentle_current(mut self, current_ma: i32) -> Self {
        self.first_gentle_current = Some(current_ma);
        self
    }

    /// Preset used at point `index`
    pub fn preset_for(&self, index: usize) -> WeldPreset {
        match self.first_gentle_current {
            Some(gentle_current) if index == 0 => WeldPreset {
                gentle_current,
                ..self.preset
            },
            _ => self.preset,
        }
    }

    /// Machine position of point `index`
    pub fn target(&self, index: usize) -> Option<Point> {
        self.points
            .get(index)
            .map(|p| p.offset(self.origin.x, self.origin.y))
    }
}

/// How a job ended
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Every point was welded
    Completed,
    /// A stop was requested between points
    Stopped,
    /// The emergency stop latched
    EmergencyStopped,
    /// A safety-relevant step failed
    Aborted(MotionError),
}

/// Summary of a job run
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    /// Points in the job
    pub total: usize,
    /// Points welded
    pub welded: usize,
    /// Contact pulse of each welded point
    pub contacts: Vec<i32>,
    /// Non-fatal problems
    pub warnings: Vec<String>,
    /// How the job ended
    pub outcome: JobOutcome,
}

impl JobReport {
    fn new(total: usize) -> Self {
        Self {
            total,
            welded: 0,
            contacts: Vec::with_capacity(total),
            warnings: Vec::new(),
            outcome: JobOutcome::Completed,
        }
    }

    /// Whether every point was welded
    pub fn is_complete(&self) -> bool {
        self.outcome == JobOutcome::Completed && self.welded == self.total
    }

    /// Whether the job ended on a failure or emergency stop
    pub fn aborted(&self) -> bool {
        matches!(
            self.outcome,
            JobOutcome::Aborted(_) | JobOutcome::EmergencyStopped
        )
    }
}

impl MachineController {
    /// Current logical XY, used as the work origin after jogging onto the part
    pub fn work_origin_here(&self) -> Point {
        self.state().xy()
    }

    /// Trace the bounding box of the translated path at safe Z.
    ///
    /// Five moves close the rectangle. Nothing moves if the path leaves the
    /// envelope.
    pub fn preview_range(
        &self,
        points: &[WeldPoint],
        origin: Point,
        preset: &WeldPreset,
    ) -> MotionResult<Bounds> {
        self.require_homed()?;
        let bounds = self.envelope().validate(points, origin)?;
        tracing::info!(
            "Preview range X [{:.2}, {:.2}] Y [{:.2}, {:.2}]",
            bounds.min_x,
            bounds.max_x,
            bounds.min_y,
            bounds.max_y
        );
        self.in_phase(MachinePhase::Previewing, || {
            self.move_z_abs_pulse(self.config().machine.safe_z_pulse)?;
            for corner in bounds.trace() {
                self.drive_xy(corner, preset)?;
            }
            Ok(bounds)
        })
    }

    /// Visit every point at safe Z without welding.
    ///
    /// Returns the number of points visited.
    pub fn preview_path(
        &self,
        points: &[WeldPoint],
        origin: Point,
        preset: &WeldPreset,
    ) -> MotionResult<usize> {
        self.require_homed()?;
        self.envelope().validate(points, origin)?;
        self.in_phase(MachinePhase::Previewing, || {
            self.move_z_abs_pulse(self.config().machine.safe_z_pulse)?;
            for point in points {
                self.drive_xy(point.offset(origin.x, origin.y), preset)?;
            }
            Ok(points.len())
        })
    }

    /// Weld every point of the job in order.
    ///
    /// Fails before any motion if the machine is not homed, is stopped, or
    /// the path leaves the envelope. Failures after the first move end the
    /// job and are reported in [`JobReport::outcome`]. A completed job
    /// returns to the origin.
    pub fn run_job(&self, job: &WeldJob) -> MotionResult<JobReport> {
        self.require_homed()?;
        self.envelope().validate(&job.points, job.origin)?;

        let safety = self.safety();
        safety.clear_requests();
        let mut report = JobReport::new(job.points.len());
        tracing::info!("Weld job started ({} points)", report.total);

        let run = self.in_phase(MachinePhase::Welding, || self.weld_points(job, &mut report));
        match run {
            Ok(()) => {}
            Err(MotionError::EmergencyStopped) => report.outcome = JobOutcome::EmergencyStopped,
            Err(e) => {
                tracing::error!("Weld job aborted: {}", e);
                report.outcome = JobOutcome::Aborted(e);
            }
        }

        if report.outcome == JobOutcome::Completed {
            tracing::info!("Weld job complete");
            if let Err(e) = self.return_to_origin() {
                let warning = format!("return to origin failed: {}", e);
                tracing::warn!("{}", warning);
                self.publish(MachineEvent::Warning(warning.clone()));
                report.warnings.push(warning);
            }
        }

        self.publish(MachineEvent::JobFinished {
            welded: report.welded,
            total: report.total,
            stopped: report.outcome != JobOutcome::Completed,
        });
        Ok(report)
    }

    fn weld_points(&self, job: &WeldJob, report: &mut JobReport) -> MotionResult<()> {
        let machine = &self.config().machine;
        let safety = self.safety();
        self.move_z_abs_pulse(machine.safe_z_pulse)?;

        for (i, point) in job.points.iter().enumerate() {
            self.hold_while_paused()?;
            if safety.is_stop_requested() {
                tracing::info!("Weld job stopped before point {}", i + 1);
                report.outcome = JobOutcome::Stopped;
                return Ok(());
            }

            let target = point.offset(job.origin.x, job.origin.y);
            tracing::info!("({}/{}) {}", i + 1, report.total, target);
            let preset = job.preset_for(i);
            self.drive_xy(target, &preset)?;
            if i == 0 {
                self.pacer()
                    .sleep(Duration::from_millis(self.config().timing.first_point_settle_ms))?;
                if let Some(current) = job.first_gentle_current {
                    tracing::info!("First point contact current {} mA", current);
                }
            }

            let retract = match job.points.get(i + 1) {
                Some(next) if point.distance_to(next) >= machine.long_retract_threshold_mm => {
                    machine.long_retract_pulse
                }
                _ => machine.safe_z_pulse,
            };
            let contact = self.press(&preset, retract)?;

            report.welded += 1;
            report.contacts.push(contact);
            self.publish(MachineEvent::PointWelded {
                index: i + 1,
                total: report.total,
                point: *point,
            });
        }
        Ok(())
    }

    fn hold_while_paused(&self) -> MotionResult<()> {
        let safety = self.safety();
        if !safety.is_paused() {
            return Ok(());
        }
        tracing::info!("Weld job paused");
        self.set_phase(MachinePhase::Paused);
        let poll = Duration::from_millis(self.config().timing.poll_interval_ms);
        let pacer = self.pacer();
        while safety.is_paused() && !safety.is_stop_requested() {
            pacer.sleep(poll)?;
        }
        self.set_phase(MachinePhase::Welding);
        tracing::info!("Weld job resumed");
        Ok(())
    }
}
