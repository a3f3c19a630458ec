//! Scripted two-phase host loop
//!
//! Plays the role of the outer application: an autonomous phase that drives
//! a short routine, a handoff of the live subsystems, then a driver phase
//! fed by a synthetic input script. Used by `cadence simulate`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, info};

use crate::command::{CommandHandle, LambdaCommand, SequentialGroup};
use crate::config::Config;
use crate::error::Result;
use crate::run_state::RunState;
use crate::scheduler::{Scheduler, SchedulerStats};
use crate::subsystem::{Subsystem, SubsystemHandle};
use crate::trigger::Trigger;

const DRIVETRAIN: &str = "drivetrain";
const INTAKE: &str = "intake";

/// Simulated differential drive, integrated once per cycle
#[derive(Debug, Default)]
pub struct Drivetrain {
    pub power: f64,
    pub turn_rate: f64,
    pub distance: f64,
    pub heading: f64,
}

impl Subsystem for Drivetrain {
    fn periodic(&mut self) {
        self.distance += self.power * 0.02;
        self.heading = (self.heading + self.turn_rate).rem_euclid(360.0);
    }
}

#[derive(Debug, Default)]
pub struct Intake {
    pub speed: f64,
    pub cycles_run: u64,
}

impl Subsystem for Intake {
    fn periodic(&mut self) {
        if self.speed != 0.0 {
            self.cycles_run += 1;
        }
    }
}

/// Claims after a cycle in which they changed
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub phase: &'static str,
    pub cycle: u64,
    pub run_state: RunState,
    /// (subsystem, claimant) in registration order; claimant is "-" when idle
    pub claims: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub name: &'static str,
    pub stats: SchedulerStats,
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub phases: Vec<PhaseReport>,
    pub assignment_changes: usize,
    pub distance: f64,
    pub heading: f64,
    pub intake_cycles: u64,
}

struct Robot {
    drivetrain: Rc<RefCell<Drivetrain>>,
    intake: Rc<RefCell<Intake>>,
}

impl Robot {
    /// Register both subsystems with hold-still default commands
    fn install(&self, scheduler: &mut Scheduler, drive: &SubsystemHandle, intake: &SubsystemHandle) -> Result<()> {
        scheduler.register_subsystem(drive);
        scheduler.register_subsystem(intake);

        let dt = self.drivetrain.clone();
        let hold = LambdaCommand::idle(drive)
            .named("HoldDrive")
            .on_init(move || {
                let mut dt = dt.borrow_mut();
                dt.power = 0.0;
                dt.turn_rate = 0.0;
            });
        scheduler.set_default_command(drive, &CommandHandle::new(hold))?;

        let it = self.intake.clone();
        let stop = LambdaCommand::idle(intake)
            .named("StopIntake")
            .on_init(move || it.borrow_mut().speed = 0.0);
        scheduler.set_default_command(intake, &CommandHandle::new(stop))?;
        Ok(())
    }

    fn drive_distance(&self, drive: &SubsystemHandle, name: &str, metres: f64) -> LambdaCommand {
        let (d1, d2, d3) = (self.drivetrain.clone(), self.drivetrain.clone(), self.drivetrain.clone());
        let target = Rc::new(Cell::new(0.0));
        let t = target.clone();
        LambdaCommand::new()
            .named(name)
            .requires(drive)
            .on_init(move || t.set(d1.borrow().distance + metres))
            .on_execute(move || d2.borrow_mut().power = 0.5)
            .finish_when(move || d3.borrow().distance >= target.get())
            .on_end({
                let dt = self.drivetrain.clone();
                move |_| dt.borrow_mut().power = 0.0
            })
    }

    fn turn(&self, drive: &SubsystemHandle, cycles: u32) -> LambdaCommand {
        let (d1, d2) = (self.drivetrain.clone(), self.drivetrain.clone());
        let (e1, e2, e3) = counter();
        LambdaCommand::new()
            .named("Turn")
            .requires(drive)
            .on_init(move || e1.set(0))
            .on_execute(move || {
                d1.borrow_mut().turn_rate = 3.0;
                e2.set(e2.get() + 1);
            })
            .finish_when(move || e3.get() >= cycles)
            .on_end(move |_| d2.borrow_mut().turn_rate = 0.0)
    }
}

/// Two-phase scripted run of the scheduler
pub struct Simulation {
    config: Config,
    realtime: bool,
}

impl Simulation {
    pub fn new(config: Config) -> Self {
        Self { config, realtime: false }
    }

    /// Sleep one cycle period between cycles
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn run(&self, mut on_change: impl FnMut(&Assignment)) -> Result<SimulationReport> {
        let robot = Robot {
            drivetrain: Rc::new(RefCell::new(Drivetrain::default())),
            intake: Rc::new(RefCell::new(Intake::default())),
        };
        let drive = SubsystemHandle::from_shared(robot.drivetrain.clone());
        let intake = SubsystemHandle::from_shared(robot.intake.clone());
        let mut changes = 0;
        let mut phases = Vec::new();

        // Autonomous phase
        let mut scheduler = Scheduler::new(self.config.scheduler.clone());
        robot.install(&mut scheduler, &drive, &intake)?;
        let routine = SequentialGroup::new(
            &mut scheduler,
            vec![
                CommandHandle::new(robot.drive_distance(&drive, "DriveForward", 1.0)),
                CommandHandle::new(robot.turn(&drive, 30)),
            ],
        )?;
        let clock = Rc::new(Cell::new(0u64));
        // Start the routine on the first active cycle
        scheduler.register_trigger(Trigger::new(pressed(&clock, self.config.host.init_cycles, u64::MAX)).on_true(&routine));
        changes += self.run_phase(&mut scheduler, "auto", &clock, &mut on_change)?;
        phases.push(PhaseReport {
            name: "auto",
            stats: scheduler.stats().clone(),
        });
        scheduler.store_subsystem(DRIVETRAIN, drive.clone());
        scheduler.store_subsystem(INTAKE, intake.clone());

        // Handoff
        let mut scheduler = if self.config.scheduler.refresh_between_phases {
            info!("Simulation: starting driver phase with a fresh scheduler");
            scheduler.into_next_phase()
        } else {
            info!("Simulation: keeping scheduler registrations for driver phase");
            scheduler.end_phase();
            scheduler
        };
        let drive = scheduler.take_stored_subsystem(DRIVETRAIN).unwrap_or(drive);
        let intake = scheduler.take_stored_subsystem(INTAKE).unwrap_or(intake);
        if self.config.scheduler.refresh_between_phases {
            robot.install(&mut scheduler, &drive, &intake)?;
        }

        // Driver phase, fed by a scripted input timeline
        let clock = Rc::new(Cell::new(0u64));
        let at = |cycle: u64| self.config.host.init_cycles + cycle;
        let run_intake = {
            let it = robot.intake.clone();
            let stop = robot.intake.clone();
            CommandHandle::new(
                LambdaCommand::new()
                    .named("RunIntake")
                    .requires(&intake)
                    .on_execute(move || it.borrow_mut().speed = 1.0)
                    .finish_when(|| false)
                    .on_end(move |_| stop.borrow_mut().speed = 0.0),
            )
        };
        let lock = {
            let (h1, h2, h3) = counter();
            CommandHandle::new(
                LambdaCommand::new()
                    .named("LockDrive")
                    .requires(&drive)
                    .interruptible(false)
                    .on_init(move || h1.set(0))
                    .on_execute(move || h2.set(h2.get() + 1))
                    .finish_when(move || h3.get() >= 40),
            )
        };
        let dash = CommandHandle::new(robot.drive_distance(&drive, "Dash", 0.2));

        scheduler.register_trigger(Trigger::new(pressed(&clock, at(10), at(50))).while_true(&run_intake));
        scheduler.register_trigger(Trigger::new(pressed(&clock, at(70), at(72))).on_true(&lock));
        // Pressed while the lock holds the drivetrain, then again after it finishes
        scheduler.register_trigger(Trigger::new(pressed(&clock, at(90), at(92))).on_true(&dash));
        scheduler.register_trigger(Trigger::new(pressed(&clock, at(130), at(132))).on_true(&dash));

        changes += self.run_phase(&mut scheduler, "teleop", &clock, &mut on_change)?;
        phases.push(PhaseReport {
            name: "teleop",
            stats: scheduler.stats().clone(),
        });
        scheduler.end_phase();

        let (distance, heading) = {
            let dt = robot.drivetrain.borrow();
            (dt.distance, dt.heading)
        };
        let intake_cycles = robot.intake.borrow().cycles_run;
        Ok(SimulationReport {
            phases,
            assignment_changes: changes,
            distance,
            heading,
            intake_cycles,
        })
    }

    fn run_phase(
        &self,
        scheduler: &mut Scheduler,
        phase: &'static str,
        clock: &Rc<Cell<u64>>,
        on_change: &mut impl FnMut(&Assignment),
    ) -> Result<usize> {
        let host = &self.config.host;
        let mut previous: Vec<(String, String)> = Vec::new();
        let mut changes = 0;
        let total = host.init_cycles + host.cycles;

        for cycle in 0..total {
            clock.set(cycle);
            let run_state = if cycle < host.init_cycles {
                RunState::InitLoop
            } else {
                RunState::Loop
            };
            scheduler.cycle(run_state)?;

            let claims = claims(scheduler);
            if claims != previous {
                changes += 1;
                let assignment = Assignment {
                    phase,
                    cycle,
                    run_state,
                    claims: claims.clone(),
                };
                debug!(?assignment, "Simulation: assignment changed");
                on_change(&assignment);
                previous = claims;
            }

            if self.realtime {
                std::thread::sleep(host.cycle_period());
            }
        }
        Ok(changes)
    }
}

/// Condition held while the phase clock is in `from..until`
fn pressed(clock: &Rc<Cell<u64>>, from: u64, until: u64) -> impl FnMut() -> bool + 'static {
    let clock = clock.clone();
    move || (from..until).contains(&clock.get())
}

fn claims(scheduler: &Scheduler) -> Vec<(String, String)> {
    scheduler
        .subsystems()
        .iter()
        .map(|s| {
            let claimant = scheduler
                .claimant(s.id())
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| "-".to_string());
            (s.name().to_string(), claimant)
        })
        .collect()
}

/// Three handles to one cycle counter, for init/execute/finish closures
fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>, Rc<Cell<u32>>) {
    let count = Rc::new(Cell::new(0));
    (count.clone(), count.clone(), count)
}
