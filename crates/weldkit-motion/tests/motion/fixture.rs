//! Shared simulated machine setup

use std::sync::Arc;
use weldkit_motion::{MachineController, SimConfig, SimulatedMachine};
use weldkit_settings::{Config, MemoryScaleStore};

pub struct Rig {
    pub sim: SimulatedMachine,
    pub controller: MachineController,
    pub store: Arc<MemoryScaleStore>,
}

pub fn rig_with(sim_config: SimConfig, config: Config) -> Rig {
    let sim = SimulatedMachine::new(sim_config);
    let store = Arc::new(MemoryScaleStore::new());
    let controller = MachineController::new(sim.io(), config, store.clone());
    controller.setup_motors().unwrap();
    Rig {
        sim,
        controller,
        store,
    }
}

/// Default machine with motors set up, not homed
pub fn rig() -> Rig {
    rig_with(SimConfig::default(), Config::default())
}

/// Default machine, homed
pub fn homed_rig() -> Rig {
    let rig = rig();
    rig.controller.home_axes().unwrap();
    rig
}
