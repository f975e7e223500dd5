pub mod policy;
pub mod reports;
pub mod simulation;

pub use policy::GameplayStrategy;
pub use simulation::{DEFAULT_MAX_TURNS, SimulationPlan, run_simulation};
