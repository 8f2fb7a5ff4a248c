pub mod controller;
pub mod sink;
pub mod state;

pub use controller::StationController;
pub use sink::{PersistFuture, ResultSink};
pub use state::{Decision, DecisionOutcome, SessionMachine, SessionPhase, TickOutcome};
