mod error;
mod evaluator;
pub mod gate;
pub mod graph;
pub mod links;
mod options;
mod signal;

pub use error::GateError;
pub use evaluator::Evaluation;
pub use gate::{GateId, GateKind, Source};
pub use graph::Graph;
pub use links::LinkVec;
pub use options::{GraphOptions, XorFold};
pub use signal::Signal;
