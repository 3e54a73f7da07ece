//! Storage types shared by the exact and Monte Carlo solvers.

pub mod accumulator;
pub mod csr;
pub mod distribution;

pub use accumulator::VisitCounter;
pub use csr::CsrMatrix;
pub use distribution::StationaryDistribution;
