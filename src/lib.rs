use jemallocator::Jemalloc;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

pub mod config;
pub mod error;
pub mod gadgets;
pub mod phases;
pub mod utils;

pub use {
    config::ProtocolConfig,
    error::{ProtocolError, Result},
    phases::{
        accumulator::{StateAccumulator, StepInput, Transition, ValidationOutcome},
        exponent::ExponentGenerator,
        intersection::{IntersectionChecker, IntersectionResult},
    },
};
