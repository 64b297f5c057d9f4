//! Campusflow Engine
//!
//! The sole authority for "is status A -> status B legal right now for this
//! entity". [`request_transition`] is a pure decision function over the
//! entity snapshot, the requested target, and the tenant policy: no clock, no
//! randomness, no persistence. The calling service is responsible for
//! committing accepted results and for entity-specific side effects.
//!
//! Preconditions (document presence, fee paid) are answered by pluggable
//! [`PreconditionEvaluator`] implementations looked up through an
//! [`EvaluatorRegistry`] keyed by namespace prefix (`doc:`, `fee:`). Unknown
//! precondition ids fail closed: they block the one transition that required
//! them rather than raising an error.

mod engine;
mod entity;
mod evaluator;
mod result;

pub use engine::request_transition;
pub use entity::EntityState;
pub use evaluator::{
  DocumentPresenceEvaluator, EvaluatorRegistry, FeePaidEvaluator, PreconditionEvaluator,
};
pub use result::{Rejection, TransitionResult};
