//! Campusflow Service
//!
//! Entity service adapters: one per record type (admission application,
//! certificate request, support ticket, enquiry, platform incident). Each
//! adapter owns persistence and side effects for its type and delegates every
//! transition legality decision to `campusflow-engine`.
//!
//! The shared flow is always the same: load the effective tenant policy
//! (built-in default when none is saved), take a fresh read of the entity,
//! ask the engine, and only on an accepted result run the entity-specific
//! side effect and commit the new status with a compare-and-swap. Rejections
//! are surfaced to the caller unchanged.

mod admission;
mod certificate;
mod enquiry;
mod error;
mod incident;
mod policy;
mod reference;
mod ticket;
mod transition;

pub use admission::{AdmissionService, CreateApplicationParams};
pub use certificate::{CertificateService, CreateCertificateParams};
pub use enquiry::{CreateEnquiryParams, EnquiryService};
pub use error::ServiceError;
pub use incident::{CreateIncidentParams, IncidentService};
pub use policy::PolicyService;
pub use ticket::{CreateTicketParams, SupportTicketService};
pub use transition::TransitionOutcome;
