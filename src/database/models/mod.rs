pub mod audit;
pub mod evidence;
pub mod profile;
pub mod school;

pub use audit::{AuditAction, AuditEntry, AuditFilter, EntityType, NewAuditEntry};
pub use evidence::{Evidence, NewEvidence};
pub use profile::{NewProfile, Profile, ProfileChanges, ProfileFilter};
pub use school::{NewSchool, School, SchoolChanges};
