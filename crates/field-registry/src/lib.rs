//! Field declarations and the canonical record they describe.
//!
//! The registry is loaded once at startup and injected wherever field
//! metadata is needed; path lookup is a pure function over the loaded table.
//! Every declared path must resolve to a typed accessor on
//! [`CanonicalRecord`], so a bad path fails at load time instead of
//! mid-pipeline.

mod builtin;
mod record;
mod registry;
mod spec;

pub use builtin::builtin_fields;
pub use record::{
    accessor_for, Accessor, Address, AttorneyData, CanonicalRecord, ClientData, ConsentData,
    EligibilityData, PassportData, RecordMeta, RepresentationData, WarningItem,
};
pub use registry::{FieldRegistry, RegistryError};
pub use spec::{AutofillSpec, FieldSpec};
