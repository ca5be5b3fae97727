//! Resource families of the MedRec EHR backend.
//!
//! Each module defines the entity structs of one family together with their
//! row mapping ([`medrec_db_postgres::PgEntity`]), typed search filters and
//! validation rules. The generic repositories and services do the rest.
//!
//! | module | resources |
//! |---|---|
//! | [`patients`] | [`Patient`] |
//! | [`practitioners`] | [`Practitioner`] |
//! | [`encounters`] | [`Encounter`] |
//! | [`diagnostics`] | [`ServiceRequest`], [`Specimen`], [`DiagnosticReport`] |
//! | [`imaging`] | [`ImagingStudy`] |
//! | [`consents`] | [`Consent`] |
//! | [`documents`] | [`Composition`] with [`CompositionSection`] |
//! | [`billing`] | [`Claim`] with [`ClaimItem`], [`ClaimDiagnosis`], [`ClaimProcedure`] |
//! | [`surgery`] | [`SurgicalCase`] with [`SurgicalTeamMember`], [`SurgicalTimeEvent`] |
//! | [`oncology`] | [`CancerDiagnosis`], [`ChemoProtocol`] with [`ChemoCycle`] |
//! | [`inbox`] | [`InboxMessage`] |
//! | [`measures`] | [`MeasureReport`] |
//! | [`vision`] | [`VisionPrescription`] with [`VisionLensSpec`] |

/// Implements `Resource` for a struct with a flattened `meta: RecordMeta`.
macro_rules! impl_resource {
    ($ty:ty, $name:literal, $filter:ty) => {
        impl ::medrec_storage::Resource for $ty {
            const RESOURCE_TYPE: &'static str = $name;
            type Filter = $filter;

            fn meta(&self) -> &::medrec_storage::RecordMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut ::medrec_storage::RecordMeta {
                &mut self.meta
            }
        }
    };
}

/// Implements `PatientScoped` (and optionally `EncounterScoped`) from filter variants.
macro_rules! impl_scopes {
    ($ty:ty, patient = $patient:path) => {
        impl ::medrec_storage::PatientScoped for $ty {
            fn patient_filter(patient_id: ::uuid::Uuid) -> Self::Filter {
                $patient(patient_id)
            }
        }
    };
    ($ty:ty, patient = $patient:path, encounter = $encounter:path) => {
        impl_scopes!($ty, patient = $patient);

        impl ::medrec_storage::EncounterScoped for $ty {
            fn encounter_filter(encounter_id: ::uuid::Uuid) -> Self::Filter {
                $encounter(encounter_id)
            }
        }
    };
}

pub mod billing;
pub mod consents;
pub mod diagnostics;
pub mod documents;
pub mod encounters;
pub mod imaging;
pub mod inbox;
pub mod measures;
pub mod oncology;
pub mod patients;
pub mod practitioners;
pub mod surgery;
pub mod vision;

pub use billing::{Claim, ClaimDiagnosis, ClaimItem, ClaimProcedure};
pub use consents::Consent;
pub use diagnostics::{DiagnosticReport, ServiceRequest, Specimen};
pub use documents::{Composition, CompositionSection};
pub use encounters::Encounter;
pub use imaging::ImagingStudy;
pub use inbox::InboxMessage;
pub use measures::MeasureReport;
pub use oncology::{CancerDiagnosis, ChemoCycle, ChemoProtocol};
pub use patients::Patient;
pub use practitioners::Practitioner;
pub use surgery::{SurgicalCase, SurgicalTeamMember, SurgicalTimeEvent};
pub use vision::{VisionLensSpec, VisionPrescription};

pub(crate) fn default_true() -> bool {
    true
}
