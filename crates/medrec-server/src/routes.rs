//! Route table of the resource API.
//!
//! Every resource gets list/search, create, read, update, delete and
//! by-fhir-id routes under its path. Compartment and child collection routes
//! are added per resource below.

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get};
use medrec_core::Validate;
use medrec_db_postgres::{PgChild, PgChildRepository, PgEntity, PgRepository, TenantPool};
use medrec_resources::{
    CancerDiagnosis, ChemoCycle, ChemoProtocol, Claim, ClaimDiagnosis, ClaimItem, ClaimProcedure,
    Composition, CompositionSection, Consent, DiagnosticReport, Encounter, ImagingStudy,
    InboxMessage, MeasureReport, Patient, Practitioner, ServiceRequest, Specimen,
    SurgicalCase, SurgicalTeamMember, SurgicalTimeEvent, VisionLensSpec, VisionPrescription,
};
use medrec_storage::{DynRepository, EncounterScoped, PatientScoped, Resource};

use crate::extract::RequestSettings;
use crate::handlers;
use crate::service::{ChildService, ResourceService};
use crate::state::{ChildState, ResourceState};

/// Builds the full resource API on top of one tenant pool.
pub fn api_router(tenants: TenantPool, settings: Arc<RequestSettings>) -> Router {
    let ctx = RouteContext { tenants, settings };

    Router::new()
        .merge(ctx.resource::<Patient>("/patients").build())
        .merge(ctx.resource::<Practitioner>("/practitioners").build())
        .merge(
            ctx.resource::<Encounter>("/encounters")
                .patient_compartment()
                .build(),
        )
        // Diagnostics
        .merge(
            ctx.resource::<ServiceRequest>("/service-requests")
                .patient_compartment()
                .encounter_compartment()
                .build(),
        )
        .merge(
            ctx.resource::<Specimen>("/specimens")
                .patient_compartment()
                .build(),
        )
        .merge(
            ctx.resource::<DiagnosticReport>("/diagnostic-reports")
                .patient_compartment()
                .encounter_compartment()
                .build(),
        )
        .merge(
            ctx.resource::<ImagingStudy>("/imaging-studies")
                .patient_compartment()
                .build(),
        )
        .merge(
            ctx.resource::<Consent>("/consents")
                .patient_compartment()
                .build(),
        )
        // Documents
        .merge(
            ctx.resource::<Composition>("/compositions")
                .patient_compartment()
                .encounter_compartment()
                .build(),
        )
        .merge(ctx.children::<CompositionSection>("/compositions", "sections"))
        // Billing
        .merge(ctx.resource::<Claim>("/claims").patient_compartment().build())
        .merge(ctx.children::<ClaimItem>("/claims", "items"))
        .merge(ctx.children::<ClaimDiagnosis>("/claims", "diagnoses"))
        .merge(ctx.children::<ClaimProcedure>("/claims", "procedures"))
        // Surgery
        .merge(
            ctx.resource::<SurgicalCase>("/surgical-cases")
                .patient_compartment()
                .build(),
        )
        .merge(ctx.children::<SurgicalTeamMember>("/surgical-cases", "team-members"))
        .merge(ctx.children::<SurgicalTimeEvent>("/surgical-cases", "time-events"))
        // Oncology
        .merge(
            ctx.resource::<CancerDiagnosis>("/cancer-diagnoses")
                .patient_compartment()
                .build(),
        )
        .merge(
            ctx.resource::<ChemoProtocol>("/chemo-protocols")
                .patient_compartment()
                .build(),
        )
        .merge(ctx.children::<ChemoCycle>("/chemo-protocols", "cycles"))
        // Messaging and reporting
        .merge(ctx.resource::<InboxMessage>("/inbox-messages").build())
        .merge(ctx.resource::<MeasureReport>("/measure-reports").build())
        // Vision
        .merge(
            ctx.resource::<VisionPrescription>("/vision-prescriptions")
                .patient_compartment()
                .build(),
        )
        .merge(ctx.children::<VisionLensSpec>("/vision-prescriptions", "lens-specs"))
}

struct RouteContext {
    tenants: TenantPool,
    settings: Arc<RequestSettings>,
}

impl RouteContext {
    fn repository<R: PgEntity>(&self) -> DynRepository<R> {
        Arc::new(PgRepository::<R>::new(self.tenants.clone()))
    }

    fn resource<R: PgEntity + Validate>(&self, path: &'static str) -> ResourceRoutes<R> {
        ResourceRoutes::new(
            path,
            ResourceState {
                service: ResourceService::new(self.repository::<R>()),
                settings: Arc::clone(&self.settings),
            },
        )
    }

    /// `GET|POST /<parent>/{id}/<segment>` and `DELETE /<parent>/{id}/<segment>/{child_id}`.
    fn children<C>(&self, parent_path: &str, segment: &str) -> Router
    where
        C: PgChild + Validate,
        C::Parent: PgEntity,
    {
        let children = Arc::new(PgChildRepository::<C>::new(self.tenants.clone()));
        let state = ChildState {
            service: ChildService::new(self.repository::<C::Parent>(), children),
            settings: Arc::clone(&self.settings),
        };
        let collection = format!("{parent_path}/{{id}}/{segment}");

        Router::new()
            .route(
                &collection,
                get(handlers::list_children::<C>).post(handlers::add_child::<C>),
            )
            .route(
                &format!("{collection}/{{child_id}}"),
                delete(handlers::remove_child::<C>),
            )
            .with_state(state)
    }
}

struct ResourceRoutes<R: Resource> {
    path: &'static str,
    state: ResourceState<R>,
    router: Router<ResourceState<R>>,
}

impl<R: Resource + Validate> ResourceRoutes<R> {
    fn new(path: &'static str, state: ResourceState<R>) -> Self {
        let router = Router::new()
            .route(
                path,
                get(handlers::search_resource::<R>).post(handlers::create_resource::<R>),
            )
            .route(
                &format!("{path}/{{id}}"),
                get(handlers::read_resource::<R>)
                    .put(handlers::update_resource::<R>)
                    .delete(handlers::delete_resource::<R>),
            )
            .route(
                &format!("{path}/by-fhir-id/{{fhir_id}}"),
                get(handlers::read_resource_by_fhir_id::<R>),
            );
        Self {
            path,
            state,
            router,
        }
    }

    fn patient_compartment(mut self) -> Self
    where
        R: PatientScoped,
    {
        self.router = self.router.route(
            &format!("/patients/{{id}}{}", self.path),
            get(handlers::search_patient_compartment::<R>),
        );
        self
    }

    fn encounter_compartment(mut self) -> Self
    where
        R: EncounterScoped,
    {
        self.router = self.router.route(
            &format!("/encounters/{{id}}{}", self.path),
            get(handlers::search_encounter_compartment::<R>),
        );
        self
    }

    fn build(self) -> Router {
        self.router.with_state(self.state)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use medrec_db_postgres::{PostgresConfig, TenancyOptions, create_lazy_pool};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;

    fn router() -> Router {
        let pool = create_lazy_pool(
            &PostgresConfig::new("postgres://medrec@127.0.0.1:1/medrec")
                .with_connect_timeout_ms(200),
        )
        .unwrap();
        let settings = RequestSettings::from_config(&AppConfig::default()).unwrap();
        api_router(TenantPool::new(pool, TenancyOptions::default()), Arc::new(settings))
    }

    async fn status(method: &str, uri: &str) -> StatusCode {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        router().oneshot(request).await.unwrap().status()
    }

    // Requests without a tenant header fail in the extractor, so a 400 proves
    // the route matched without needing a database.
    #[tokio::test]
    async fn resource_routes_are_mounted() {
        let id = uuid::Uuid::new_v4();
        for uri in [
            "/patients".to_string(),
            format!("/claims/{id}"),
            "/measure-reports/by-fhir-id/mr-1".to_string(),
            format!("/patients/{id}/vision-prescriptions"),
            format!("/encounters/{id}/compositions"),
            format!("/surgical-cases/{id}/time-events"),
            format!("/chemo-protocols/{id}/cycles"),
        ] {
            assert_eq!(status("GET", &uri).await, StatusCode::BAD_REQUEST, "{uri}");
        }
        let delete_uri = format!("/claims/{id}/diagnoses/{}", uuid::Uuid::new_v4());
        assert_eq!(status("DELETE", &delete_uri).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unscoped_compartments_are_absent() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(
            status("GET", &format!("/patients/{id}/inbox-messages")).await,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status("GET", &format!("/encounters/{id}/specimens")).await,
            StatusCode::NOT_FOUND
        );
    }
}
