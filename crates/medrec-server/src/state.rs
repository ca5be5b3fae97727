use std::sync::Arc;

use axum::extract::FromRef;
use medrec_storage::{ChildResource, Resource};

use crate::extract::RequestSettings;
use crate::service::{ChildService, ResourceService};

/// Router state for the endpoints of one resource type.
pub struct ResourceState<R: Resource> {
    pub service: ResourceService<R>,
    pub settings: Arc<RequestSettings>,
}

impl<R: Resource> Clone for ResourceState<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<R: Resource> FromRef<ResourceState<R>> for Arc<RequestSettings> {
    fn from_ref(state: &ResourceState<R>) -> Self {
        Arc::clone(&state.settings)
    }
}

/// Router state for one child collection.
pub struct ChildState<C: ChildResource> {
    pub service: ChildService<C>,
    pub settings: Arc<RequestSettings>,
}

impl<C: ChildResource> Clone for ChildState<C> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<C: ChildResource> FromRef<ChildState<C>> for Arc<RequestSettings> {
    fn from_ref(state: &ChildState<C>) -> Self {
        Arc::clone(&state.settings)
    }
}
