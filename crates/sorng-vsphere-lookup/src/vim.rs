//! The seam between the lookups and whatever talks to vSphere.
//!
//! [`VsphereClient`](crate::vsphere::VsphereClient) implements this over
//! the VI/JSON API; tests plug in an in-memory fake.

use crate::error::VsphereResult;
use crate::types::{ManagedObjectReference, ServiceContent};

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Flat map from property path (`networkInfo.vswitch`) to its value.
///
/// Properties the server does not report are simply absent.
pub type PropertySet = Map<String, Value>;

/// Minimal vSphere API surface required by the lookups.
#[async_trait]
pub trait VimApi: Send + Sync {
    /// Endpoint description (root folder, property collector, API type).
    async fn service_content(&self) -> VsphereResult<ServiceContent>;

    /// Read properties of one managed object.
    ///
    /// `None` retrieves every property of the object.
    async fn retrieve_properties(
        &self,
        obj: &ManagedObjectReference,
        paths: Option<&[&str]>,
    ) -> VsphereResult<PropertySet>;

    /// Read the same `paths` of several objects, results in input order.
    ///
    /// Objects the server reports nothing for map to an empty set.
    async fn retrieve_properties_many(
        &self,
        objs: &[ManagedObjectReference],
        paths: &[&str],
    ) -> VsphereResult<Vec<PropertySet>> {
        let mut out = Vec::with_capacity(objs.len());
        for obj in objs {
            out.push(self.retrieve_properties(obj, Some(paths)).await?);
        }
        Ok(out)
    }
}
