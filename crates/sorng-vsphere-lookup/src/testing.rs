//! In-memory [`VimApi`] used by the unit tests.

use crate::error::{VsphereError, VsphereResult};
use crate::types::{AboutInfo, ApiType, ManagedObjectReference, ServiceContent};
use crate::vim::{PropertySet, VimApi};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) const ROOT_FOLDER: &str = "group-d1";

pub(crate) struct FakeVim {
    content: ServiceContent,
    objects: HashMap<ManagedObjectReference, Value>,
    failures: HashMap<ManagedObjectReference, VsphereError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeVim {
    fn with_api_type(api_type: ApiType) -> Self {
        Self {
            content: ServiceContent {
                root_folder: ManagedObjectReference::new("Folder", ROOT_FOLDER),
                property_collector: ManagedObjectReference::new("PropertyCollector", "propertyCollector"),
                about: AboutInfo {
                    name: "VMware vCenter Server".into(),
                    api_type,
                    api_version: "8.0.1.0".into(),
                    ..Default::default()
                },
            },
            objects: HashMap::new(),
            failures: HashMap::new(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn vcenter() -> Self {
        Self::with_api_type(ApiType::VirtualCenter)
    }

    pub(crate) fn standalone_host() -> Self {
        Self::with_api_type(ApiType::HostAgent)
    }

    /// Register an object; `props` is its nested property tree.
    pub(crate) fn with_object(mut self, kind: &str, value: &str, props: Value) -> Self {
        self.objects.insert(ManagedObjectReference::new(kind, value), props);
        self
    }

    pub(crate) fn with_failure(mut self, kind: &str, value: &str, err: VsphereError) -> Self {
        self.failures.insert(ManagedObjectReference::new(kind, value), err);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of property retrievals issued so far.
    pub(crate) fn retrieve_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn lookup<'v>(tree: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(tree, |node, seg| node.get(seg))
}

impl FakeVim {
    async fn begin_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn props_of(
        &self,
        obj: &ManagedObjectReference,
        paths: Option<&[&str]>,
    ) -> VsphereResult<PropertySet> {
        if let Some(err) = self.failures.get(obj) {
            return Err(err.clone());
        }
        let tree = self.objects.get(obj).ok_or_else(|| {
            VsphereError::not_found(format!("ManagedObjectNotFound: {obj}"))
        })?;

        let mut out = PropertySet::new();
        match paths {
            None => {
                if let Value::Object(map) = tree {
                    out.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
            Some(paths) => {
                for path in paths {
                    if let Some(v) = lookup(tree, path).filter(|v| !v.is_null()) {
                        out.insert((*path).to_string(), v.clone());
                    }
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl VimApi for FakeVim {
    async fn service_content(&self) -> VsphereResult<ServiceContent> {
        Ok(self.content.clone())
    }

    async fn retrieve_properties(
        &self,
        obj: &ManagedObjectReference,
        paths: Option<&[&str]>,
    ) -> VsphereResult<PropertySet> {
        self.begin_call().await;
        self.props_of(obj, paths)
    }

    /// One round trip for the whole batch, like a single collector call.
    async fn retrieve_properties_many(
        &self,
        objs: &[ManagedObjectReference],
        paths: &[&str],
    ) -> VsphereResult<Vec<PropertySet>> {
        self.begin_call().await;
        objs.iter().map(|obj| self.props_of(obj, Some(paths))).collect()
    }
}
