//! Name-based lookups for host networking objects.
//!
//! Every operation is one bounded request/response round trip: fetch a
//! property set or run an inventory search, then scan the result for an
//! exact, case-sensitive name match. The first match wins, which assumes
//! names are unique in the scanned scope (vSphere does not guarantee this
//! for every scope and it is not checked here).

use crate::error::{VsphereError, VsphereResult};
use crate::finder::Finder;
use crate::property::{retrieve_one, retrieve_property};
use crate::types::*;
use crate::vim::VimApi;

use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostNetworkInfo {
    #[serde(default)]
    vswitch: Vec<HostVirtualSwitch>,
    #[serde(default)]
    portgroup: Vec<HostPortGroup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostNetworkSystemProps {
    #[serde(default)]
    network_info: HostNetworkInfo,
}

/// Host-network and vCenter-network lookups.
pub struct NetworkLookup<'a, A: VimApi + ?Sized> {
    api: &'a A,
    timeout: Duration,
}

impl<'a, A: VimApi + ?Sized> NetworkLookup<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api, timeout: DEFAULT_API_TIMEOUT }
    }

    /// Take the per-operation bound from `config.api_timeout_secs`.
    pub fn from_config(api: &'a A, config: &VsphereConfig) -> Self {
        Self::new(api).with_timeout(config.api_timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> VsphereResult<T>
    where
        F: Future<Output = VsphereResult<T>>,
    {
        tokio::time::timeout(self.timeout, fut).await.map_err(|_| {
            VsphereError::timeout(format!("{what} timed out after {:?}", self.timeout))
        })?
    }

    // ── Endpoint checks ─────────────────────────────────────────────

    /// Fail unless connected to vCenter.
    pub async fn validate_virtual_center(&self) -> VsphereResult<()> {
        let content = self
            .bounded("reading service content", self.api.service_content())
            .await?;
        if !content.is_virtual_center() {
            return Err(VsphereError::validation(
                "this operation is only supported on vCenter",
            ));
        }
        Ok(())
    }

    // ── Hosts ───────────────────────────────────────────────────────

    /// Resolve a host by managed object ID, confirming it exists.
    pub async fn host_system_from_id(&self, id: &str) -> VsphereResult<HostSystem> {
        let host = HostSystem::new(id);
        self.bounded(
            "host lookup",
            retrieve_property::<String, A>(self.api, host.reference(), "name"),
        )
        .await
        .map_err(|e| e.context(format!("could not find host system with ID {id}")))?;
        Ok(host)
    }

    /// The network system from the host's configuration manager.
    pub async fn host_network_system_from_host_system(
        &self,
        host: &HostSystem,
    ) -> VsphereResult<HostNetworkSystem> {
        log::debug!("resolving network system of {}", host.reference());
        let ns: Option<ManagedObjectReference> = self
            .bounded(
                "network system lookup",
                retrieve_property(self.api, host.reference(), "configManager.networkSystem"),
            )
            .await?;
        ns.map(|r| HostNetworkSystem::new(r.value)).ok_or_else(|| {
            VsphereError::not_found(format!(
                "host {} has no network system",
                host.reference().value
            ))
        })
    }

    pub async fn host_network_system_from_host_system_id(
        &self,
        id: &str,
    ) -> VsphereResult<HostNetworkSystem> {
        let host = self.host_system_from_id(id).await?;
        self.host_network_system_from_host_system(&host).await
    }

    async fn host_network_info(
        &self,
        ns: &HostNetworkSystem,
        path: &str,
    ) -> VsphereResult<HostNetworkInfo> {
        let props: HostNetworkSystemProps = self
            .bounded(
                "host network properties",
                retrieve_one(self.api, ns.reference(), Some(&[path][..])),
            )
            .await
            .map_err(|e| e.context("error fetching host network properties"))?;
        Ok(props.network_info)
    }

    // ── Host networking ─────────────────────────────────────────────

    /// Find a standard virtual switch on `ns` by name.
    pub async fn host_vswitch_from_name(
        &self,
        ns: &HostNetworkSystem,
        name: &str,
    ) -> VsphereResult<HostVirtualSwitch> {
        log::debug!("looking up virtual switch {name:?} on {}", ns.reference());
        let info = self.host_network_info(ns, "networkInfo.vswitch").await?;
        info.vswitch
            .into_iter()
            .find(|sw| sw.name == name)
            .ok_or_else(|| VsphereError::not_found(format!("could not find virtual switch {name}")))
    }

    /// Find a port group on `ns` by its spec name.
    pub async fn host_port_group_from_name(
        &self,
        ns: &HostNetworkSystem,
        name: &str,
    ) -> VsphereResult<HostPortGroup> {
        log::debug!("looking up port group {name:?} on {}", ns.reference());
        let info = self.host_network_info(ns, "networkInfo.portgroup").await?;
        info.portgroup
            .into_iter()
            .find(|pg| pg.spec.name == name)
            .ok_or_else(|| VsphereError::not_found(format!("could not find port group {name}")))
    }

    // ── vCenter networks ────────────────────────────────────────────

    /// Every property of a `Network`.
    pub async fn network_properties(&self, net: &Network) -> VsphereResult<NetworkProperties> {
        self.bounded(
            "network properties",
            retrieve_one(self.api, net.reference(), None),
        )
        .await
    }

    /// The vCenter `Network` named `name` that `host` participates in.
    ///
    /// Only standard networks qualify; distributed port groups and opaque
    /// networks with the same name are skipped.
    pub async fn network_object_from_host_system(
        &self,
        host: &HostSystem,
        name: &str,
    ) -> VsphereResult<Network> {
        self.validate_virtual_center().await?;

        let host_id = &host.reference().value;
        let pattern = format!("*/{name}");
        let hits = self
            .bounded("network search", Finder::new(self.api).network_list(&pattern))
            .await?;

        for hit in hits {
            let net = match hit.object {
                NetworkReference::Network(net) => net,
                NetworkReference::DistributedVirtualPortgroup(_)
                | NetworkReference::OpaqueNetwork(_) => continue,
            };
            let props = self.network_properties(&net).await?;
            if props.is_backed_by(host_id) {
                log::debug!("network {name:?} on host {host_id} is {}", hit.path);
                return Ok(net);
            }
        }

        Err(VsphereError::not_found(format!(
            "could not find a matching {name:?} on host ID {host_id:?}"
        )))
    }
}
