//! Aggregate service façade for the lookup crate.
//!
//! `VsphereLookupService` owns the `VsphereClient` and exposes every
//! lookup against it. Shared callers hold
//! `VsphereLookupServiceState = Arc<Mutex<VsphereLookupService>>`.

use crate::error::{VsphereError, VsphereResult};
use crate::lookup::NetworkLookup;
use crate::types::*;
use crate::vsphere::VsphereClient;

use std::sync::Arc;
use tokio::sync::Mutex;

/// Thread-safe handle for callers that share one connection.
pub type VsphereLookupServiceState = Arc<Mutex<VsphereLookupService>>;

/// Owns the vSphere session and hands out lookups.
#[derive(Default)]
pub struct VsphereLookupService {
    client: Option<VsphereClient>,
}

impl VsphereLookupService {
    /// Create a new (disconnected) service.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_state() -> VsphereLookupServiceState {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Whether we have an active vSphere session.
    pub fn is_connected(&self) -> bool {
        self.client
            .as_ref()
            .map(|c| c.is_connected())
            .unwrap_or(false)
    }

    fn require_client(&self) -> VsphereResult<&VsphereClient> {
        self.client
            .as_ref()
            .filter(|c| c.is_connected())
            .ok_or_else(|| {
                VsphereError::connection("Not connected to vSphere. Call connect first.")
            })
    }

    /// Lookups bound to the current session and its configured timeout.
    pub fn lookup(&self) -> VsphereResult<NetworkLookup<'_, VsphereClient>> {
        let c = self.require_client()?;
        Ok(NetworkLookup::from_config(c, c.config()))
    }

    // ── Connection ──────────────────────────────────────────────────

    /// Connect to a vCenter / ESXi endpoint, replacing any prior session.
    pub async fn connect(&mut self, config: VsphereConfig) -> VsphereResult<String> {
        self.disconnect().await?;
        let mut client = VsphereClient::new(&config)?;
        let session = client.login().await?;
        self.client = Some(client);
        Ok(session)
    }

    /// Disconnect from vSphere.
    pub async fn disconnect(&mut self) -> VsphereResult<()> {
        if let Some(mut client) = self.client.take() {
            client.logout().await?;
            log::info!("vSphere session with {} closed", client.config().host);
        }
        Ok(())
    }

    /// Check if the session is still valid.
    pub async fn check_session(&self) -> VsphereResult<bool> {
        match self.client {
            Some(ref client) if client.is_connected() => client.check_session().await,
            _ => Ok(false),
        }
    }

    /// Current config (without password).
    pub fn get_config(&self) -> Option<VsphereConfigSafe> {
        self.client.as_ref().map(|c| {
            let cfg = c.config();
            VsphereConfigSafe {
                host: cfg.host.clone(),
                port: cfg.port,
                username: cfg.username.clone(),
                insecure: cfg.insecure,
                api_release: cfg.api_release.clone(),
            }
        })
    }

    // ── Lookups ─────────────────────────────────────────────────────

    pub async fn host_network_system_from_host_system_id(
        &self,
        host_id: &str,
    ) -> VsphereResult<HostNetworkSystem> {
        self.lookup()?
            .host_network_system_from_host_system_id(host_id)
            .await
    }

    pub async fn host_vswitch_from_name(
        &self,
        host_id: &str,
        name: &str,
    ) -> VsphereResult<HostVirtualSwitch> {
        let lookup = self.lookup()?;
        let ns = lookup.host_network_system_from_host_system_id(host_id).await?;
        lookup.host_vswitch_from_name(&ns, name).await
    }

    pub async fn host_port_group_from_name(
        &self,
        host_id: &str,
        name: &str,
    ) -> VsphereResult<HostPortGroup> {
        let lookup = self.lookup()?;
        let ns = lookup.host_network_system_from_host_system_id(host_id).await?;
        lookup.host_port_group_from_name(&ns, name).await
    }

    pub async fn network_properties(&self, network_id: &str) -> VsphereResult<NetworkProperties> {
        self.lookup()?
            .network_properties(&Network::new(network_id))
            .await
    }

    pub async fn network_object_from_host_system_id(
        &self,
        host_id: &str,
        name: &str,
    ) -> VsphereResult<Network> {
        let lookup = self.lookup()?;
        let host = lookup.host_system_from_id(host_id).await?;
        lookup.network_object_from_host_system(&host, name).await
    }
}
