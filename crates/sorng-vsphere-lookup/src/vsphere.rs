//! vSphere VI/JSON HTTP client with session-based authentication.
//!
//! Talks to vCenter / ESXi via `https://{host}/sdk/vim25/{release}/...`,
//! which exposes managed-object methods and properties as JSON. Manages the
//! session lifecycle and implements [`VimApi`] through the property
//! collector's `RetrievePropertiesEx`.

use crate::error::{VsphereError, VsphereErrorKind, VsphereResult};
use crate::types::{ManagedObjectReference, ServiceContent, VsphereConfig};
use crate::vim::{PropertySet, VimApi};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

const SESSION_HEADER: &str = "vmware-api-session-id";

/// VI/JSON API client.
pub struct VsphereClient {
    client: Client,
    base_url: Url,
    session_id: Option<String>,
    content: Option<ServiceContent>,
    config: VsphereConfig,
}

#[derive(Debug, Deserialize)]
struct DynamicProperty {
    name: String,
    #[serde(default)]
    val: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalizedMethodFault {
    #[serde(default)]
    fault: Value,
    #[serde(default)]
    localized_message: Option<String>,
}

/// A property the collector could not read, with the reason.
#[derive(Debug, Deserialize)]
struct MissingProperty {
    path: String,
    fault: LocalizedMethodFault,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectContent {
    obj: ManagedObjectReference,
    #[serde(default)]
    prop_set: Vec<DynamicProperty>,
    #[serde(default)]
    missing_set: Vec<MissingProperty>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrieveResult {
    #[serde(default)]
    objects: Vec<ObjectContent>,
    /// Set when more pages wait behind `ContinueRetrievePropertiesEx`
    #[serde(default)]
    token: Option<String>,
}

impl VsphereClient {
    /// Build a new client from config (does NOT create a session yet).
    pub fn new(config: &VsphereConfig) -> VsphereResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VsphereError::connection(format!("Failed to build HTTP client: {e}")))?;

        let base_url = sdk_base_url(config)?;

        Ok(Self {
            client,
            base_url,
            session_id: None,
            content: None,
            config: config.clone(),
        })
    }

    /// Base URL for API calls (`https://{host}[:{port}]/sdk/vim25/{release}`).
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Whether we have an active session.
    pub fn is_connected(&self) -> bool {
        self.session_id.is_some()
    }

    /// Current session ID (if any).
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Current config.
    pub fn config(&self) -> &VsphereConfig {
        &self.config
    }

    // ── Session management ──────────────────────────────────────────

    /// Log in via `SessionManager.Login` and load the service content.
    pub async fn login(&mut self) -> VsphereResult<String> {
        let url = endpoint(&self.base_url, &["SessionManager", "SessionManager", "Login"]);
        let resp = self
            .client
            .post(url)
            .json(&json!({
                "userName": self.config.username,
                "password": self.config.password,
            }))
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let session_id = resp
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| VsphereError::auth("Login response carried no session id"))?;
        self.session_id = Some(session_id.clone());

        let content: ServiceContent = match self
            .get(&["ServiceInstance", "ServiceInstance", "content"])
            .await
        {
            Ok(content) => content,
            Err(e) => {
                self.logout().await?;
                return Err(e.context("Failed to load service content"));
            }
        };
        log::info!(
            "vSphere session established with {} ({:?} {})",
            self.config.host,
            content.about.api_type,
            content.about.api_version
        );
        self.content = Some(content);
        Ok(session_id)
    }

    /// Log out (best effort) and forget the session.
    pub async fn logout(&mut self) -> VsphereResult<()> {
        if let Some(ref sid) = self.session_id {
            let url = endpoint(&self.base_url, &["SessionManager", "SessionManager", "Logout"]);
            if let Err(e) = self
                .client
                .post(url)
                .header(SESSION_HEADER, sid.as_str())
                .send()
                .await
            {
                log::warn!("vSphere logout from {} failed: {e}", self.config.host);
            }
        }
        self.session_id = None;
        self.content = None;
        Ok(())
    }

    /// Whether the server still knows our session.
    pub async fn check_session(&self) -> VsphereResult<bool> {
        let current: Value = self
            .get(&["SessionManager", "SessionManager", "currentSession"])
            .await?;
        Ok(!current.is_null())
    }

    // ── HTTP helpers ────────────────────────────────────────────────

    fn require_session(&self) -> VsphereResult<&str> {
        self.session_id
            .as_deref()
            .ok_or_else(|| VsphereError::auth("Not logged in — no active session"))
    }

    /// GET a property or object path, parse JSON.
    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> VsphereResult<T> {
        let sid = self.require_session()?;
        let resp = self
            .client
            .get(endpoint(&self.base_url, segments))
            .header(SESSION_HEADER, sid)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        parse_response(resp).await
    }

    /// Invoke a managed-object method with a JSON body, parse JSON.
    async fn invoke<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &Value,
    ) -> VsphereResult<T> {
        let sid = self.require_session()?;
        let resp = self
            .client
            .post(endpoint(&self.base_url, segments))
            .header(SESSION_HEADER, sid)
            .json(body)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        parse_response(resp).await
    }

    fn property_collector(&self) -> VsphereResult<String> {
        self.content
            .as_ref()
            .map(|c| c.property_collector.value.clone())
            .ok_or_else(|| VsphereError::connection("Not connected to vSphere. Call login first."))
    }

    /// `RetrievePropertiesEx` plus every `ContinueRetrievePropertiesEx` page.
    async fn retrieve_all(&self, request: &Value) -> VsphereResult<Vec<ObjectContent>> {
        let collector = self.property_collector()?;
        let mut page: Option<RetrieveResult> = self
            .invoke(&["PropertyCollector", collector.as_str(), "RetrievePropertiesEx"], request)
            .await?;

        let mut objects = Vec::new();
        while let Some(result) = page.take() {
            objects.extend(result.objects);
            if let Some(token) = result.token {
                page = self
                    .invoke(
                        &["PropertyCollector", collector.as_str(), "ContinueRetrievePropertiesEx"],
                        &json!({ "token": token }),
                    )
                    .await?;
            }
        }
        Ok(objects)
    }
}

#[async_trait]
impl VimApi for VsphereClient {
    async fn service_content(&self) -> VsphereResult<ServiceContent> {
        self.content
            .clone()
            .ok_or_else(|| VsphereError::connection("Not connected to vSphere. Call login first."))
    }

    async fn retrieve_properties(
        &self,
        obj: &ManagedObjectReference,
        paths: Option<&[&str]>,
    ) -> VsphereResult<PropertySet> {
        let objects = self
            .retrieve_all(&retrieve_request(std::slice::from_ref(obj), paths))
            .await?;
        match objects.into_iter().next() {
            Some(content) => Ok(into_property_set(content)?.1),
            None => Ok(PropertySet::new()),
        }
    }

    async fn retrieve_properties_many(
        &self,
        objs: &[ManagedObjectReference],
        paths: &[&str],
    ) -> VsphereResult<Vec<PropertySet>> {
        if objs.is_empty() {
            return Ok(Vec::new());
        }
        let objects = self.retrieve_all(&retrieve_request(objs, Some(paths))).await?;
        let mut by_ref = HashMap::with_capacity(objects.len());
        for content in objects {
            let (obj, props) = into_property_set(content)?;
            by_ref.insert(obj, props);
        }
        Ok(objs
            .iter()
            .map(|o| by_ref.get(o).cloned().unwrap_or_default())
            .collect())
    }
}

// ── Internal helpers ────────────────────────────────────────────────

fn sdk_base_url(config: &VsphereConfig) -> VsphereResult<Url> {
    let mut url = Url::parse(&format!("https://{}:{}/", config.host, config.port))
        .map_err(|e| VsphereError::connection(format!("Invalid vSphere host {:?}: {e}", config.host)))?;
    url.path_segments_mut()
        .map_err(|_| VsphereError::connection(format!("Invalid vSphere host {:?}", config.host)))?
        .clear()
        .extend(["sdk", "vim25", config.api_release.as_str()]);
    Ok(url)
}

/// Append percent-encoded path segments to the SDK base URL.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// One filter spec over `objs`, with a property spec per distinct kind.
fn retrieve_request(objs: &[ManagedObjectReference], paths: Option<&[&str]>) -> Value {
    let mut kinds: Vec<&str> = Vec::new();
    for obj in objs {
        if !kinds.contains(&obj.kind.as_str()) {
            kinds.push(&obj.kind);
        }
    }
    let prop_set: Vec<Value> = kinds
        .into_iter()
        .map(|kind| match paths {
            None => json!({"_typeName": "PropertySpec", "type": kind, "all": true}),
            Some(paths) => json!({"_typeName": "PropertySpec", "type": kind, "pathSet": paths}),
        })
        .collect();
    let object_set: Vec<Value> = objs
        .iter()
        .map(|obj| json!({"_typeName": "ObjectSpec", "obj": obj}))
        .collect();
    json!({
        "specSet": [{
            "_typeName": "PropertyFilterSpec",
            "propSet": prop_set,
            "objectSet": object_set,
        }],
        "options": {"_typeName": "RetrieveOptions"},
    })
}

/// Flatten one object's `propSet`; any `missingSet` entry is an error.
fn into_property_set(
    content: ObjectContent,
) -> VsphereResult<(ManagedObjectReference, PropertySet)> {
    if let Some(missing) = content.missing_set.into_iter().next() {
        let fallback = missing.fault.localized_message.unwrap_or_default();
        let err = fault_from_value(&missing.fault.fault)
            .unwrap_or_else(|| VsphereError::fault("MethodFault", fallback));
        return Err(err.context(format!("cannot read {} of {}", missing.path, content.obj)));
    }
    let props = content
        .prop_set
        .into_iter()
        .map(|p| (p.name, unbox(p.val)))
        .collect();
    Ok((content.obj, props))
}

/// `anyType` values arrive boxed as `{"_typeName": "ArrayOfX", "_value": [...]}`.
fn unbox(val: Value) -> Value {
    match val {
        Value::Object(mut map) if map.contains_key("_typeName") && map.contains_key("_value") => {
            map.remove("_value").unwrap_or(Value::Null)
        }
        other => other,
    }
}

async fn check_status(resp: Response) -> VsphereResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(fault_to_error(status, &body))
}

/// Map a failed response to an error, preferring the vSphere fault type.
fn fault_to_error(status: StatusCode, body: &str) -> VsphereError {
    let code = status.as_u16();
    match status {
        StatusCode::UNAUTHORIZED => {
            return VsphereError::auth(format!("Session expired or invalid: {body}"))
        }
        StatusCode::FORBIDDEN => {
            return VsphereError::new(VsphereErrorKind::AccessDenied, format!("Access denied: {body}"))
        }
        _ => {}
    }

    let fault = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| fault_from_value(&v));

    match fault {
        Some(err) => err,
        None if status == StatusCode::NOT_FOUND => {
            VsphereError::not_found(format!("Resource not found: {body}"))
        }
        None => VsphereError::api(code, format!("API error {code}: {body}")),
    }
}

/// Map a vSphere fault object (`{"_typeName": "NoPermission", ...}`).
fn fault_from_value(v: &Value) -> Option<VsphereError> {
    let kind = v.get("_typeName")?.as_str()?;
    let message = v
        .get("faultMessage")
        .and_then(Value::as_array)
        .and_then(|msgs| msgs.iter().find_map(|m| m.get("message")?.as_str()))
        .or_else(|| v.get("message").and_then(Value::as_str))
        .unwrap_or_default();
    let text = if message.is_empty() { kind.to_string() } else { format!("{kind}: {message}") };
    Some(match kind {
        "ManagedObjectNotFound" => VsphereError::not_found(text),
        "NotAuthenticated" | "InvalidLogin" => VsphereError::auth(text),
        "NoPermission" => VsphereError::new(VsphereErrorKind::AccessDenied, text),
        _ => VsphereError::fault(kind, text),
    })
}

async fn parse_response<T: DeserializeOwned>(resp: Response) -> VsphereResult<T> {
    let text = resp.text().await.map_err(|e| {
        VsphereError::parse(format!("Failed to read response body: {e}"))
    })?;

    if text.is_empty() {
        // void methods and unset properties come back with an empty body
        return serde_json::from_str("null").map_err(|e| {
            VsphereError::parse(format!("Cannot deserialise empty response: {e}"))
        });
    }

    serde_json::from_str(&text).map_err(|e| {
        let end = text.char_indices().nth(500).map(|(i, _)| i).unwrap_or(text.len());
        VsphereError::parse(format!("JSON parse error: {e} — body: {}", &text[..end]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VsphereConfig {
        VsphereConfig {
            host: "vc.lab.local".into(),
            username: "administrator@vsphere.local".into(),
            password: "secret".into(),
            ..Default::default()
        }
    }

    #[test]
    fn base_url_includes_release() {
        let client = VsphereClient::new(&config()).unwrap();
        assert_eq!(client.base_url(), "https://vc.lab.local/sdk/vim25/8.0.1.0");
        assert!(!client.is_connected());
    }

    #[test]
    fn endpoint_encodes_segments() {
        let base = sdk_base_url(&config()).unwrap();
        let url = endpoint(&base, &["Network", "network 1/a", "name"]);
        assert_eq!(
            url.as_str(),
            "https://vc.lab.local/sdk/vim25/8.0.1.0/Network/network%201%2Fa/name"
        );
    }

    #[test]
    fn retrieve_request_with_paths() {
        let obj = ManagedObjectReference::new("HostNetworkSystem", "networkSystem-10");
        let body = retrieve_request(std::slice::from_ref(&obj), Some(&["networkInfo.vswitch"][..]));
        let prop = &body["specSet"][0]["propSet"][0];
        assert_eq!(prop["type"], "HostNetworkSystem");
        assert_eq!(prop["pathSet"], json!(["networkInfo.vswitch"]));
        assert!(prop.get("all").is_none());
        assert_eq!(body["specSet"][0]["objectSet"][0]["obj"]["value"], "networkSystem-10");
        assert_eq!(
            body["specSet"][0]["objectSet"][0]["obj"]["_typeName"],
            "ManagedObjectReference"
        );
    }

    #[test]
    fn retrieve_request_all_properties() {
        let obj = ManagedObjectReference::new("Network", "network-1");
        let body = retrieve_request(std::slice::from_ref(&obj), None);
        assert_eq!(body["specSet"][0]["propSet"][0]["all"], true);
    }

    #[test]
    fn retrieve_request_groups_kinds() {
        let objs = vec![
            ManagedObjectReference::new("Network", "network-1"),
            ManagedObjectReference::new("DistributedVirtualPortgroup", "dvportgroup-1"),
            ManagedObjectReference::new("Network", "network-2"),
        ];
        let body = retrieve_request(&objs, Some(&["name"][..]));
        let prop_set = body["specSet"][0]["propSet"].as_array().unwrap();
        assert_eq!(prop_set.len(), 2);
        assert_eq!(prop_set[0]["type"], "Network");
        assert_eq!(prop_set[1]["type"], "DistributedVirtualPortgroup");
        assert_eq!(body["specSet"][0]["objectSet"].as_array().unwrap().len(), 3);
    }

    fn object_content(value: Value) -> ObjectContent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn property_set_unboxes_arrays() {
        let content = object_content(json!({
            "_typeName": "ObjectContent",
            "obj": {"_typeName": "ManagedObjectReference", "type": "Network", "value": "network-1"},
            "propSet": [
                {"_typeName": "DynamicProperty", "name": "name",
                 "val": {"_typeName": "string", "_value": "VM Network"}},
                {"_typeName": "DynamicProperty", "name": "host",
                 "val": {"_typeName": "ArrayOfManagedObjectReference", "_value": [
                    {"_typeName": "ManagedObjectReference", "type": "HostSystem", "value": "host-10"}
                 ]}},
                {"_typeName": "DynamicProperty", "name": "summary",
                 "val": {"_typeName": "NetworkSummary", "name": "VM Network", "accessible": true}}
            ]
        }));
        let (obj, props) = into_property_set(content).unwrap();
        assert_eq!(obj, ManagedObjectReference::new("Network", "network-1"));
        assert_eq!(props["name"], "VM Network");
        assert_eq!(props["host"][0]["value"], "host-10");
        assert_eq!(props["summary"]["accessible"], true);
    }

    #[test]
    fn missing_set_permission_fault_is_access_denied() {
        let content = object_content(json!({
            "obj": {"type": "HostNetworkSystem", "value": "networkSystem-10"},
            "missingSet": [{
                "_typeName": "MissingProperty",
                "path": "networkInfo.vswitch",
                "fault": {"_typeName": "LocalizedMethodFault",
                          "fault": {"_typeName": "NoPermission", "privilegeId": "Host.Config.Network"},
                          "localizedMessage": "Permission to perform this operation was denied."}
            }]
        }));
        let err = into_property_set(content).unwrap_err();
        assert_eq!(err.kind, VsphereErrorKind::AccessDenied);
        assert!(err.message.contains("networkInfo.vswitch"));
        assert!(err.message.contains("NoPermission"));
    }

    #[test]
    fn missing_set_other_fault_keeps_type() {
        let content = object_content(json!({
            "obj": {"type": "Network", "value": "network-1"},
            "missingSet": [{
                "path": "summary",
                "fault": {"fault": {"_typeName": "SystemError", "reason": "vpxd restarting"}}
            }]
        }));
        let err = into_property_set(content).unwrap_err();
        assert_eq!(err.kind, VsphereErrorKind::Fault("SystemError".into()));
    }

    #[test]
    fn missing_set_untyped_fault_uses_localized_message() {
        let content = object_content(json!({
            "obj": {"type": "Network", "value": "network-1"},
            "missingSet": [{"path": "host", "fault": {"localizedMessage": "unavailable"}}]
        }));
        let err = into_property_set(content).unwrap_err();
        assert_eq!(err.kind, VsphereErrorKind::Fault("MethodFault".into()));
        assert!(err.message.contains("unavailable"));
    }

    #[test]
    fn fault_mapping() {
        let err = fault_to_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"_typeName":"ManagedObjectNotFound","faultMessage":[],"obj":{"type":"HostSystem","value":"host-99"}}"#,
        );
        assert!(err.is_not_found());

        let err = fault_to_error(StatusCode::INTERNAL_SERVER_ERROR, r#"{"_typeName":"InvalidLogin"}"#);
        assert_eq!(err.kind, VsphereErrorKind::AuthenticationError);

        let err = fault_to_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"_typeName":"InvalidArgument","faultMessage":[{"key":"k","message":"bad pathSet"}]}"#,
        );
        assert_eq!(err.kind, VsphereErrorKind::Fault("InvalidArgument".into()));
        assert_eq!(err.message, "InvalidArgument: bad pathSet");

        let err = fault_to_error(StatusCode::BAD_GATEWAY, "<html>proxy</html>");
        assert_eq!(err.kind, VsphereErrorKind::ApiError(502));
        assert!(err.message.contains("proxy"));

        let err = fault_to_error(StatusCode::FORBIDDEN, "");
        assert_eq!(err.kind, VsphereErrorKind::AccessDenied);
    }

    #[tokio::test]
    async fn lookups_require_login() {
        let client = VsphereClient::new(&config()).unwrap();
        let err = client.service_content().await.unwrap_err();
        assert_eq!(err.kind, VsphereErrorKind::ConnectionError);
        let err = client
            .retrieve_properties(&ManagedObjectReference::new("Network", "network-1"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, VsphereErrorKind::ConnectionError);
    }

    // ── HTTP round trips ────────────────────────────────────────────

    mod http {
        use super::*;
        use crate::lookup::NetworkLookup;
        use crate::types::{ApiType, HostNetworkSystem, Network};
        use wiremock::matchers::{body_json, body_partial_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        const SDK: &str = "/sdk/vim25/8.0.1.0";
        const SESSION: &str = "52b1e0c5-7d1f-4f5e-9c6d-2a61f0b0c0de";

        fn sdk(rest: &str) -> String {
            format!("{SDK}/{rest}")
        }

        fn client_for(server: &MockServer) -> VsphereClient {
            let mut client = VsphereClient::new(&config()).unwrap();
            client.base_url = Url::parse(&format!("{}{SDK}", server.uri())).unwrap();
            client
        }

        fn service_content() -> Value {
            json!({
                "_typeName": "ServiceContent",
                "rootFolder": {"_typeName": "ManagedObjectReference", "type": "Folder", "value": "group-d1"},
                "propertyCollector": {"_typeName": "ManagedObjectReference", "type": "PropertyCollector", "value": "propertyCollector"},
                "about": {"_typeName": "AboutInfo", "name": "VMware vCenter Server",
                          "apiType": "VirtualCenter", "apiVersion": "8.0.1.0"}
            })
        }

        async fn mount_login(server: &MockServer) {
            Mock::given(method("POST"))
                .and(path(sdk("SessionManager/SessionManager/Login")))
                .and(body_json(json!({
                    "userName": "administrator@vsphere.local",
                    "password": "secret"
                })))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header(SESSION_HEADER, SESSION)
                        .set_body_json(json!({"_typeName": "UserSession", "userName": "administrator@vsphere.local"})),
                )
                .expect(1)
                .mount(server)
                .await;
        }

        async fn logged_in(server: &MockServer) -> VsphereClient {
            mount_login(server).await;
            Mock::given(method("GET"))
                .and(path(sdk("ServiceInstance/ServiceInstance/content")))
                .and(header(SESSION_HEADER, SESSION))
                .respond_with(ResponseTemplate::new(200).set_body_json(service_content()))
                .mount(server)
                .await;
            let mut client = client_for(server);
            client.login().await.unwrap();
            client
        }

        fn retrieve_path() -> String {
            sdk("PropertyCollector/propertyCollector/RetrievePropertiesEx")
        }

        #[tokio::test]
        async fn login_keeps_session_and_loads_content() {
            let server = MockServer::start().await;
            let client = logged_in(&server).await;
            assert!(client.is_connected());
            assert_eq!(client.session_id(), Some(SESSION));
            let content = client.service_content().await.unwrap();
            assert_eq!(content.about.api_type, ApiType::VirtualCenter);
            assert_eq!(content.property_collector.value, "propertyCollector");
        }

        #[tokio::test]
        async fn login_without_body_401_is_auth_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path(sdk("SessionManager/SessionManager/Login")))
                .respond_with(ResponseTemplate::new(401))
                .mount(&server)
                .await;
            let mut client = client_for(&server);
            let err = client.login().await.unwrap_err();
            assert_eq!(err.kind, VsphereErrorKind::AuthenticationError);
            assert!(!client.is_connected());
        }

        #[tokio::test]
        async fn failed_content_load_logs_out() {
            let server = MockServer::start().await;
            mount_login(&server).await;
            Mock::given(method("GET"))
                .and(path(sdk("ServiceInstance/ServiceInstance/content")))
                .respond_with(ResponseTemplate::new(503))
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path(sdk("SessionManager/SessionManager/Logout")))
                .and(header(SESSION_HEADER, SESSION))
                .respond_with(ResponseTemplate::new(204))
                .expect(1)
                .mount(&server)
                .await;

            let mut client = client_for(&server);
            let err = client.login().await.unwrap_err();
            assert_eq!(err.kind, VsphereErrorKind::ApiError(503));
            assert!(!client.is_connected());
            assert!(client.service_content().await.is_err());
        }

        #[tokio::test]
        async fn vswitch_lookup_over_http() {
            let server = MockServer::start().await;
            let client = logged_in(&server).await;
            Mock::given(method("POST"))
                .and(path(retrieve_path()))
                .and(header(SESSION_HEADER, SESSION))
                .and(body_partial_json(json!({
                    "specSet": [{
                        "propSet": [{"type": "HostNetworkSystem", "pathSet": ["networkInfo.vswitch"]}],
                        "objectSet": [{"obj": {"type": "HostNetworkSystem", "value": "networkSystem-10"}}]
                    }]
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "_typeName": "RetrieveResult",
                    "objects": [{
                        "_typeName": "ObjectContent",
                        "obj": {"_typeName": "ManagedObjectReference", "type": "HostNetworkSystem", "value": "networkSystem-10"},
                        "propSet": [{
                            "_typeName": "DynamicProperty",
                            "name": "networkInfo.vswitch",
                            "val": {"_typeName": "ArrayOfHostVirtualSwitch", "_value": [
                                {"_typeName": "HostVirtualSwitch", "name": "vSwitch0", "key": "key-vim.host.VirtualSwitch-vSwitch0"},
                                {"_typeName": "HostVirtualSwitch", "name": "vSwitch1", "key": "key-vim.host.VirtualSwitch-vSwitch1"}
                            ]}
                        }]
                    }]
                })))
                .expect(1)
                .mount(&server)
                .await;

            let sw = NetworkLookup::new(&client)
                .host_vswitch_from_name(&HostNetworkSystem::new("networkSystem-10"), "vSwitch1")
                .await
                .unwrap();
            assert_eq!(sw.key, "key-vim.host.VirtualSwitch-vSwitch1");
        }

        #[tokio::test]
        async fn denied_property_is_not_reported_as_missing_switch() {
            let server = MockServer::start().await;
            let client = logged_in(&server).await;
            Mock::given(method("POST"))
                .and(path(retrieve_path()))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "objects": [{
                        "obj": {"type": "HostNetworkSystem", "value": "networkSystem-10"},
                        "missingSet": [{
                            "path": "networkInfo.vswitch",
                            "fault": {"fault": {"_typeName": "NoPermission"}}
                        }]
                    }]
                })))
                .mount(&server)
                .await;

            let err = NetworkLookup::new(&client)
                .host_vswitch_from_name(&HostNetworkSystem::new("networkSystem-10"), "vSwitch1")
                .await
                .unwrap_err();
            assert_eq!(err.kind, VsphereErrorKind::AccessDenied);
            assert!(err.message.contains("error fetching host network properties"));
        }

        #[tokio::test]
        async fn server_fault_body_maps_to_not_found() {
            let server = MockServer::start().await;
            let client = logged_in(&server).await;
            Mock::given(method("POST"))
                .and(path(retrieve_path()))
                .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                    "_typeName": "ManagedObjectNotFound",
                    "faultMessage": [],
                    "obj": {"_typeName": "ManagedObjectReference", "type": "Network", "value": "network-404"}
                })))
                .mount(&server)
                .await;

            let err = NetworkLookup::new(&client)
                .network_properties(&Network::new("network-404"))
                .await
                .unwrap_err();
            assert!(err.is_not_found());
            assert!(err.message.contains("ManagedObjectNotFound"));
        }

        #[tokio::test]
        async fn batched_retrieval_follows_continuation_token() {
            let server = MockServer::start().await;
            let client = logged_in(&server).await;
            Mock::given(method("POST"))
                .and(path(retrieve_path()))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "objects": [{
                        "obj": {"type": "Network", "value": "network-2"},
                        "propSet": [{"name": "name", "val": "Lab Network"}]
                    }],
                    "token": "page-2"
                })))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path(sdk("PropertyCollector/propertyCollector/ContinueRetrievePropertiesEx")))
                .and(body_json(json!({"token": "page-2"})))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "objects": [{
                        "obj": {"type": "Network", "value": "network-1"},
                        "propSet": [{"name": "name", "val": "VM Network"}]
                    }]
                })))
                .expect(1)
                .mount(&server)
                .await;

            let objs = vec![
                ManagedObjectReference::new("Network", "network-1"),
                ManagedObjectReference::new("Network", "network-2"),
            ];
            let sets = client.retrieve_properties_many(&objs, &["name"]).await.unwrap();
            assert_eq!(sets.len(), 2);
            assert_eq!(sets[0]["name"], "VM Network");
            assert_eq!(sets[1]["name"], "Lab Network");
        }
    }
}
