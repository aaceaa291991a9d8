//! Inventory finder — resolves path patterns to network objects.
//!
//! Walks the inventory from the root folder down into every datacenter's
//! network folder. Paths look like `/{datacenter}/network/{folder}/{name}`;
//! datacenters nested in folders carry those folder names as well.

use crate::error::{VsphereError, VsphereResult};
use crate::property::retrieve_one;
use crate::types::{FoundNetwork, ManagedObjectReference, NetworkReference};
use crate::vim::VimApi;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderProps {
    #[serde(default)]
    name: String,
    #[serde(default)]
    child_entity: Vec<ManagedObjectReference>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatacenterProps {
    name: String,
    network_folder: ManagedObjectReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Root folder and the folders that hold datacenters
    Datacenters,
    /// A datacenter's network folder or one of its subfolders
    Networks,
}

struct Pending {
    obj: ManagedObjectReference,
    parent_path: String,
    scope: Scope,
    is_root: bool,
}

/// Searches the inventory for networks.
pub struct Finder<'a, A: VimApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: VimApi + ?Sized> Finder<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// All network-kind objects whose inventory path matches `pattern`.
    ///
    /// `*` matches any run of characters including `/`, `?` exactly one
    /// character; the leading `/` of the path is not part of the match.
    /// An empty result is not an error.
    pub async fn network_list(&self, pattern: &str) -> VsphereResult<Vec<FoundNetwork>> {
        let matcher = compile_glob(pattern)?;
        let content = self.api.service_content().await?;

        let mut found = Vec::new();
        let mut stack = vec![Pending {
            obj: content.root_folder,
            parent_path: String::new(),
            scope: Scope::Datacenters,
            is_root: true,
        }];

        while let Some(item) = stack.pop() {
            match (item.scope, item.obj.kind.as_str()) {
                (scope, "Folder") => {
                    let folder: FolderProps = retrieve_one(
                        self.api,
                        &item.obj,
                        Some(&["name", "childEntity"][..]),
                    )
                    .await?;
                    let path = if item.is_root {
                        String::new()
                    } else {
                        format!("{}/{}", item.parent_path, folder.name)
                    };

                    let mut subfolders = Vec::new();
                    let mut networks = Vec::new();
                    for child in folder.child_entity {
                        if scope == Scope::Networks {
                            if let Some(object) = NetworkReference::from_reference(&child) {
                                networks.push((child, object));
                                continue;
                            }
                        }
                        subfolders.push(child);
                    }

                    if !networks.is_empty() {
                        self.match_networks(&path, networks, &matcher, &mut found).await?;
                    }

                    // Reverse so children are visited in server order.
                    for child in subfolders.into_iter().rev() {
                        stack.push(Pending {
                            obj: child,
                            parent_path: path.clone(),
                            scope,
                            is_root: false,
                        });
                    }
                }
                (Scope::Datacenters, "Datacenter") => {
                    let dc: DatacenterProps = retrieve_one(
                        self.api,
                        &item.obj,
                        Some(&["name", "networkFolder"][..]),
                    )
                    .await?;
                    stack.push(Pending {
                        obj: dc.network_folder,
                        parent_path: format!("{}/{}", item.parent_path, dc.name),
                        scope: Scope::Networks,
                        is_root: false,
                    });
                }
                _ => {}
            }
        }

        log::debug!("finder: {} network(s) match {pattern:?}", found.len());
        Ok(found)
    }

    /// Read the names of one folder's networks in a single call and keep
    /// those whose path matches.
    async fn match_networks(
        &self,
        folder_path: &str,
        networks: Vec<(ManagedObjectReference, NetworkReference)>,
        matcher: &Regex,
        found: &mut Vec<FoundNetwork>,
    ) -> VsphereResult<()> {
        let refs: Vec<ManagedObjectReference> =
            networks.iter().map(|(obj, _)| obj.clone()).collect();
        let names = self.api.retrieve_properties_many(&refs, &["name"]).await?;

        for ((obj, object), props) in networks.into_iter().zip(names) {
            let name = props
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| VsphereError::parse(format!("cannot read name of {obj}")))?;
            let path = format!("{folder_path}/{name}");
            if matcher.is_match(path.trim_start_matches('/')) {
                found.push(FoundNetwork { path, object });
            }
        }
        Ok(())
    }
}

fn compile_glob(pattern: &str) -> VsphereResult<Regex> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| {
        VsphereError::validation(format!("invalid inventory path pattern {pattern:?}: {e}"))
    })
}
