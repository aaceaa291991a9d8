//! Typed property retrieval on top of [`VimApi::retrieve_properties`].

use crate::error::{VsphereError, VsphereResult};
use crate::types::ManagedObjectReference;
use crate::vim::{PropertySet, VimApi};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Retrieve `paths` (or everything) of `obj` and deserialise into `T`.
///
/// Dotted paths are nested, so `networkInfo.vswitch` lands in
/// `T.network_info.vswitch`.
pub async fn retrieve_one<T, A>(
    api: &A,
    obj: &ManagedObjectReference,
    paths: Option<&[&str]>,
) -> VsphereResult<T>
where
    T: DeserializeOwned,
    A: VimApi + ?Sized,
{
    let props = api.retrieve_properties(obj, paths).await?;
    serde_json::from_value(nest(props)).map_err(|e| {
        VsphereError::parse(format!("cannot decode properties of {obj}: {e}"))
    })
}

/// Retrieve a single property; `Ok(None)` when the server does not set it.
pub async fn retrieve_property<T, A>(
    api: &A,
    obj: &ManagedObjectReference,
    path: &str,
) -> VsphereResult<Option<T>>
where
    T: DeserializeOwned,
    A: VimApi + ?Sized,
{
    let mut props = api.retrieve_properties(obj, Some(&[path][..])).await?;
    match props.remove(path) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v).map(Some).map_err(|e| {
            VsphereError::parse(format!("cannot decode {path} of {obj}: {e}"))
        }),
    }
}

/// Turn `{"a.b": 1, "c": 2}` into `{"a": {"b": 1}, "c": 2}`.
pub(crate) fn nest(props: PropertySet) -> Value {
    let mut root = Map::new();
    for (path, value) in props {
        insert_path(&mut root, &path, value);
    }
    Value::Object(root)
}

fn insert_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    let Some((head, rest)) = path.split_once('.') else {
        map.insert(path.to_string(), value);
        return;
    };
    let slot = map
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match slot {
        Value::Object(inner) => insert_path(inner, rest, value),
        other => {
            let mut inner = Map::new();
            insert_path(&mut inner, rest, value);
            *other = Value::Object(inner);
        }
    }
}
