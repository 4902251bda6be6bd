use kube::api::{ListParams, PostParams};
use kube::core::ResourceExt;
use kube::{Api, Client, Resource};

use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

use crate::controller::Error;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operation {
    Create,
    Replace,
}

pub fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 404)
}

pub fn is_already_exists(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 409)
}

/// Maps a 404 to `None`, any other failure to the crate error.
pub fn found<T>(result: Result<T, kube::Error>) -> Result<Option<T>, Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if is_not_found(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Treats a 409 from a create as success. Returns whether this call created it.
pub fn created_or_existing<T>(result: Result<T, Error>) -> Result<bool, Error> {
    match result {
        Ok(_) => Ok(true),
        Err(Error::Kube(e)) if is_already_exists(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

async fn run_operation<T>(api: Api<T>, operation: Operation, value: &T) -> Result<T, Error>
where
    T: Clone + DeserializeOwned + Debug + Serialize + ResourceExt,
{
    let pp = PostParams::default();
    let result = match operation {
        Operation::Create => api.create(&pp, value).await?,
        Operation::Replace => api.replace(&value.name_any(), &pp, value).await?,
    };
    Ok(result)
}

pub async fn perform_operation<T>(
    client: Client,
    operation: Operation,
    value: &T,
) -> Result<T, Error>
where
    T: Clone + DeserializeOwned + Debug + Serialize + ResourceExt,
    <T as kube::Resource>::DynamicType: Default,
    T: Resource<Scope = NamespaceResourceScope>,
{
    let api: Api<T> = Api::namespaced(client, &value.namespace().unwrap_or("default".into()));
    run_operation(api, operation, value).await
}

pub async fn perform_cluster_operation<T>(
    client: Client,
    operation: Operation,
    value: &T,
) -> Result<T, Error>
where
    T: Clone + DeserializeOwned + Debug + Serialize + ResourceExt,
    <T as kube::Resource>::DynamicType: Default,
    T: Resource<Scope = ClusterResourceScope>,
{
    let api: Api<T> = Api::all(client);
    run_operation(api, operation, value).await
}

/// Fetches a namespaced object, mapping 404 to `None`.
pub async fn perform_get<T>(client: Client, name: &str, namespace: &str) -> Result<Option<T>, Error>
where
    T: Clone + DeserializeOwned + Debug + Serialize + ResourceExt,
    <T as kube::Resource>::DynamicType: Default,
    T: Resource<Scope = NamespaceResourceScope>,
{
    let api: Api<T> = Api::namespaced(client, namespace);
    found(api.get(name).await)
}

pub async fn perform_cluster_get<T>(client: Client, name: &str) -> Result<Option<T>, Error>
where
    T: Clone + DeserializeOwned + Debug + Serialize + ResourceExt,
    <T as kube::Resource>::DynamicType: Default,
    T: Resource<Scope = ClusterResourceScope>,
{
    let api: Api<T> = Api::all(client);
    found(api.get(name).await)
}

/// Lists a namespaced kind across every namespace.
pub async fn perform_list_all<T>(client: Client) -> Result<Vec<T>, Error>
where
    T: Clone + DeserializeOwned + Debug + Serialize + ResourceExt,
    <T as kube::Resource>::DynamicType: Default,
    T: Resource<Scope = NamespaceResourceScope>,
{
    let api: Api<T> = Api::all(client);
    let list = api.list(&ListParams::default()).await?;
    Ok(list.items)
}
