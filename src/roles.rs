use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Span;

use crate::bulk;
use crate::client::ApiClient;
use crate::error::{LdError, Result};
use crate::patch::PatchOperation;
use crate::resource::{collection_items, find_unique, KeyedResource, Operation, ResourceGroup};
use crate::upsert;

const GROUP: ResourceGroup = ResourceGroup::CustomRoles;
const GET_CUSTOM_ROLES: Operation = Operation::new(GROUP, "getCustomRoles");
const GET_CUSTOM_ROLE: Operation = Operation::new(GROUP, "getCustomRole");
const POST_CUSTOM_ROLE: Operation = Operation::new(GROUP, "postCustomRole");
const PATCH_CUSTOM_ROLE: Operation = Operation::new(GROUP, "patchCustomRole");
const DELETE_CUSTOM_ROLE: Operation = Operation::new(GROUP, "deleteCustomRole");

/// Desired state of a custom role, as supplied on the command line or in a
/// bulk-load file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRoleSpec {
    pub key: String,
    pub name: String,
    pub policy: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CustomRoleSpec {
    pub fn to_document(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_document(document: Value) -> Result<Self> {
        serde_json::from_value(document)
            .map_err(|e| LdError::validation(format!("invalid custom role definition: {}", e)))
    }
}

#[derive(Clone)]
pub struct CustomRoles {
    client: Arc<ApiClient>,
    span: Span,
}

impl CustomRoles {
    pub fn new(client: Arc<ApiClient>, span: Span) -> Self {
        Self { client, span }
    }

    pub async fn get_custom_roles(&self) -> Result<Value> {
        self.client.get(GET_CUSTOM_ROLES, &["roles"], &[]).await
    }

    pub async fn get_custom_role(&self, key: &str) -> Result<Value> {
        self.client
            .get(GET_CUSTOM_ROLE, &["roles", key], &[])
            .await
            .inspect_err(|e| tracing::error!(parent: &self.span, %key, error = %e, "failed to get role"))
    }

    /// Resolve a role by its internal `_id` and return the full role.
    pub async fn get_custom_role_by_id(&self, id: &str) -> Result<Value> {
        let roles = self.get_custom_roles().await?;
        let role = find_unique(collection_items(&roles), GET_CUSTOM_ROLES, &format!("_id {}", id), |r| {
            r.get("_id").and_then(Value::as_str) == Some(id)
        })?;
        let key = role
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| GET_CUSTOM_ROLES.ambiguous(format!("role with _id {} has no key", id)))?;
        self.get_custom_role(key).await
    }

    pub async fn create_custom_role(&self, role: &CustomRoleSpec) -> Result<Value> {
        self.client
            .post(POST_CUSTOM_ROLE, &["roles"], role.to_document()?)
            .await
    }

    pub async fn patch_custom_role(&self, key: &str, ops: &[PatchOperation]) -> Result<Value> {
        self.client
            .patch(PATCH_CUSTOM_ROLE, &["roles", key], serde_json::to_value(ops)?)
            .await
    }

    /// Patch an existing role towards `role`; fails if the role is missing.
    pub async fn update_custom_role(&self, role: &CustomRoleSpec) -> Result<Value> {
        upsert::update_resource(self, &role.key, &role.to_document()?, &self.span).await
    }

    pub async fn upsert_custom_role(&self, role: &CustomRoleSpec) -> Result<Value> {
        upsert::upsert_resource(self, &role.key, &role.to_document()?, &self.span).await
    }

    pub async fn delete_custom_role(&self, key: &str) -> Result<Value> {
        self.client
            .delete(DELETE_CUSTOM_ROLE, &["roles", key])
            .await
    }

    /// Upsert each role in order, stopping at the first failure.
    pub async fn bulk_upsert_custom_roles(&self, roles: &[CustomRoleSpec]) -> Result<Vec<Value>> {
        tracing::info!(parent: &self.span, count = roles.len(), "bulk upserting roles");
        bulk::upsert_sequential(self, &role_documents(roles)?, &self.span).await
    }

    /// Upsert all roles concurrently; results keep the input order.
    pub async fn bulk_upsert_custom_roles_parallel(&self, roles: &[CustomRoleSpec]) -> Result<Vec<Value>> {
        tracing::info!(parent: &self.span, count = roles.len(), "bulk upserting roles in parallel");
        bulk::upsert_parallel(self, &role_documents(roles)?, &self.span).await
    }

    pub async fn bulk_upsert_custom_roles_from_file(&self, path: &Path) -> Result<Vec<Value>> {
        tracing::info!(parent: &self.span, path = %path.display(), "loading roles from file");
        let roles = specs_from_documents(bulk::read_bulk_file(path)?)?;
        self.bulk_upsert_custom_roles(&roles).await
    }

    pub async fn bulk_upsert_custom_roles_from_folder(&self, dir: &Path) -> Result<Vec<Value>> {
        tracing::info!(parent: &self.span, path = %dir.display(), "loading roles from folder");
        let roles = specs_from_documents(bulk::read_bulk_folder(dir)?)?;
        self.bulk_upsert_custom_roles(&roles).await
    }
}

fn role_documents(roles: &[CustomRoleSpec]) -> Result<Vec<Value>> {
    roles.iter().map(CustomRoleSpec::to_document).collect()
}

fn specs_from_documents(documents: Vec<Value>) -> Result<Vec<CustomRoleSpec>> {
    documents.into_iter().map(CustomRoleSpec::from_document).collect()
}

#[async_trait]
impl KeyedResource for CustomRoles {
    fn group(&self) -> ResourceGroup {
        GROUP
    }

    async fn fetch(&self, key: &str) -> Result<Value> {
        self.get_custom_role(key).await
    }

    async fn create(&self, _key: &str, desired: &Value) -> Result<Value> {
        self.client
            .post(POST_CUSTOM_ROLE, &["roles"], desired.clone())
            .await
    }

    async fn patch(&self, key: &str, ops: &[PatchOperation]) -> Result<Value> {
        self.patch_custom_role(key, ops).await
    }
}
