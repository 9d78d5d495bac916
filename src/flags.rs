use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::Span;

use crate::client::ApiClient;
use crate::error::{LdError, Result};
use crate::patch::PatchOperation;
use crate::resource::{document_key, KeyedResource, Operation, ResourceGroup};
use crate::upsert::{self, ScopeMigration};

const GROUP: ResourceGroup = ResourceGroup::FeatureFlags;
const GET_FEATURE_FLAGS: Operation = Operation::new(GROUP, "getFeatureFlags");
const GET_FEATURE_FLAG: Operation = Operation::new(GROUP, "getFeatureFlag");
const POST_FEATURE_FLAG: Operation = Operation::new(GROUP, "postFeatureFlag");
const PATCH_FEATURE_FLAG: Operation = Operation::new(GROUP, "patchFeatureFlag");
const DELETE_FEATURE_FLAG: Operation = Operation::new(GROUP, "deleteFeatureFlag");

/// Per-environment paths copied by [`FeatureFlags::migrate_feature_flag`].
pub const MIGRATED_PATHS: [&str; 5] = ["/targets", "/rules", "/fallthrough", "/offVariation", "/prerequisites"];

/// Per-environment on/off state.
pub const TOGGLE_PATH: &str = "/on";

/// Feature flag operations, scoped per project.
#[derive(Clone)]
pub struct FeatureFlags {
    client: Arc<ApiClient>,
    span: Span,
}

impl FeatureFlags {
    pub fn new(client: Arc<ApiClient>, span: Span) -> Self {
        Self { client, span }
    }

    fn env_query(env: Option<&str>) -> Vec<(&'static str, String)> {
        env.map(|e| vec![("env", e.to_string())]).unwrap_or_default()
    }

    pub async fn get_feature_flags(&self, project: &str, env: Option<&str>) -> Result<Value> {
        self.client
            .get(GET_FEATURE_FLAGS, &["flags", project], &Self::env_query(env))
            .await
    }

    pub async fn get_feature_flag(&self, project: &str, key: &str, env: Option<&str>) -> Result<Value> {
        self.client
            .get(GET_FEATURE_FLAG, &["flags", project, key], &Self::env_query(env))
            .await
    }

    /// Whether the flag is switched on in `env`.
    pub async fn get_feature_flag_state(&self, project: &str, key: &str, env: &str) -> Result<bool> {
        let flag = self.get_feature_flag(project, key, Some(env)).await?;
        let pointer = format!("{}{}", environment_pointer(env), TOGGLE_PATH);
        flag.pointer(&pointer)
            .and_then(Value::as_bool)
            .ok_or_else(|| LdError::MissingScope {
                key: key.to_string(),
                scope: pointer,
            })
    }

    pub async fn create_feature_flag(&self, project: &str, flag: &Value) -> Result<Value> {
        document_key(flag)?;
        self.client
            .post(POST_FEATURE_FLAG, &["flags", project], flag.clone())
            .await
    }

    pub async fn update_feature_flag(&self, project: &str, key: &str, ops: &[PatchOperation]) -> Result<Value> {
        self.client
            .patch(PATCH_FEATURE_FLAG, &["flags", project, key], serde_json::to_value(ops)?)
            .await
    }

    pub async fn toggle_feature_flag(&self, project: &str, key: &str, env: &str, on: bool) -> Result<Value> {
        tracing::info!(parent: &self.span, %project, %key, %env, on, "toggling flag");
        let op = PatchOperation::replace(format!("{}{}", environment_pointer(env), TOGGLE_PATH), json!(on));
        self.update_feature_flag(project, key, &[op]).await
    }

    pub async fn delete_feature_flag(&self, project: &str, key: &str) -> Result<Value> {
        self.client
            .delete(DELETE_FEATURE_FLAG, &["flags", project, key])
            .await
    }

    /// Create the flag described by `flag` or patch the existing one towards it.
    pub async fn upsert_feature_flag(&self, project: &str, flag: &Value) -> Result<Value> {
        let key = document_key(flag)?;
        upsert::upsert_resource(&self.in_project(project), key, flag, &self.span).await
    }

    /// Copy targeting (targets, rules, fallthrough, off variation,
    /// prerequisites and, with `include_state`, the on/off state) from one
    /// environment of a flag to another.
    pub async fn migrate_feature_flag(
        &self,
        project: &str,
        key: &str,
        from_env: &str,
        to_env: &str,
        include_state: bool,
    ) -> Result<Value> {
        let migration = environment_migration(from_env, to_env, include_state);
        upsert::migrate_fields(&self.in_project(project), key, &migration, &self.span).await
    }

    /// [`Self::migrate_feature_flag`] for each key in order; the first failure
    /// aborts the batch.
    pub async fn bulk_migrate_feature_flags(
        &self,
        project: &str,
        keys: &[String],
        from_env: &str,
        to_env: &str,
        include_state: bool,
    ) -> Result<Vec<Value>> {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(
                self.migrate_feature_flag(project, key, from_env, to_env, include_state)
                    .await?,
            );
        }
        Ok(results)
    }

    /// The flags of one project as a [`KeyedResource`].
    pub fn in_project<'a>(&'a self, project: &'a str) -> ProjectFlags<'a> {
        ProjectFlags {
            flags: self,
            project,
        }
    }
}

/// JSON pointer of an environment inside a flag document.
pub fn environment_pointer(env: &str) -> String {
    format!("/environments/{}", crate::patch::escape_token(env))
}

/// The migration copying flag targeting from `from_env` to `to_env`.
pub fn environment_migration(from_env: &str, to_env: &str, include_state: bool) -> ScopeMigration {
    ScopeMigration {
        from: environment_pointer(from_env),
        to: environment_pointer(to_env),
        allowed_prefixes: MIGRATED_PATHS.iter().map(|p| p.to_string()).collect(),
        toggle_path: TOGGLE_PATH.to_string(),
        include_toggle: include_state,
    }
}

pub struct ProjectFlags<'a> {
    flags: &'a FeatureFlags,
    project: &'a str,
}

#[async_trait]
impl KeyedResource for ProjectFlags<'_> {
    fn group(&self) -> ResourceGroup {
        GROUP
    }

    async fn fetch(&self, key: &str) -> Result<Value> {
        self.flags.get_feature_flag(self.project, key, None).await
    }

    async fn create(&self, _key: &str, desired: &Value) -> Result<Value> {
        self.flags.create_feature_flag(self.project, desired).await
    }

    async fn patch(&self, key: &str, ops: &[PatchOperation]) -> Result<Value> {
        self.flags.update_feature_flag(self.project, key, ops).await
    }
}
