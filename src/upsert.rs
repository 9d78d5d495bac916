use serde_json::Value;
use tracing::Span;

use crate::error::{LdError, Result};
use crate::patch::{self, PatchOperation};
use crate::resource::KeyedResource;

/// Fetch `key`; when it exists patch it towards `desired`, when the service
/// reports it missing create it from `desired`.
///
/// Only [`LdError::NotFound`] routes to the create path. Any other fetch
/// failure aborts the upsert.
pub async fn upsert_resource<R>(resource: &R, key: &str, desired: &Value, span: &Span) -> Result<Value>
where
    R: KeyedResource + ?Sized,
{
    match resource.fetch(key).await {
        Ok(current) => {
            tracing::info!(parent: span, %key, group = ?resource.group(), "resource found, updating");
            patch_towards(resource, key, &current, desired, span).await
        }
        Err(LdError::NotFound { .. }) => {
            tracing::info!(parent: span, %key, group = ?resource.group(), "resource not found, creating");
            resource.create(key, desired).await
        }
        Err(e) => Err(e),
    }
}

/// Fetch `key` and patch it towards `desired`. A missing resource is an error.
pub async fn update_resource<R>(resource: &R, key: &str, desired: &Value, span: &Span) -> Result<Value>
where
    R: KeyedResource + ?Sized,
{
    let current = resource.fetch(key).await?;
    patch_towards(resource, key, &current, desired, span).await
}

async fn patch_towards<R>(resource: &R, key: &str, current: &Value, desired: &Value, span: &Span) -> Result<Value>
where
    R: KeyedResource + ?Sized,
{
    let ops = patch::diff(current, desired);
    log_patch(span, key, &ops);
    resource.patch(key, &ops).await
}

fn log_patch(span: &Span, key: &str, ops: &[PatchOperation]) {
    let rendered = serde_json::to_string(ops).unwrap_or_default();
    tracing::debug!(parent: span, %key, ops = %rendered, count = ops.len(), "computed patch");
}

/// Copies the allow-listed parts of one sub-document onto a sibling.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeMigration {
    /// JSON pointer of the source scope, e.g. `/environments/test`.
    pub from: String,
    /// JSON pointer of the target scope, e.g. `/environments/production`.
    pub to: String,
    /// Relative paths (within a scope) that may be changed.
    pub allowed_prefixes: Vec<String>,
    /// Relative path of the on/off state inside a scope.
    pub toggle_path: String,
    pub include_toggle: bool,
}

impl ScopeMigration {
    /// Prefixes that survive filtering, including the toggle when requested.
    pub fn effective_prefixes(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = self.allowed_prefixes.iter().map(String::as_str).collect();
        if self.include_toggle {
            prefixes.push(self.toggle_path.as_str());
        }
        prefixes
    }

    /// The patch that makes the `to` scope of `document` match its `from`
    /// scope on the allowed paths, rooted at the document.
    pub fn plan(&self, key: &str, document: &Value) -> Result<Vec<PatchOperation>> {
        let scope = |pointer: &str| {
            document.pointer(pointer).ok_or_else(|| LdError::MissingScope {
                key: key.to_string(),
                scope: pointer.to_string(),
            })
        };
        let source = scope(&self.from)?;
        let target = scope(&self.to)?;

        let ops = patch::diff(target, source);
        let ops = patch::filter_by_prefix(ops, &self.effective_prefixes());
        Ok(patch::prefix_paths(ops, &self.to))
    }
}

/// Fetch `key` once, plan the scope migration and submit it as one patch.
pub async fn migrate_fields<R>(resource: &R, key: &str, migration: &ScopeMigration, span: &Span) -> Result<Value>
where
    R: KeyedResource + ?Sized,
{
    let document = resource.fetch(key).await?;
    let ops = migration.plan(key, &document)?;
    tracing::info!(parent: span, %key, from = %migration.from, to = %migration.to, "migrating fields");
    log_patch(span, key, &ops);
    resource.patch(key, &ops).await
}
