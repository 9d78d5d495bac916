use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Span;

use crate::client::ApiClient;
use crate::error::{LdError, Result};
use crate::patch::PatchOperation;
use crate::resource::{Operation, ResourceGroup};

const GROUP: ResourceGroup = ResourceGroup::Projects;
const GET_PROJECTS: Operation = Operation::new(GROUP, "getProjects");
const GET_PROJECT: Operation = Operation::new(GROUP, "getProject");
const POST_PROJECT: Operation = Operation::new(GROUP, "postProject");
const PATCH_PROJECT: Operation = Operation::new(GROUP, "patchProject");
const DELETE_PROJECT: Operation = Operation::new(GROUP, "deleteProject");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEnvironment {
    pub key: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSideAvailability {
    pub using_environment_id: bool,
    pub using_mobile_key: bool,
}

/// Body of a project creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_in_snippet_by_default: Option<bool>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environments: Option<Vec<NewEnvironment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_client_side_availability: Option<ClientSideAvailability>,
}

impl NewProject {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            include_in_snippet_by_default: None,
            tags: Vec::new(),
            environments: None,
            default_client_side_availability: None,
        }
    }

    /// Build a project from the loosely typed command-line form.
    ///
    /// Booleans are `"true"` or anything else for false. Client-side
    /// availability is only sent when `include_in_snippet` is absent and at
    /// least one of its flags is given; a missing flag then means `true`.
    pub fn from_args(
        key: &str,
        name: &str,
        include_in_snippet: Option<&str>,
        environments: Option<&str>,
        using_environment_id: Option<&str>,
        using_mobile_key: Option<&str>,
        tags: Option<&str>,
    ) -> Result<Self> {
        let include_in_snippet_by_default = include_in_snippet.map(|s| s == "true");

        let default_client_side_availability = match include_in_snippet_by_default {
            None if using_environment_id.is_some() || using_mobile_key.is_some() => {
                Some(ClientSideAvailability {
                    using_environment_id: using_environment_id.map_or(true, |s| s == "true"),
                    using_mobile_key: using_mobile_key.map_or(true, |s| s == "true"),
                })
            }
            _ => None,
        };

        Ok(Self {
            include_in_snippet_by_default,
            tags: parse_tags(tags),
            environments: environments.map(parse_environments).transpose()?,
            default_client_side_availability,
            ..Self::new(key, name)
        })
    }
}

/// `"a,b"` -> `["a", "b"]`.
pub fn parse_tags(tags: Option<&str>) -> Vec<String> {
    tags.filter(|t| !t.is_empty())
        .map(|t| t.split(',').map(String::from).collect())
        .unwrap_or_default()
}

/// `"key,name,color:key,name,color"` -> environments.
pub fn parse_environments(environments: &str) -> Result<Vec<NewEnvironment>> {
    environments.split(':').map(parse_environment).collect()
}

fn parse_environment(environment: &str) -> Result<NewEnvironment> {
    let parts: Vec<&str> = environment.split(',').collect();
    if environment.is_empty() || parts.len() < 3 {
        return Err(LdError::validation(
            "Invalid environments configuration, should have 3 items, key, name and colour",
        ));
    }
    Ok(NewEnvironment {
        key: parts[0].to_string(),
        name: parts[1].to_string(),
        color: parts[2].to_string(),
    })
}

#[derive(Clone)]
pub struct Projects {
    client: Arc<ApiClient>,
    span: Span,
}

impl Projects {
    pub fn new(client: Arc<ApiClient>, span: Span) -> Self {
        Self { client, span }
    }

    pub async fn get_projects(&self) -> Result<Value> {
        self.client.get(GET_PROJECTS, &["projects"], &[]).await
    }

    pub async fn get_project(&self, key: &str) -> Result<Value> {
        self.client.get(GET_PROJECT, &["projects", key], &[]).await
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<Value> {
        tracing::info!(parent: &self.span, key = %project.key, "creating project");
        self.client
            .post(POST_PROJECT, &["projects"], serde_json::to_value(project)?)
            .await
    }

    pub async fn update_project(&self, key: &str, ops: &[PatchOperation]) -> Result<Value> {
        self.client
            .patch(PATCH_PROJECT, &["projects", key], serde_json::to_value(ops)?)
            .await
    }

    pub async fn delete_project(&self, key: &str) -> Result<Value> {
        tracing::info!(parent: &self.span, %key, "deleting project");
        self.client.delete(DELETE_PROJECT, &["projects", key]).await
    }
}
