//! Async utilities for the LaunchDarkly REST API.
//!
//! Each resource collection (feature flags, custom roles, team members,
//! projects) has a typed accessor. Flags and roles additionally support
//! diff-based upserts: the current document is fetched, a JSON Patch is
//! computed against the desired state, and only the difference is sent.
//!
//! ```no_run
//! # async fn run() -> ldutils_lib::Result<()> {
//! let ld = ldutils_lib::LdUtils::builder().token("api-0000").build()?;
//! let on = ld.flags().get_feature_flag_state("default", "sort.order", "test").await?;
//! println!("sort.order is {}", if on { "on" } else { "off" });
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::Span;

pub mod builder;
pub mod bulk;
pub mod client;
pub mod config;
pub mod error;
pub mod flags;
pub mod members;
pub mod patch;
pub mod projects;
pub mod resource;
pub mod roles;
pub mod upsert;

pub use client::{ApiClient, ApiRequest, ApiResponse, ReqwestTransport, Transport, TransportError};
pub use config::{Config, FileConfig};
pub use error::{LdError, Result};
pub use flags::FeatureFlags;
pub use members::{MemberQuery, TeamMembers};
pub use patch::PatchOperation;
pub use projects::{NewProject, Projects};
pub use resource::{KeyedResource, Operation, ResourceGroup};
pub use roles::{CustomRoleSpec, CustomRoles};
pub use upsert::ScopeMigration;

/// Entry point holding one accessor per resource group. Cheap to clone; all
/// accessors share the same immutable [`ApiClient`].
#[derive(Clone)]
pub struct LdUtils {
    client: Arc<ApiClient>,
    flags: FeatureFlags,
    roles: CustomRoles,
    members: TeamMembers,
    projects: Projects,
}

impl LdUtils {
    pub fn builder() -> builder::LdUtilsBuilder {
        builder::create_builder()
    }

    /// Build with the reqwest transport from a resolved [`Config`].
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub(crate) fn from_parts(client: Arc<ApiClient>, span: Span) -> Self {
        let child = |name: &'static str| tracing::info_span!(parent: &span, "resource", group = name);
        let roles = CustomRoles::new(client.clone(), child("roles"));
        Self {
            flags: FeatureFlags::new(client.clone(), child("flags")),
            members: TeamMembers::new(client.clone(), roles.clone(), child("members")),
            projects: Projects::new(client.clone(), child("projects")),
            roles,
            client,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    pub fn roles(&self) -> &CustomRoles {
        &self.roles
    }

    pub fn members(&self) -> &TeamMembers {
        &self.members
    }

    pub fn projects(&self) -> &Projects {
        &self.projects
    }
}
