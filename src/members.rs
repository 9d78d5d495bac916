use std::sync::Arc;

use serde_json::{json, Value};
use tracing::Span;

use crate::client::ApiClient;
use crate::error::Result;
use crate::patch::PatchOperation;
use crate::resource::{collection_items, find_unique, Operation, ResourceGroup};
use crate::roles::CustomRoles;

const GROUP: ResourceGroup = ResourceGroup::TeamMembers;
const GET_MEMBERS: Operation = Operation::new(GROUP, "getMembers");
const GET_MEMBER: Operation = Operation::new(GROUP, "getMember");
const GET_MEMBER_CUSTOM_ROLES: Operation = Operation::new(GROUP, "getTeamMemberCustomRoles");
const POST_MEMBERS: Operation = Operation::new(GROUP, "postMembers");
const PATCH_MEMBER: Operation = Operation::new(GROUP, "patchMember");
const DELETE_MEMBER: Operation = Operation::new(GROUP, "deleteMember");

/// Roles every account has; anything else is a custom role key.
pub const BUILT_IN_ROLES: [&str; 4] = ["reader", "writer", "admin", "owner"];

pub const DEFAULT_INVITE_ROLE: &str = "reader";

/// Paging and filtering for [`TeamMembers::get_team_members`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub filter: Option<String>,
}

impl MemberQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        if let Some(filter) = &self.filter {
            pairs.push(("filter", filter.clone()));
        }
        pairs
    }
}

#[derive(Clone)]
pub struct TeamMembers {
    client: Arc<ApiClient>,
    roles: CustomRoles,
    span: Span,
}

impl TeamMembers {
    /// `roles` is used to translate custom role ids into keys.
    pub fn new(client: Arc<ApiClient>, roles: CustomRoles, span: Span) -> Self {
        Self { client, roles, span }
    }

    pub async fn get_team_members(&self, query: &MemberQuery) -> Result<Value> {
        self.client
            .get(GET_MEMBERS, &["members"], &query.pairs())
            .await
    }

    pub async fn get_team_member(&self, id: &str) -> Result<Value> {
        self.client.get(GET_MEMBER, &["members", id], &[]).await
    }

    /// The unique member with exactly this email address.
    pub async fn get_team_member_by_email(&self, email: &str) -> Result<Value> {
        let members = self.get_team_members(&MemberQuery::default()).await?;
        find_unique(collection_items(&members), GET_MEMBERS, &format!("email {}", email), |m| {
            m.get("email").and_then(Value::as_str) == Some(email)
        })
        .cloned()
    }

    /// The member with an added `customRoleKeys` array holding the key of
    /// every role id in its `customRoles`.
    pub async fn get_team_member_custom_roles(&self, email: &str) -> Result<Value> {
        let mut member = self.get_team_member_by_email(email).await?;
        let role_ids: Vec<String> = member
            .get("customRoles")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default();

        let mut keys = Vec::with_capacity(role_ids.len());
        if !role_ids.is_empty() {
            let roles = self.roles.get_custom_roles().await?;
            let roles = collection_items(&roles);
            for id in &role_ids {
                let role = find_unique(roles, GET_MEMBER_CUSTOM_ROLES, &format!("role _id {}", id), |r| {
                    r.get("_id").and_then(Value::as_str) == Some(id.as_str())
                })?;
                let key = role.get("key").and_then(Value::as_str).ok_or_else(|| {
                    GET_MEMBER_CUSTOM_ROLES.ambiguous(format!("role with _id {} has no key", id))
                })?;
                keys.push(Value::from(key));
            }
        }
        tracing::debug!(parent: &self.span, %email, roles = keys.len(), "resolved member custom roles");

        if let Some(obj) = member.as_object_mut() {
            obj.insert("customRoleKeys".to_string(), Value::Array(keys));
        }
        Ok(member)
    }

    /// Invite `email` with a built-in role or a custom role key.
    pub async fn invite_team_member(&self, email: &str, role: &str) -> Result<Value> {
        tracing::info!(parent: &self.span, %email, %role, "inviting member");
        self.client
            .post(POST_MEMBERS, &["members"], json!([invitation(email, role)]))
            .await
    }

    pub async fn update_team_member(&self, id: &str, ops: &[PatchOperation]) -> Result<Value> {
        self.client
            .patch(PATCH_MEMBER, &["members", id], serde_json::to_value(ops)?)
            .await
    }

    pub async fn delete_team_member(&self, id: &str) -> Result<Value> {
        self.client.delete(DELETE_MEMBER, &["members", id]).await
    }
}

fn invitation(email: &str, role: &str) -> Value {
    if BUILT_IN_ROLES.contains(&role) {
        json!({"email": email, "role": role})
    } else {
        json!({"email": email, "customRoles": [role]})
    }
}
