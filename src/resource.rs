use async_trait::async_trait;
use serde_json::Value;

use crate::error::{LdError, Result};
use crate::patch::PatchOperation;

const DOCS_BASE: &str = "https://apidocs.launchdarkly.com/tag";

/// The remote resource collections this crate talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceGroup {
    FeatureFlags,
    CustomRoles,
    TeamMembers,
    Projects,
}

impl ResourceGroup {
    /// Tag used by the API reference for this group.
    pub fn docs_tag(self) -> &'static str {
        match self {
            ResourceGroup::FeatureFlags => "Feature-flags",
            ResourceGroup::CustomRoles => "Custom-roles",
            ResourceGroup::TeamMembers => "Account-members",
            ResourceGroup::Projects => "Projects",
        }
    }

    /// First path segment of the group's collection.
    pub fn collection(self) -> &'static str {
        match self {
            ResourceGroup::FeatureFlags => "flags",
            ResourceGroup::CustomRoles => "roles",
            ResourceGroup::TeamMembers => "members",
            ResourceGroup::Projects => "projects",
        }
    }
}

/// Identifies one remote call for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub group: ResourceGroup,
    pub name: &'static str,
}

impl Operation {
    pub const fn new(group: ResourceGroup, name: &'static str) -> Self {
        Self { group, name }
    }

    pub fn docs(&self) -> String {
        format!("{}/{}#operation/{}", DOCS_BASE, self.group.docs_tag(), self.name)
    }

    pub(crate) fn ambiguous(&self, message: impl Into<String>) -> LdError {
        LdError::AmbiguousMatch {
            api: self.name,
            message: message.into(),
            docs: self.docs(),
        }
    }
}

/// A collection whose members are addressed by a string key and can be
/// fetched, created and partially updated. The upsert and migration
/// algorithms in [`crate::upsert`] are written against this trait.
#[async_trait]
pub trait KeyedResource: Send + Sync {
    fn group(&self) -> ResourceGroup;

    async fn fetch(&self, key: &str) -> Result<Value>;

    /// Create the resource from `desired`, sent as the request body verbatim.
    async fn create(&self, key: &str, desired: &Value) -> Result<Value>;

    async fn patch(&self, key: &str, ops: &[PatchOperation]) -> Result<Value>;
}

/// Select the single item of `items` matching `predicate`.
///
/// Zero or several matches are an [`LdError::AmbiguousMatch`] attributed to `op`.
pub fn find_unique<'a, F>(
    items: &'a [Value],
    op: Operation,
    what: &str,
    predicate: F,
) -> Result<&'a Value>
where
    F: Fn(&Value) -> bool,
{
    let mut matches = items.iter().filter(|item| predicate(item));
    match (matches.next(), matches.next()) {
        (Some(item), None) => Ok(item),
        (None, _) => Err(op.ambiguous(format!("no item found for {}", what))),
        (Some(_), Some(_)) => {
            let count = 2 + matches.count();
            Err(op.ambiguous(format!("{} items found for {}", count, what)))
        }
    }
}

/// Items of a paginated collection response (`{"items": [...]}`).
pub fn collection_items(collection: &Value) -> &[Value] {
    collection
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// String `key` field of a resource document.
pub fn document_key(document: &Value) -> Result<&str> {
    document
        .get("key")
        .and_then(Value::as_str)
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| LdError::validation("every document must carry a non-empty string 'key'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LIST_MEMBERS: Operation = Operation::new(ResourceGroup::TeamMembers, "getMembers");

    #[test]
    fn test_docs_url() {
        assert_eq!(
            LIST_MEMBERS.docs(),
            "https://apidocs.launchdarkly.com/tag/Account-members#operation/getMembers"
        );
    }

    #[test]
    fn test_find_unique_single_match() {
        let items = vec![json!({"email": "a@x.io"}), json!({"email": "b@x.io"})];
        let found = find_unique(&items, LIST_MEMBERS, "email b@x.io", |m| m["email"] == "b@x.io").unwrap();
        assert_eq!(found, &items[1]);
    }

    #[test]
    fn test_find_unique_zero_and_many() {
        let items = vec![json!({"email": "a@x.io"}), json!({"email": "a@x.io"})];
        let none = find_unique(&items, LIST_MEMBERS, "email c@x.io", |m| m["email"] == "c@x.io");
        assert!(matches!(none, Err(LdError::AmbiguousMatch { api: "getMembers", .. })));

        let many = find_unique(&items, LIST_MEMBERS, "email a@x.io", |m| m["email"] == "a@x.io");
        match many {
            Err(LdError::AmbiguousMatch { message, .. }) => {
                assert_eq!(message, "2 items found for email a@x.io")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_document_key() {
        assert_eq!(document_key(&json!({"key": "r1"})).unwrap(), "r1");
        assert!(matches!(document_key(&json!({"name": "r1"})), Err(LdError::Validation(_))));
        assert!(matches!(document_key(&json!({"key": " "})), Err(LdError::Validation(_))));
    }

    #[test]
    fn test_collection_items_missing() {
        assert!(collection_items(&json!({})).is_empty());
        assert_eq!(collection_items(&json!({"items": [1, 2]})).len(), 2);
    }
}
