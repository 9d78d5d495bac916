use std::path::PathBuf;

use ldutils_lib::members::DEFAULT_INVITE_ROLE;
use ldutils_lib::{CustomRoleSpec, LdError, LdUtils, MemberQuery, NewProject, PatchOperation, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Every mode keyword the command line accepts.
pub const MODES: [&str; 25] = [
    "getFeatureFlags",
    "getFeatureFlag",
    "getFeatureFlagState",
    "toggleFeatureFlag",
    "migrateFeatureFlag",
    "bulkMigrateFeatureFlags",
    "getCustomRoles",
    "getCustomRole",
    "getCustomRoleById",
    "createCustomRole",
    "updateCustomRole",
    "upsertCustomRole",
    "bulkUpsertCustomRoles",
    "bulkUpsertCustomRoleFolder",
    "deleteCustomRole",
    "getTeamMembers",
    "getTeamMember",
    "getTeamMemberByEmail",
    "getTeamMemberCustomRoles",
    "inviteTeamMember",
    "getProjects",
    "getProject",
    "createProject",
    "updateProject",
    "deleteProject",
];

// The mode keyword is the first parameter, so positional index 0 is the second.
const ORDINALS: [&str; 7] = ["second", "third", "fourth", "fifth", "sixth", "seventh", "eighth"];

/// One fully validated command-line invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    GetFeatureFlags {
        project: String,
        env: Option<String>,
    },
    GetFeatureFlag {
        project: String,
        key: String,
        env: String,
    },
    GetFeatureFlagState {
        project: String,
        key: String,
        env: String,
    },
    ToggleFeatureFlag {
        project: String,
        key: String,
        env: String,
        on: bool,
    },
    MigrateFeatureFlag {
        project: String,
        key: String,
        from_env: String,
        to_env: String,
        include_state: bool,
    },
    BulkMigrateFeatureFlags {
        project: String,
        keys: Vec<String>,
        from_env: String,
        to_env: String,
        include_state: bool,
    },
    GetCustomRoles,
    GetCustomRole {
        key: String,
    },
    GetCustomRoleById {
        id: String,
    },
    CreateCustomRole(CustomRoleSpec),
    UpdateCustomRole(CustomRoleSpec),
    UpsertCustomRole(CustomRoleSpec),
    BulkUpsertCustomRoles {
        file: PathBuf,
    },
    BulkUpsertCustomRoleFolder {
        folder: PathBuf,
    },
    DeleteCustomRole {
        key: String,
    },
    GetTeamMembers(MemberQuery),
    GetTeamMember {
        id: String,
    },
    GetTeamMemberByEmail {
        email: String,
    },
    GetTeamMemberCustomRoles {
        email: String,
    },
    InviteTeamMember {
        email: String,
        role: String,
    },
    GetProjects,
    GetProject {
        key: String,
    },
    CreateProject(NewProject),
    UpdateProject {
        key: String,
        ops: Vec<PatchOperation>,
    },
    DeleteProject {
        key: String,
    },
}

/// Positional arguments following the mode keyword.
struct Positional<'a>(&'a [String]);

impl Positional<'_> {
    fn optional(&self, index: usize) -> Option<&str> {
        self.0
            .get(index)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    fn required(&self, index: usize, name: &str) -> Result<String> {
        self.optional(index)
            .map(String::from)
            .ok_or_else(|| supply(index, &format!("a {}", name)))
    }

    /// `true`/`false`, or `None` when absent.
    fn boolean(&self, index: usize) -> Result<Option<bool>> {
        match self.optional(index) {
            None => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(_) => Err(supply(index, "either 'true' or 'false'")),
        }
    }

    fn json<T: DeserializeOwned>(&self, index: usize, name: &str) -> Result<T> {
        let raw = self.required(index, name)?;
        serde_json::from_str(&raw).map_err(|_| supply(index, &format!("a {}", name)))
    }

    fn number(&self, index: usize, name: &str) -> Result<Option<u32>> {
        self.optional(index)
            .map(|raw| raw.parse().map_err(|_| supply(index, &format!("a numeric {}", name))))
            .transpose()
    }

    fn role(&self) -> Result<CustomRoleSpec> {
        Ok(CustomRoleSpec {
            key: self.required(0, "customRoleKey")?,
            name: self.required(1, "customRoleName")?,
            policy: self.json::<Vec<Value>>(2, "customRolePolicyArray")?,
            description: self.optional(3).map(String::from),
        })
    }
}

fn supply(index: usize, what: &str) -> LdError {
    let ordinal = ORDINALS.get(index).copied().unwrap_or("next");
    LdError::validation(format!("please supply {} as {} parameter", what, ordinal))
}

fn invalid_mode() -> LdError {
    LdError::validation(format!(
        "please supply a valid mode parameter, one of: {}",
        MODES.join(", ")
    ))
}

impl Mode {
    /// Validate `mode` and its positional `args`. No I/O happens here.
    pub fn parse(mode: Option<&str>, args: &[String]) -> Result<Self> {
        let args = Positional(args);
        let mode = match mode {
            Some(mode) => mode,
            None => return Err(invalid_mode()),
        };

        let parsed = match mode {
            "getFeatureFlags" => Mode::GetFeatureFlags {
                project: args.required(0, "projectKey")?,
                env: args.optional(1).map(String::from),
            },
            "getFeatureFlag" => Mode::GetFeatureFlag {
                project: args.required(0, "projectKey")?,
                key: args.required(1, "featureFlagKey")?,
                env: args.required(2, "environmentKeyQuery")?,
            },
            "getFeatureFlagState" => Mode::GetFeatureFlagState {
                project: args.required(0, "projectKey")?,
                key: args.required(1, "featureFlagKey")?,
                env: args.required(2, "environmentKeyQuery")?,
            },
            "toggleFeatureFlag" => Mode::ToggleFeatureFlag {
                project: args.required(0, "projectKey")?,
                key: args.required(1, "featureFlagKey")?,
                env: args.required(2, "environmentKeyQuery")?,
                on: args.boolean(3)?.ok_or_else(|| supply(3, "either 'true' or 'false'"))?,
            },
            "migrateFeatureFlag" => Mode::MigrateFeatureFlag {
                project: args.required(0, "projectKey")?,
                key: args.required(1, "featureFlagKey")?,
                from_env: args.required(2, "fromEnvironmentKey")?,
                to_env: args.required(3, "toEnvironmentKey")?,
                include_state: args.boolean(4)?.unwrap_or(false),
            },
            "bulkMigrateFeatureFlags" => Mode::BulkMigrateFeatureFlags {
                project: args.required(0, "projectKey")?,
                keys: args
                    .required(1, "featureFlagKeys")?
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from)
                    .collect(),
                from_env: args.required(2, "fromEnvironmentKey")?,
                to_env: args.required(3, "toEnvironmentKey")?,
                include_state: args.boolean(4)?.unwrap_or(false),
            },
            "getCustomRoles" => Mode::GetCustomRoles,
            "getCustomRole" => Mode::GetCustomRole {
                key: args.required(0, "customRoleKey")?,
            },
            "getCustomRoleById" => Mode::GetCustomRoleById {
                id: args.required(0, "customRoleId")?,
            },
            "createCustomRole" => Mode::CreateCustomRole(args.role()?),
            "updateCustomRole" => Mode::UpdateCustomRole(args.role()?),
            "upsertCustomRole" => Mode::UpsertCustomRole(args.role()?),
            "bulkUpsertCustomRoles" => Mode::BulkUpsertCustomRoles {
                file: args.required(0, "roleBulkLoadFile")?.into(),
            },
            "bulkUpsertCustomRoleFolder" => Mode::BulkUpsertCustomRoleFolder {
                folder: args.required(0, "roleFolder")?.into(),
            },
            "deleteCustomRole" => Mode::DeleteCustomRole {
                key: args.required(0, "customRoleKey")?,
            },
            "getTeamMembers" => Mode::GetTeamMembers(MemberQuery {
                limit: args.number(0, "limit")?,
                offset: args.number(1, "offset")?,
                filter: args.optional(2).map(String::from),
            }),
            "getTeamMember" => Mode::GetTeamMember {
                id: args.required(0, "memberId")?,
            },
            "getTeamMemberByEmail" => Mode::GetTeamMemberByEmail {
                email: args.required(0, "emailAddress")?,
            },
            "getTeamMemberCustomRoles" => Mode::GetTeamMemberCustomRoles {
                email: args.required(0, "emailAddress")?,
            },
            "inviteTeamMember" => Mode::InviteTeamMember {
                email: args.required(0, "emailAddress")?,
                role: args.optional(1).unwrap_or(DEFAULT_INVITE_ROLE).to_string(),
            },
            "getProjects" => Mode::GetProjects,
            "getProject" => Mode::GetProject {
                key: args.required(0, "projectKey")?,
            },
            "createProject" => Mode::CreateProject(NewProject::from_args(
                &args.required(0, "projectKey")?,
                &args.required(1, "projectName")?,
                args.optional(2),
                args.optional(3),
                args.optional(4),
                args.optional(5),
                args.optional(6),
            )?),
            "updateProject" => Mode::UpdateProject {
                key: args.required(0, "projectKey")?,
                ops: args.json(1, "jsonPatch")?,
            },
            "deleteProject" => Mode::DeleteProject {
                key: args.required(0, "projectKey")?,
            },
            _ => return Err(invalid_mode()),
        };
        Ok(parsed)
    }
}

/// Run `mode` against the API and return its JSON result.
pub async fn execute(mode: Mode, ld: &LdUtils) -> Result<Value> {
    let value = match mode {
        Mode::GetFeatureFlags { project, env } => {
            ld.flags().get_feature_flags(&project, env.as_deref()).await?
        }
        Mode::GetFeatureFlag { project, key, env } => {
            ld.flags().get_feature_flag(&project, &key, Some(&env)).await?
        }
        Mode::GetFeatureFlagState { project, key, env } => {
            Value::Bool(ld.flags().get_feature_flag_state(&project, &key, &env).await?)
        }
        Mode::ToggleFeatureFlag { project, key, env, on } => {
            ld.flags().toggle_feature_flag(&project, &key, &env, on).await?
        }
        Mode::MigrateFeatureFlag {
            project,
            key,
            from_env,
            to_env,
            include_state,
        } => {
            ld.flags()
                .migrate_feature_flag(&project, &key, &from_env, &to_env, include_state)
                .await?
        }
        Mode::BulkMigrateFeatureFlags {
            project,
            keys,
            from_env,
            to_env,
            include_state,
        } => Value::Array(
            ld.flags()
                .bulk_migrate_feature_flags(&project, &keys, &from_env, &to_env, include_state)
                .await?,
        ),
        Mode::GetCustomRoles => ld.roles().get_custom_roles().await?,
        Mode::GetCustomRole { key } => ld.roles().get_custom_role(&key).await?,
        Mode::GetCustomRoleById { id } => ld.roles().get_custom_role_by_id(&id).await?,
        Mode::CreateCustomRole(role) => ld.roles().create_custom_role(&role).await?,
        Mode::UpdateCustomRole(role) => ld.roles().update_custom_role(&role).await?,
        Mode::UpsertCustomRole(role) => ld.roles().upsert_custom_role(&role).await?,
        Mode::BulkUpsertCustomRoles { file } => {
            Value::Array(ld.roles().bulk_upsert_custom_roles_from_file(&file).await?)
        }
        Mode::BulkUpsertCustomRoleFolder { folder } => {
            Value::Array(ld.roles().bulk_upsert_custom_roles_from_folder(&folder).await?)
        }
        Mode::DeleteCustomRole { key } => ld.roles().delete_custom_role(&key).await?,
        Mode::GetTeamMembers(query) => ld.members().get_team_members(&query).await?,
        Mode::GetTeamMember { id } => ld.members().get_team_member(&id).await?,
        Mode::GetTeamMemberByEmail { email } => ld.members().get_team_member_by_email(&email).await?,
        Mode::GetTeamMemberCustomRoles { email } => {
            ld.members().get_team_member_custom_roles(&email).await?
        }
        Mode::InviteTeamMember { email, role } => ld.members().invite_team_member(&email, &role).await?,
        Mode::GetProjects => ld.projects().get_projects().await?,
        Mode::GetProject { key } => ld.projects().get_project(&key).await?,
        Mode::CreateProject(project) => ld.projects().create_project(&project).await?,
        Mode::UpdateProject { key, ops } => ld.projects().update_project(&key, &ops).await?,
        Mode::DeleteProject { key } => ld.projects().delete_project(&key).await?,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn message(mode: &str, items: &[&str]) -> String {
        Mode::parse(Some(mode), &args(items)).unwrap_err().to_string()
    }

    #[test]
    fn test_missing_and_unknown_mode() {
        for mode in [None, Some("getEverything")] {
            let err = Mode::parse(mode, &[]).unwrap_err();
            assert!(matches!(err, LdError::Validation(_)));
            assert!(err
                .to_string()
                .starts_with("please supply a valid mode parameter, one of: getFeatureFlags,"));
        }
    }

    #[test]
    fn test_missing_project_key() {
        assert_eq!(
            message("getFeatureFlags", &[]),
            "please supply a projectKey as second parameter"
        );
        assert_eq!(
            message("getFeatureFlags", &["  "]),
            "please supply a projectKey as second parameter"
        );
    }

    #[test]
    fn test_feature_flag_arguments() {
        assert_eq!(
            message("getFeatureFlag", &["proj"]),
            "please supply a featureFlagKey as third parameter"
        );
        assert_eq!(
            message("getFeatureFlagState", &["proj", "flag"]),
            "please supply a environmentKeyQuery as fourth parameter"
        );
        assert_eq!(
            Mode::parse(Some("getFeatureFlagState"), &args(&["proj", "flag", "test"])).unwrap(),
            Mode::GetFeatureFlagState {
                project: "proj".into(),
                key: "flag".into(),
                env: "test".into()
            }
        );
    }

    #[test]
    fn test_toggle_requires_boolean() {
        for bad in [&["proj", "flag", "test"][..], &["proj", "flag", "test", "yes"][..]] {
            assert_eq!(
                message("toggleFeatureFlag", bad),
                "please supply either 'true' or 'false' as fifth parameter"
            );
        }
        let mode = Mode::parse(Some("toggleFeatureFlag"), &args(&["proj", "flag", "test", "false"])).unwrap();
        assert!(matches!(mode, Mode::ToggleFeatureFlag { on: false, .. }));
    }

    #[test]
    fn test_bulk_migrate_splits_keys() {
        let mode = Mode::parse(
            Some("bulkMigrateFeatureFlags"),
            &args(&["proj", "a, b,,c", "test", "production", "true"]),
        )
        .unwrap();
        assert_eq!(
            mode,
            Mode::BulkMigrateFeatureFlags {
                project: "proj".into(),
                keys: vec!["a".into(), "b".into(), "c".into()],
                from_env: "test".into(),
                to_env: "production".into(),
                include_state: true,
            }
        );
        assert_eq!(
            message("migrateFeatureFlag", &["proj", "flag", "test"]),
            "please supply a toEnvironmentKey as fifth parameter"
        );
    }

    #[test]
    fn test_custom_role_arguments() {
        assert_eq!(
            message("createCustomRole", &["role"]),
            "please supply a customRoleName as third parameter"
        );
        assert_eq!(
            message("upsertCustomRole", &["role", "Role", "not json"]),
            "please supply a customRolePolicyArray as fourth parameter"
        );
        assert_eq!(
            message("updateCustomRole", &["role", "Role", r#"{"effect": "allow"}"#]),
            "please supply a customRolePolicyArray as fourth parameter"
        );

        let mode = Mode::parse(
            Some("createCustomRole"),
            &args(&["role", "Role", r#"[{"effect": "allow"}]"#, "desc"]),
        )
        .unwrap();
        assert_eq!(
            mode,
            Mode::CreateCustomRole(CustomRoleSpec {
                key: "role".into(),
                name: "Role".into(),
                policy: vec![json!({"effect": "allow"})],
                description: Some("desc".into()),
            })
        );
    }

    #[test]
    fn test_invite_defaults_to_reader() {
        assert_eq!(
            Mode::parse(Some("inviteTeamMember"), &args(&["a@example.com"])).unwrap(),
            Mode::InviteTeamMember {
                email: "a@example.com".into(),
                role: "reader".into()
            }
        );
    }

    #[test]
    fn test_team_member_paging() {
        assert_eq!(
            Mode::parse(Some("getTeamMembers"), &args(&["10", "20"])).unwrap(),
            Mode::GetTeamMembers(MemberQuery {
                limit: Some(10),
                offset: Some(20),
                filter: None
            })
        );
        assert_eq!(
            message("getTeamMembers", &["ten"]),
            "please supply a numeric limit as second parameter"
        );
    }

    #[test]
    fn test_project_arguments() {
        assert_eq!(
            message("createProject", &["p", "P", "false", "dev,Development"]),
            "Invalid environments configuration, should have 3 items, key, name and colour"
        );
        let mode = Mode::parse(
            Some("updateProject"),
            &args(&["p", r#"[{"op": "replace", "path": "/name", "value": "New"}]"#]),
        )
        .unwrap();
        assert_eq!(
            mode,
            Mode::UpdateProject {
                key: "p".into(),
                ops: vec![PatchOperation::replace("/name", json!("New"))]
            }
        );
    }

    #[test]
    fn test_every_mode_is_recognised() {
        for mode in MODES {
            if let Err(err) = Mode::parse(Some(mode), &[]) {
                assert!(
                    !err.to_string().contains("valid mode parameter"),
                    "{} not recognised",
                    mode
                );
            }
        }
    }
}
