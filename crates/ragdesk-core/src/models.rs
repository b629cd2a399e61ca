//! Core data models: accounts, tenants, apps, end users, and uploaded files.
//!
//! Timestamps are Unix seconds, matching the `INTEGER` columns in the SQLite
//! schema.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an [`Account`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Pending,
    Uninitialized,
    Active,
    Banned,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Uninitialized => "uninitialized",
            AccountStatus::Active => "active",
            AccountStatus::Banned => "banned",
            AccountStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "pending" => Ok(AccountStatus::Pending),
            "uninitialized" => Ok(AccountStatus::Uninitialized),
            "active" => Ok(AccountStatus::Active),
            "banned" => Ok(AccountStatus::Banned),
            "closed" => Ok(AccountStatus::Closed),
            other => anyhow::bail!("unknown account status: '{}'", other),
        }
    }
}

/// Role of an account inside a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantAccountRole {
    Owner,
    Admin,
    Editor,
    Normal,
}

impl TenantAccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantAccountRole::Owner => "owner",
            TenantAccountRole::Admin => "admin",
            TenantAccountRole::Editor => "editor",
            TenantAccountRole::Normal => "normal",
        }
    }
}

impl FromStr for TenantAccountRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "owner" => Ok(TenantAccountRole::Owner),
            "admin" => Ok(TenantAccountRole::Admin),
            "editor" => Ok(TenantAccountRole::Editor),
            "normal" => Ok(TenantAccountRole::Normal),
            other => anyhow::bail!("unknown tenant role: '{}'", other),
        }
    }
}

/// Who created an [`UploadFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatedByRole {
    Account,
    EndUser,
}

impl CreatedByRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreatedByRole::Account => "account",
            CreatedByRole::EndUser => "end_user",
        }
    }
}

impl FromStr for CreatedByRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "account" => Ok(CreatedByRole::Account),
            "end_user" => Ok(CreatedByRole::EndUser),
            other => anyhow::bail!("unknown creator role: '{}'", other),
        }
    }
}

/// A console user.
///
/// `current_tenant_id` and `current_role` are not columns; they are resolved
/// from the account's tenant memberships when the account is loaded.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password: Option<String>,
    #[serde(skip)]
    pub password_salt: Option<String>,
    pub avatar: Option<String>,
    pub interface_language: Option<String>,
    pub interface_theme: Option<String>,
    pub timezone: Option<String>,
    pub last_login_at: Option<i64>,
    pub last_login_ip: Option<String>,
    pub last_active_at: i64,
    pub status: AccountStatus,
    pub initialized_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub current_tenant_id: Option<String>,
    pub current_role: Option<TenantAccountRole>,
}

impl Account {
    pub fn is_password_set(&self) -> bool {
        self.password.is_some()
    }
}

/// A workspace owning apps and uploaded files.
#[derive(Debug, Clone, Serialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub encrypt_public_key: Option<String>,
    pub plan: String,
    pub status: String,
    pub custom_config: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Tenant {
    /// Parsed `custom_config`; empty object when unset or malformed.
    pub fn custom_config_dict(&self) -> serde_json::Value {
        self.custom_config
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| serde_json::json!({}))
    }

    pub fn set_custom_config_dict(&mut self, value: &serde_json::Value) {
        self.custom_config = Some(value.to_string());
    }
}

/// Membership of an account in a tenant.
#[derive(Debug, Clone, Serialize)]
pub struct TenantAccountJoin {
    pub id: String,
    pub tenant_id: String,
    pub account_id: String,
    pub current: bool,
    pub role: TenantAccountRole,
    pub invited_by: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// An application configured inside a tenant.
#[derive(Debug, Clone, Serialize)]
pub struct App {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub description: String,
    pub mode: String,
    pub icon_type: Option<String>,
    pub icon: Option<String>,
    pub icon_background: Option<String>,
    pub status: String,
    pub enable_site: bool,
    pub enable_api: bool,
    pub api_rpm: i64,
    pub api_rph: i64,
    pub is_demo: bool,
    pub is_public: bool,
    pub max_active_requests: Option<i64>,
    pub created_by: Option<String>,
    pub created_at: i64,
    pub updated_by: Option<String>,
    pub updated_at: i64,
}

impl App {
    /// Base URL of the service API for this app.
    ///
    /// Uses the configured service URL when set, the request host otherwise.
    pub fn api_base_url(service_api_url: &str, request_host_url: &str) -> String {
        let base = if service_api_url.is_empty() {
            request_host_url
        } else {
            service_api_url
        };
        format!("{}/v1", base.trim_end_matches('/'))
    }
}

/// An anonymous or externally identified user of an app.
#[derive(Debug, Clone, Serialize)]
pub struct EndUser {
    pub id: String,
    pub tenant_id: String,
    pub app_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub external_user_id: Option<String>,
    pub name: Option<String>,
    pub is_anonymous: bool,
    pub session_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Metadata row for a file saved to object storage.
#[derive(Debug, Clone, Serialize)]
pub struct UploadFile {
    pub id: String,
    pub tenant_id: String,
    pub storage_type: String,
    pub key: String,
    pub name: String,
    pub size: i64,
    pub extension: String,
    pub mime_type: Option<String>,
    pub created_by_role: CreatedByRole,
    pub created_by: String,
    pub created_at: i64,
    pub used: bool,
    pub used_by: Option<String>,
    pub used_at: Option<i64>,
    pub hash: Option<String>,
    pub source_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            AccountStatus::Pending,
            AccountStatus::Uninitialized,
            AccountStatus::Active,
            AccountStatus::Banned,
            AccountStatus::Closed,
        ] {
            assert_eq!(status.as_str().parse::<AccountStatus>().unwrap(), status);
        }
        assert!("deleted".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn test_custom_config_dict() {
        let mut tenant = Tenant {
            id: "t1".to_string(),
            name: "Acme".to_string(),
            encrypt_public_key: None,
            plan: "basic".to_string(),
            status: "normal".to_string(),
            custom_config: None,
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(tenant.custom_config_dict(), serde_json::json!({}));

        tenant.set_custom_config_dict(&serde_json::json!({"remove_webapp_brand": true}));
        assert_eq!(tenant.custom_config_dict()["remove_webapp_brand"], true);

        tenant.custom_config = Some("not json".to_string());
        assert_eq!(tenant.custom_config_dict(), serde_json::json!({}));
    }

    #[test]
    fn test_api_base_url() {
        assert_eq!(
            App::api_base_url("", "http://localhost:5001/"),
            "http://localhost:5001/v1"
        );
        assert_eq!(
            App::api_base_url("https://api.example.com", "http://localhost:5001"),
            "https://api.example.com/v1"
        );
    }
}
