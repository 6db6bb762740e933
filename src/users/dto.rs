use serde::{Deserialize, Serialize};

use super::repo::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Customer,
    Admin,
    Staff,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Admin => "ADMIN",
            Role::Staff => "STAFF",
        }
    }
}

/// What the binding engine decided about a device/account relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceAction {
    AllowAccess,
    CreateNewAccount,
    AttachToExistingUser,
    DeviceChangeDetected,
    AccountInactive,
    ResolveConflict,
}

/// User view returned to clients; never exposes the password hash or the
/// surrogate key.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub user_id: String,
    pub full_name: String,
    pub user_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub access_device: Option<String>,
    pub provider: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            user_id: u.user_id.clone(),
            full_name: u.full_name.clone(),
            user_name: u.user_name.clone(),
            email: u.email.clone(),
            phone_number: u.phone_number.clone(),
            role: u.role.clone(),
            is_active: u.is_active,
            access_device: u.access_device.clone(),
            provider: u.provider.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidateDeviceQuery {
    pub device_id: String,
    pub user_identifier: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWithDeviceQuery {
    pub device_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub full_name: String,
    pub user_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub password: String,
    pub role: Option<Role>,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttachDeviceRequest {
    pub device_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeviceChangeRequest {
    /// Email, username, or external user id.
    pub user_identifier: String,
    pub new_device_id: String,
    pub current_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeviceAccessResponse {
    pub status: bool,
    pub is_valid: bool,
    pub is_attached_to_account: bool,
    pub has_multiple_accounts: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<DeviceAction>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associated_user: Option<PublicUser>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicting_users: Vec<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct CreateAccountResult {
    pub status: bool,
    pub message: String,
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_user: Option<PublicUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_user: Option<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct AttachDeviceResult {
    pub status: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeviceChangeResult {
    pub success: bool,
    pub message: String,
    pub requires_login: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_device: Option<String>,
}
