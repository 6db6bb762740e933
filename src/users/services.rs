use rand::Rng;
use sqlx::{PgConnection, PgPool};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::auth::password::{hash_password, verify_password};

use super::device::{is_valid_device_id, normalize_device_id};
use super::dto::{
    AttachDeviceResult, CreateAccountResult, CreateUserRequest, DeviceAccessResponse,
    DeviceAction, DeviceChangeRequest, DeviceChangeResult, PublicUser, Role,
};
use super::repo::{self, NewUser, User};

/// Engine-level classification of a device/account relationship. Carries full
/// user rows; the transport layer maps them to public views.
#[derive(Debug, Clone)]
pub struct DeviceAccess {
    pub is_valid: bool,
    pub is_attached_to_account: bool,
    pub has_multiple_accounts: bool,
    pub action: DeviceAction,
    pub message: String,
    pub suggested_action: String,
    pub associated_user: Option<User>,
    pub conflicting_users: Vec<User>,
}

impl DeviceAccess {
    pub fn into_response(self) -> DeviceAccessResponse {
        DeviceAccessResponse {
            status: false,
            is_valid: self.is_valid,
            is_attached_to_account: self.is_attached_to_account,
            has_multiple_accounts: self.has_multiple_accounts,
            action: Some(self.action),
            message: self.message,
            suggested_action: Some(self.suggested_action),
            associated_user: self.associated_user.as_ref().map(PublicUser::from),
            conflicting_users: self.conflicting_users.iter().map(PublicUser::from).collect(),
        }
    }
}

/// Pure classification over (zero/one/many bound users) x (identifier
/// given/absent) x (existing user has/has-not a device). Every combination
/// maps to exactly one action; nothing is mutated here, and every other
/// engine operation calls this first as a guard.
pub fn classify_device_access(
    mut bound: Vec<User>,
    existing: Option<User>,
    identifier_given: bool,
) -> DeviceAccess {
    match bound.len() {
        0 => match (identifier_given, existing) {
            (true, Some(user)) if user.access_device.is_some() => DeviceAccess {
                is_valid: false,
                is_attached_to_account: false,
                has_multiple_accounts: false,
                action: DeviceAction::DeviceChangeDetected,
                message: "User exists but with different device. Device change detected.".into(),
                suggested_action: "Help user login and update device".into(),
                associated_user: Some(user),
                conflicting_users: Vec::new(),
            },
            (true, Some(user)) => DeviceAccess {
                is_valid: true,
                is_attached_to_account: false,
                has_multiple_accounts: false,
                action: DeviceAction::AttachToExistingUser,
                message: "User exists without device. Ready to attach device.".into(),
                suggested_action: "Attach device to existing user account".into(),
                associated_user: Some(user),
                conflicting_users: Vec::new(),
            },
            (true, None) => DeviceAccess {
                is_valid: false,
                is_attached_to_account: false,
                has_multiple_accounts: false,
                action: DeviceAction::CreateNewAccount,
                message: "Device not attached and no existing user found.".into(),
                suggested_action: "Create new user account and attach device".into(),
                associated_user: None,
                conflicting_users: Vec::new(),
            },
            (false, _) => DeviceAccess {
                is_valid: false,
                is_attached_to_account: false,
                has_multiple_accounts: false,
                action: DeviceAction::CreateNewAccount,
                message: "Device not attached to any account".into(),
                suggested_action: "Create new user account and attach device".into(),
                associated_user: None,
                conflicting_users: Vec::new(),
            },
        },
        1 => {
            let user = bound.remove(0);
            let active = user.is_active;
            DeviceAccess {
                is_valid: active,
                is_attached_to_account: true,
                has_multiple_accounts: false,
                action: if active {
                    DeviceAction::AllowAccess
                } else {
                    DeviceAction::AccountInactive
                },
                message: if active {
                    "Device is properly attached to an active account".into()
                } else {
                    "Device is attached to an inactive account".into()
                },
                suggested_action: if active {
                    "Allow access".into()
                } else {
                    "Activate account".into()
                },
                associated_user: Some(user),
                conflicting_users: Vec::new(),
            }
        }
        n => DeviceAccess {
            is_valid: false,
            is_attached_to_account: true,
            has_multiple_accounts: true,
            action: DeviceAction::ResolveConflict,
            message: format!("Device is attached to multiple accounts ({n} accounts found)"),
            suggested_action: "Resolve account conflict - user must choose primary account".into(),
            associated_user: None,
            conflicting_users: bound,
        },
    }
}

/// Which lookup an identifier string selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Email,
    ExternalId,
    Username,
}

pub fn identifier_kind(identifier: &str, external_prefix: &str) -> IdentifierKind {
    if identifier.contains('@') {
        IdentifierKind::Email
    } else if identifier.starts_with(external_prefix) {
        IdentifierKind::ExternalId
    } else {
        IdentifierKind::Username
    }
}

pub async fn find_user_by_identifier(
    conn: &mut PgConnection,
    external_prefix: &str,
    identifier: &str,
) -> anyhow::Result<Option<User>> {
    match identifier_kind(identifier, external_prefix) {
        IdentifierKind::Email => repo::find_by_email(conn, identifier).await,
        IdentifierKind::ExternalId => repo::find_by_user_id(conn, identifier).await,
        IdentifierKind::Username => repo::find_by_user_name(conn, identifier).await,
    }
}

/// Read-only guard: normalizes, queries the bound set and the optional
/// identifier match, and classifies.
pub async fn validate_device_access(
    conn: &mut PgConnection,
    external_prefix: &str,
    device_id: &str,
    user_identifier: Option<&str>,
) -> anyhow::Result<DeviceAccess> {
    let device = normalize_device_id(device_id);
    let bound = repo::find_by_access_device(conn, &device).await?;

    let existing = match user_identifier {
        Some(identifier) => find_user_by_identifier(conn, external_prefix, identifier).await?,
        None => None,
    };

    Ok(classify_device_access(
        bound,
        existing,
        user_identifier.is_some(),
    ))
}

/// External user ids keep the original shape (prefix + epoch millis) with a
/// random suffix so concurrent creations in the same millisecond stay apart.
pub fn generate_user_id(prefix: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let salt: u16 = rand::thread_rng().gen_range(0..1000);
    format!("{prefix}{millis}{salt:03}")
}

fn refuse_create(message: impl Into<String>) -> CreateAccountResult {
    CreateAccountResult {
        status: false,
        message: message.into(),
        user_id: None,
        created_user: None,
        existing_user: None,
    }
}

/// Creation refusal rules, checked in order: conflicting bindings first,
/// then email and username uniqueness. A single existing binding surfaces
/// the holding account.
pub fn create_refusal(
    access: &DeviceAccess,
    email_taken: bool,
    user_name_taken: bool,
) -> Option<CreateAccountResult> {
    if access.has_multiple_accounts {
        return Some(refuse_create(
            "Cannot create account: device attached to multiple existing accounts",
        ));
    }
    if access.is_attached_to_account {
        let user_name = access
            .associated_user
            .as_ref()
            .map(|u| u.user_name.clone())
            .unwrap_or_default();
        let mut result = refuse_create(format!(
            "Cannot create account: device already attached to existing account ({user_name})"
        ));
        result.existing_user = access.associated_user.as_ref().map(PublicUser::from);
        return Some(result);
    }
    if email_taken {
        return Some(refuse_create("Account with this email already exists"));
    }
    if user_name_taken {
        return Some(refuse_create("Username already taken"));
    }
    None
}

/// Creates a new active account bound to the device. Every refusal is a
/// business outcome in the result, never an error.
pub async fn create_account_with_device(
    db: &PgPool,
    external_prefix: &str,
    device_id: &str,
    req: &CreateUserRequest,
) -> anyhow::Result<CreateAccountResult> {
    if !is_valid_device_id(device_id) {
        return Ok(refuse_create("Invalid device identifier format"));
    }
    let device = normalize_device_id(device_id);

    let mut tx = db.begin().await?;
    let access = validate_device_access(&mut *tx, external_prefix, &device, None).await?;
    let email_taken = repo::exists_by_email(&mut *tx, &req.email).await?;
    let user_name_taken = repo::exists_by_user_name(&mut *tx, &req.user_name).await?;
    if let Some(refusal) = create_refusal(&access, email_taken, user_name_taken) {
        warn!("account creation refused");
        return Ok(refusal);
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = generate_user_id(external_prefix);
    let role = req.role.unwrap_or(Role::Customer);

    let user = repo::insert(
        &mut *tx,
        &NewUser {
            user_id: &user_id,
            full_name: &req.full_name,
            user_name: &req.user_name,
            phone_number: req.phone_number.as_deref(),
            role: role.as_str(),
            email: &req.email,
            password_hash: Some(&password_hash),
            access_device: Some(&device),
            provider: req.provider.as_deref(),
            provider_id: req.provider_id.as_deref(),
        },
    )
    .await?;
    tx.commit().await?;

    info!(user_id = %user.user_id, device = %device, "account created with device");
    Ok(CreateAccountResult {
        status: true,
        message: "User account created successfully with device attached".into(),
        user_id: Some(user.user_id.clone()),
        created_user: Some(PublicUser::from(&user)),
        existing_user: None,
    })
}

/// Attach refusal rules: multiple bindings always refuse; a single binding
/// refuses unless it already points at the target user (idempotent
/// re-attach). The refusal message names the holding account.
pub fn attach_refusal(access: &DeviceAccess, target_user_id: &str) -> Option<String> {
    if access.has_multiple_accounts {
        return Some("Cannot attach device: already attached to multiple accounts".into());
    }
    match &access.associated_user {
        Some(user) if access.is_attached_to_account && user.user_id != target_user_id => {
            Some(format!(
                "Cannot attach device: already attached to another account ({})",
                user.user_name
            ))
        }
        _ => None,
    }
}

pub async fn attach_device_to_user(
    db: &PgPool,
    external_prefix: &str,
    user_id: &str,
    device_id: &str,
) -> anyhow::Result<AttachDeviceResult> {
    let device = normalize_device_id(device_id);

    let mut tx = db.begin().await?;
    let access = validate_device_access(&mut *tx, external_prefix, &device, None).await?;
    if let Some(message) = attach_refusal(&access, user_id) {
        warn!(user_id, "device attach refused");
        return Ok(AttachDeviceResult {
            status: false,
            message,
        });
    }

    let Some(user) = repo::find_by_user_id(&mut *tx, user_id).await? else {
        return Ok(AttachDeviceResult {
            status: false,
            message: "User not found".into(),
        });
    };

    repo::set_device(&mut *tx, user.id, Some(&device)).await?;
    tx.commit().await?;

    info!(user_id = %user.user_id, device = %device, "device attached");
    Ok(AttachDeviceResult {
        status: true,
        message: "Device successfully attached to user account".into(),
    })
}

pub async fn detach_device_from_user(
    db: &PgPool,
    user_id: &str,
) -> anyhow::Result<AttachDeviceResult> {
    let mut tx = db.begin().await?;
    let Some(user) = repo::find_by_user_id(&mut *tx, user_id).await? else {
        return Ok(AttachDeviceResult {
            status: false,
            message: "User not found".into(),
        });
    };

    repo::set_device(&mut *tx, user.id, None).await?;
    tx.commit().await?;

    info!(user_id = %user.user_id, old_device = ?user.access_device, "device detached");
    Ok(AttachDeviceResult {
        status: true,
        message: "Device successfully detached from user account".into(),
    })
}

/// User-initiated, password-gated rebinding. The only operation that changes
/// a binding without a separate attach step; old and new device values are
/// reported for audit.
pub async fn handle_device_change(
    db: &PgPool,
    external_prefix: &str,
    req: &DeviceChangeRequest,
) -> anyhow::Result<DeviceChangeResult> {
    let new_device = normalize_device_id(&req.new_device_id);

    let mut tx = db.begin().await?;
    let Some(user) = find_user_by_identifier(&mut *tx, external_prefix, &req.user_identifier).await?
    else {
        return Ok(DeviceChangeResult {
            success: false,
            message: "User not found".into(),
            requires_login: false,
            user: None,
            old_device: None,
            new_device: None,
        });
    };

    if let Some(password) = req.current_password.as_deref() {
        // Fails closed: federated accounts have no hash to verify against.
        let verified = match user.password_hash.as_deref() {
            Some(hash) => verify_password(password, hash)?,
            None => false,
        };
        if !verified {
            warn!(user_id = %user.user_id, "device change with invalid password");
            return Ok(DeviceChangeResult {
                success: false,
                message: "Invalid password".into(),
                requires_login: true,
                user: Some(PublicUser::from(&user)),
                old_device: None,
                new_device: None,
            });
        }
    }

    let access = validate_device_access(&mut *tx, external_prefix, &new_device, None).await?;
    let held_by_other = access
        .associated_user
        .as_ref()
        .map(|holder| holder.user_id != user.user_id)
        .unwrap_or(access.has_multiple_accounts);
    if access.is_attached_to_account && held_by_other {
        return Ok(DeviceChangeResult {
            success: false,
            message: "New device is already attached to another account".into(),
            requires_login: false,
            user: Some(PublicUser::from(&user)),
            old_device: None,
            new_device: None,
        });
    }

    let old_device = user.access_device.clone();
    repo::set_device(&mut *tx, user.id, Some(&new_device)).await?;
    tx.commit().await?;

    info!(
        user_id = %user.user_id,
        old_device = ?old_device,
        new_device = %new_device,
        "device changed"
    );
    Ok(DeviceChangeResult {
        success: true,
        message: "Device updated successfully. User can now access with new device.".into(),
        requires_login: false,
        user: Some(PublicUser::from(&user)),
        old_device,
        new_device: Some(new_device),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, external: &str, device: Option<&str>, active: bool) -> User {
        User {
            id,
            user_id: external.into(),
            full_name: "Test User".into(),
            user_name: format!("user{id}"),
            phone_number: None,
            role: "CUSTOMER".into(),
            email: format!("user{id}@example.com"),
            password_hash: Some("$argon2id$fake".into()),
            is_active: active,
            access_device: device.map(Into::into),
            provider: None,
            provider_id: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            modified_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn hex64() -> String {
        "ab".repeat(32)
    }

    #[test]
    fn unbound_without_identifier_creates_new_account() {
        let access = classify_device_access(vec![], None, false);
        assert_eq!(access.action, DeviceAction::CreateNewAccount);
        assert!(!access.is_valid);
        assert!(!access.is_attached_to_account);
        assert_eq!(access.message, "Device not attached to any account");
    }

    #[test]
    fn unbound_with_unknown_identifier_creates_new_account() {
        let access = classify_device_access(vec![], None, true);
        assert_eq!(access.action, DeviceAction::CreateNewAccount);
        assert!(access.message.contains("no existing user found"));
    }

    #[test]
    fn unbound_with_matching_user_holding_other_device_detects_change() {
        let existing = user(1, "pedek100", Some(&hex64().to_uppercase()), true);
        let access = classify_device_access(vec![], Some(existing), true);
        assert_eq!(access.action, DeviceAction::DeviceChangeDetected);
        assert!(!access.is_valid);
        assert_eq!(
            access.associated_user.as_ref().map(|u| u.user_id.as_str()),
            Some("pedek100")
        );
    }

    #[test]
    fn unbound_with_deviceless_user_is_ready_to_attach() {
        let existing = user(1, "pedek100", None, true);
        let access = classify_device_access(vec![], Some(existing), true);
        assert_eq!(access.action, DeviceAction::AttachToExistingUser);
        assert!(access.is_valid);
    }

    #[test]
    fn single_active_binding_allows_access() {
        let bound = vec![user(1, "pedek100", Some("AA"), true)];
        let access = classify_device_access(bound, None, false);
        assert_eq!(access.action, DeviceAction::AllowAccess);
        assert!(access.is_valid);
        assert!(access.is_attached_to_account);
    }

    #[test]
    fn single_inactive_binding_reports_inactive_account() {
        let bound = vec![user(1, "pedek100", Some("AA"), false)];
        let access = classify_device_access(bound, None, false);
        assert_eq!(access.action, DeviceAction::AccountInactive);
        assert!(!access.is_valid);
        assert!(access.is_attached_to_account);
    }

    #[test]
    fn multiple_bindings_surface_the_full_conflicting_set() {
        let bound = vec![
            user(1, "pedek100", Some("AA"), true),
            user(2, "pedek200", Some("AA"), true),
            user(3, "pedek300", Some("AA"), false),
        ];
        let access = classify_device_access(bound, None, true);
        assert_eq!(access.action, DeviceAction::ResolveConflict);
        assert!(access.has_multiple_accounts);
        assert_eq!(access.conflicting_users.len(), 3);
        assert!(access.message.contains("3 accounts found"));
    }

    #[test]
    fn every_input_combination_is_classified() {
        // (zero/one/many bound) x (identifier given/absent) x
        // (existing has/has-not device): none may fall through.
        for bound_count in [0usize, 1, 2] {
            for identifier_given in [false, true] {
                for existing_device in [None, Some("FF")] {
                    let bound: Vec<User> = (0..bound_count)
                        .map(|i| user(i as i64 + 1, &format!("pedek{i}"), Some("AA"), true))
                        .collect();
                    let existing = identifier_given
                        .then(|| user(99, "pedek999", existing_device, true));
                    let access = classify_device_access(bound, existing, identifier_given);
                    match bound_count {
                        0 if !identifier_given => {
                            assert_eq!(access.action, DeviceAction::CreateNewAccount)
                        }
                        0 if existing_device.is_some() => {
                            assert_eq!(access.action, DeviceAction::DeviceChangeDetected)
                        }
                        0 => assert_eq!(access.action, DeviceAction::AttachToExistingUser),
                        1 => assert_eq!(access.action, DeviceAction::AllowAccess),
                        _ => assert_eq!(access.action, DeviceAction::ResolveConflict),
                    }
                }
            }
        }
    }

    #[test]
    fn classification_view_keeps_status_false() {
        let bound = vec![user(1, "pedek100", Some("AA"), true)];
        let response = classify_device_access(bound, None, false).into_response();
        assert!(!response.status);
        assert!(response.is_valid);
        assert_eq!(response.action, Some(DeviceAction::AllowAccess));
    }

    #[test]
    fn duplicate_email_refuses_account_creation() {
        let access = classify_device_access(vec![], None, false);
        let refusal = create_refusal(&access, true, false).expect("refused");
        assert!(!refusal.status);
        assert_eq!(refusal.message, "Account with this email already exists");
    }

    #[test]
    fn duplicate_username_refuses_account_creation() {
        let access = classify_device_access(vec![], None, false);
        let refusal = create_refusal(&access, false, true).expect("refused");
        assert_eq!(refusal.message, "Username already taken");
    }

    #[test]
    fn email_check_precedes_username_check() {
        let access = classify_device_access(vec![], None, false);
        let refusal = create_refusal(&access, true, true).expect("refused");
        assert_eq!(refusal.message, "Account with this email already exists");
    }

    #[test]
    fn bound_device_refusal_surfaces_holding_account() {
        let holder = user(1, "pedekU1", Some("AA"), true);
        let holder_name = holder.user_name.clone();
        let access = classify_device_access(vec![holder], None, false);
        let refusal = create_refusal(&access, false, false).expect("refused");
        assert!(refusal.message.contains("already attached to existing account"));
        assert!(refusal.message.contains(&holder_name));
        assert_eq!(
            refusal.existing_user.as_ref().map(|u| u.user_id.as_str()),
            Some("pedekU1")
        );
    }

    #[test]
    fn clean_inputs_pass_creation_checks() {
        let access = classify_device_access(vec![], None, false);
        assert!(create_refusal(&access, false, false).is_none());
    }

    #[test]
    fn attach_to_same_user_is_idempotent() {
        let holder = user(1, "pedekU1", Some("AA"), true);
        let access = classify_device_access(vec![holder], None, false);
        assert!(attach_refusal(&access, "pedekU1").is_none());
    }

    #[test]
    fn attach_to_other_user_is_refused_naming_the_holder() {
        let holder = user(1, "pedekU1", Some("AA"), true);
        let holder_name = holder.user_name.clone();
        let access = classify_device_access(vec![holder], None, false);
        let message = attach_refusal(&access, "pedekU2").expect("refused");
        assert!(message.contains(&holder_name));
    }

    #[test]
    fn attach_with_conflicting_bindings_is_refused() {
        let bound = vec![
            user(1, "pedekU1", Some("AA"), true),
            user(2, "pedekU2", Some("AA"), true),
        ];
        let access = classify_device_access(bound, None, false);
        let message = attach_refusal(&access, "pedekU1").expect("refused");
        assert!(message.contains("multiple accounts"));
    }

    #[test]
    fn identifier_resolution_order() {
        assert_eq!(identifier_kind("a@x.com", "pedek"), IdentifierKind::Email);
        assert_eq!(
            identifier_kind("pedek1712000000000123", "pedek"),
            IdentifierKind::ExternalId
        );
        assert_eq!(identifier_kind("jdoe", "pedek"), IdentifierKind::Username);
        // '@' wins even when the prefix also matches.
        assert_eq!(identifier_kind("pedek@x.com", "pedek"), IdentifierKind::Email);
    }

    #[test]
    fn generated_user_id_carries_prefix_and_digits() {
        let id = generate_user_id("pedek");
        assert!(id.starts_with("pedek"));
        let rest = &id["pedek".len()..];
        assert!(rest.len() >= 13);
        assert!(rest.bytes().all(|b| b.is_ascii_digit()));
    }
}
