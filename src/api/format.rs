//! JSON shapes shared by the auth, verify and invitation responses.

use serde_json::{json, Map, Value};

use crate::database::models::Organization;
use crate::services::Account;

/// `{permissionName: true}` for every permission the role grants
pub fn permission_map(permissions: &[String]) -> Value {
    let map: Map<String, Value> = permissions
        .iter()
        .map(|p| (p.clone(), Value::Bool(true)))
        .collect();
    Value::Object(map)
}

pub fn user_json(account: &Account) -> Value {
    let user = &account.user;
    let role = account.role.as_ref().map(|role| {
        json!({
            "id": role.role_id,
            "name": role.role_name,
            "permissions": permission_map(&account.permissions),
        })
    });

    json!({
        "id": user.user_id,
        "name": user.full_name,
        "email": user.email,
        "role": role,
        "status": user.status,
        "department": user.department,
        "branch": user.branch,
        "createdAt": user.created_at,
        "userPic": user.user_pic,
    })
}

pub fn organization_json(organization: &Organization) -> Value {
    json!({
        "id": organization.org_id,
        "name": organization.org_name,
        "location": organization.org_location,
        "picture": organization.org_picture,
        "bio": organization.bio,
        "createdAt": organization.created_at,
    })
}

/// `{user, organization}` for an authenticated account
pub fn account_json(account: &Account) -> Value {
    json!({
        "user": user_json(account),
        "organization": organization_json(&account.organization),
    })
}
