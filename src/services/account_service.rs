use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::auth::password::{self, PasswordError};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{Organization, Permission, Role, User};

/// A user together with everything authorization needs
#[derive(Debug, Clone)]
pub struct Account {
    pub user: User,
    pub organization: Organization,
    pub role: Option<Role>,
    pub permissions: Vec<String>,
}

impl Account {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Database manager error: {0}")]
    DatabaseManager(#[from] DatabaseError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("Email already registered")]
    EmailTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Account is not active")]
    Inactive,
    #[error("User not found")]
    NotFound,
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub organization_name: String,
    pub organization_location: String,
    pub organization_bio: String,
    pub organization_photo: Option<String>,
    pub user_name: String,
    pub email: String,
    pub password: String,
}

/// Fields for a new member of an existing organization
#[derive(Debug, Clone, Default)]
pub struct NewMember {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: Option<Uuid>,
    pub department: Option<String>,
    pub branch: Option<String>,
}

pub const ADMIN_ROLE_NAME: &str = "Admin";

pub struct AccountService {
    pool: PgPool,
}

impl AccountService {
    pub async fn new() -> Result<Self, AccountError> {
        let pool = DatabaseManager::main_pool().await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Load a user with organization, role and permission names
    pub async fn load_account(&self, user_id: Uuid) -> Result<Option<Account>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        Self::load_account_with(&mut conn, user_id).await
    }

    pub async fn load_account_with(conn: &mut PgConnection, user_id: Uuid) -> Result<Option<Account>, AccountError> {
        let Some(user) = User::find_by_id(&mut *conn, user_id).await? else {
            return Ok(None);
        };
        let organization = Organization::find_by_id(&mut *conn, user.org_id)
            .await?
            .ok_or(AccountError::NotFound)?;

        let (role, permissions) = match user.role_id {
            Some(role_id) => {
                let role = Role::find_in_org(&mut *conn, user.org_id, role_id).await?;
                let permissions = Permission::for_role(&mut *conn, role_id)
                    .await?
                    .into_iter()
                    .map(|p| p.permission_name)
                    .collect();
                (role, permissions)
            }
            None => (None, vec![]),
        };

        Ok(Some(Account { user, organization, role, permissions }))
    }

    /// Create an organization, its Admin role holding every permission, and its first user
    pub async fn signup(&self, input: SignupInput) -> Result<Account, AccountError> {
        let mut tx = self.pool.begin().await?;

        if User::email_exists(&mut *tx, &input.email).await? {
            return Err(AccountError::EmailTaken);
        }
        let password_hash = password::hash_password(&input.password)?;

        let organization = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (org_name, org_location, org_picture, bio)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&input.organization_name)
        .bind(&input.organization_location)
        .bind(&input.organization_photo)
        .bind(&input.organization_bio)
        .fetch_one(&mut *tx)
        .await?;

        let role = sqlx::query_as::<_, Role>(
            "INSERT INTO roles (org_id, role_name, description) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(organization.org_id)
        .bind(ADMIN_ROLE_NAME)
        .bind("Organization administrator")
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id) SELECT $1, permission_id FROM permissions",
        )
        .bind(role.role_id)
        .execute(&mut *tx)
        .await?;

        let user = Self::insert_member(
            &mut tx,
            organization.org_id,
            NewMember {
                full_name: input.user_name.clone(),
                email: input.email.clone(),
                password_hash,
                role_id: Some(role.role_id),
                department: None,
                branch: None,
            },
        )
        .await?;

        let permissions = Permission::for_role(&mut *tx, role.role_id)
            .await?
            .into_iter()
            .map(|p| p.permission_name)
            .collect();

        tx.commit().await?;

        tracing::info!("Organization {} created by {}", organization.org_id, user.user_id);
        Ok(Account { user, organization, role: Some(role), permissions })
    }

    /// Check credentials and return the account
    pub async fn signin(&self, email: &str, password: &str) -> Result<Account, AccountError> {
        let user = User::find_by_email(&self.pool, email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !password::verify_password(password, &user.password) {
            return Err(AccountError::InvalidCredentials);
        }
        if !user.is_active() {
            return Err(AccountError::Inactive);
        }

        self.load_account(user.user_id).await?.ok_or(AccountError::NotFound)
    }

    /// Insert an active user and its profile row
    pub async fn insert_member(conn: &mut PgConnection, org_id: Uuid, member: NewMember) -> Result<User, AccountError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (org_id, role_id, full_name, email, password, status, department, branch)
            VALUES ($1, $2, $3, $4, $5, 'active', $6, $7)
            RETURNING *
            "#,
        )
        .bind(org_id)
        .bind(member.role_id)
        .bind(&member.full_name)
        .bind(&member.email)
        .bind(&member.password_hash)
        .bind(&member.department)
        .bind(&member.branch)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query("INSERT INTO profile_info (user_id, user_name, email) VALUES ($1, $2, $3)")
            .bind(user.user_id)
            .bind(&user.full_name)
            .bind(&user.email)
            .execute(&mut *conn)
            .await?;

        Ok(user)
    }
}
