use crate::{
    auth::{
        AccessTokenResponse, AuthService, LoginRequest, LoginResponse, RefreshTokenRequest,
        RegisterRequest, UserResponse,
    },
    db::DbPool,
    entities::user::{self, Entity as UserEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, SqlErr};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Service for registration, credential verification and session tokens.
///
/// The refresh token lives on the user row: login stores it, refresh checks
/// the presented token against it, logout clears it.
#[derive(Clone)]
pub struct AccountService {
    db_pool: Arc<DbPool>,
    auth: Arc<AuthService>,
    event_sender: Option<Arc<EventSender>>,
}

impl AccountService {
    pub fn new(
        db_pool: Arc<DbPool>,
        auth: Arc<AuthService>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            auth,
            event_sender,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send domain event");
            }
        }
    }

    /// Creates an account with an Argon2-hashed credential.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> Result<UserResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let existing = UserEntity::find()
            .filter(user::Column::Username.eq(request.username.as_str()))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to check for existing username");
                ServiceError::DatabaseError(e)
            })?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Username already taken".to_string(),
            ));
        }

        let password_hash = self.auth.hash_password(&request.password)?;
        let now = Utc::now();

        let insert = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(request.username.clone()),
            password_hash: Set(password_hash),
            date_of_birth: Set(request.date_of_birth),
            address: Set(request.address.clone()),
            refresh_token: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(db)
        .await;
        let model = match insert {
            Ok(model) => model,
            // Concurrent registration of the same name hits the unique column.
            Err(e) => {
                return match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => Err(ServiceError::Conflict(
                        "Username already taken".to_string(),
                    )),
                    _ => {
                        error!(error = %e, "Failed to insert user");
                        Err(ServiceError::DatabaseError(e))
                    }
                };
            }
        };

        info!(user_id = %model.id, "User registered");
        self.emit(Event::UserRegistered(model.id)).await;
        Ok(model.into())
    }

    /// Verifies a credential and issues an access/refresh token pair. The
    /// refresh token is persisted on the user row.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let user = UserEntity::find()
            .filter(user::Column::Username.eq(request.username.as_str()))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch user for login");
                ServiceError::DatabaseError(e)
            })?;
        // Unknown user and bad password are indistinguishable to the caller.
        let Some(user) = user else {
            return Err(ServiceError::AuthError("Invalid credentials".to_string()));
        };
        if !self.auth.verify_password(&request.password, &user.password_hash)? {
            return Err(ServiceError::AuthError("Invalid credentials".to_string()));
        }

        let tokens = self.auth.generate_token_pair(&user)?;

        let mut active: user::ActiveModel = user.into();
        active.refresh_token = Set(Some(tokens.refresh_token.clone()));
        active.updated_at = Set(Some(Utc::now()));
        let user = active.update(db).await.map_err(|e| {
            error!(error = %e, "Failed to store refresh token");
            ServiceError::DatabaseError(e)
        })?;

        info!(user_id = %user.id, "User logged in");
        self.emit(Event::UserLoggedIn(user.id)).await;

        Ok(LoginResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user: user.into(),
        })
    }

    /// Exchanges a stored refresh token for a fresh access token.
    ///
    /// The presented token must verify against the refresh secret *and*
    /// match the one on the user row; the refresh token itself is not
    /// rotated.
    #[instrument(skip(self, request))]
    pub async fn refresh(
        &self,
        request: RefreshTokenRequest,
    ) -> Result<AccessTokenResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let claims = self
            .auth
            .validate_refresh_token(&request.refresh_token)
            .map_err(|_| ServiceError::Forbidden("Invalid refresh token".to_string()))?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Forbidden("Invalid refresh token".to_string()))?;

        let db = &*self.db_pool;
        let user = UserEntity::find_by_id(user_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch user for refresh");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::Forbidden("Invalid refresh token".to_string()))?;

        if user.refresh_token.as_deref() != Some(request.refresh_token.as_str()) {
            warn!(user_id = %user.id, "Presented refresh token does not match the stored one");
            return Err(ServiceError::Forbidden("Invalid refresh token".to_string()));
        }

        let access_token = self.auth.generate_access_token(&user)?;
        info!(user_id = %user.id, "Access token refreshed");
        Ok(AccessTokenResponse { access_token })
    }

    /// Clears the stored refresh token; succeeds even when none was stored.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn logout(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let user = UserEntity::find_by_id(user_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch user for logout");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let mut active: user::ActiveModel = user.into();
        active.refresh_token = Set(None);
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await.map_err(|e| {
            error!(error = %e, "Failed to clear refresh token");
            ServiceError::DatabaseError(e)
        })?;

        info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// The caller's profile; the credential hash never leaves the service.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn profile(&self, user_id: Uuid) -> Result<UserResponse, ServiceError> {
        let db = &*self.db_pool;
        let user = UserEntity::find_by_id(user_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch user profile");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
        Ok(user.into())
    }
}
