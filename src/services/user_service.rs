// src/services/user_service.rs
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing;
use uuid::Uuid;

use crate::{
    errors::KekeError as AppError,
    models::{
        notification::{Notification, NotificationKind},
        user::{LoginRequest, LoginResponse, Role, Session, User, UserRegistration},
    },
    services::{
        messaging_service::{NotificationMessage, NotificationService},
        store_service::StoreService,
    },
    utils::id_generator::{IdGenerator, IdType, WithGeneratedId},
    ValidationError,
};

#[async_trait]
pub trait UserOperations: Send + Sync {
    async fn register_user(&self, registration: UserRegistration) -> Result<User, AppError>;
    async fn login(&self, login: LoginRequest) -> Result<LoginResponse, AppError>;
    async fn get_session(&self, token: &str) -> Result<Option<Session>, AppError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn get_notifications(&self, user_id: &str) -> Result<Vec<Notification>, AppError>;
}

pub struct UserService {
    store: Arc<StoreService>,
    notification_service: Arc<dyn NotificationService>,
}

impl UserService {
    pub fn new(store: Arc<StoreService>, notification_service: Arc<dyn NotificationService>) -> Self {
        Self {
            store,
            notification_service,
        }
    }

    fn validate_registration(registration: &UserRegistration) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if registration.name.trim().is_empty() {
            errors.push(ValidationError {
                field: "name".to_string(),
                message: "Name is required".to_string(),
            });
        }
        if !registration.email.contains('@') {
            errors.push(ValidationError {
                field: "email".to_string(),
                message: "A valid email is required".to_string(),
            });
        }
        if registration.role == Role::Driver {
            errors.push(ValidationError {
                field: "role".to_string(),
                message: "Drivers register through the driver endpoint".to_string(),
            });
        }
        if !registration.initial_balance.is_finite() || registration.initial_balance < 0.0 {
            errors.push(ValidationError {
                field: "initial_balance".to_string(),
                message: "Initial balance cannot be negative".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationFailed(errors))
        }
    }

    /// Display name for an account created on first login.
    fn name_from_email(email: &str) -> String {
        let local = email.split('@').next().unwrap_or(email);
        let mut chars = local.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => "Guest".to_string(),
        }
    }

    async fn send_welcome(&self, user: &User) {
        let message = NotificationMessage::new(
            NotificationKind::Security,
            "Welcome to Keke Napepe Ride",
            "Your account is ready. Book a keke, okada or car in seconds.",
        );
        if let Err(e) = self.notification_service.send_to_user(&user.id, message).await {
            tracing::warn!("Failed to send welcome notification to {}: {}", user.id, e);
        }
    }
}

#[async_trait]
impl UserOperations for UserService {
    async fn register_user(&self, registration: UserRegistration) -> Result<User, AppError> {
        tracing::info!("Registering {:?} user: {}", registration.role, registration.email);
        Self::validate_registration(&registration)?;

        let user = {
            let mut state = self.store.write().await;
            if state.account_by_email(&registration.email).is_some() {
                return Err(AppError::Conflict(format!(
                    "An account already exists for {}",
                    registration.email
                )));
            }

            let mut user = User::new(
                registration.name.trim().to_string(),
                registration.email.trim().to_lowercase(),
                registration.phone,
                registration.role,
            )
            .with_generated_id(IdType::User);
            user.wallet_balance = registration.initial_balance;

            state.users.insert(user.id.clone(), user.clone());
            user
        };

        self.send_welcome(&user).await;
        tracing::info!("User registered successfully: {}", user.id);
        Ok(user)
    }

    /// Role login without credentials. Unknown emails get a fresh account,
    /// except drivers, who must register their vehicle first.
    async fn login(&self, login: LoginRequest) -> Result<LoginResponse, AppError> {
        tracing::info!("Login attempt as {:?}: {}", login.role, login.email);

        let existing = self.get_user_by_email(&login.email).await?;
        let user = match existing {
            Some(user) if user.role != login.role => {
                return Err(AppError::forbidden(format!(
                    "{} is registered as {:?}, not {:?}",
                    login.email, user.role, login.role
                )));
            }
            Some(user) => user,
            None if login.role == Role::Driver => {
                return Err(AppError::driver_not_found(login.email));
            }
            None => {
                self.register_user(UserRegistration {
                    name: Self::name_from_email(&login.email),
                    email: login.email.clone(),
                    phone: String::new(),
                    role: login.role,
                    initial_balance: 0.0,
                })
                .await?
            }
        };

        let session = Session {
            token: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            role: user.role,
            created_at: Utc::now(),
        };
        self.store
            .write()
            .await
            .sessions
            .insert(session.token.clone(), session.clone());

        tracing::info!("User logged in successfully: {}", user.id);
        Ok(LoginResponse { session, user })
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        Ok(self.store.read().await.sessions.get(token).cloned())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        if !IdGenerator::validate_id(user_id, None) {
            tracing::warn!("Invalid user ID format: {}", user_id);
            return Ok(None);
        }

        tracing::debug!("Getting user: {}", user_id);
        Ok(self.store.get_user(user_id).await)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        tracing::debug!("Getting user by email: {}", email);
        Ok(self.store.read().await.account_by_email(email).cloned())
    }

    async fn get_notifications(&self, user_id: &str) -> Result<Vec<Notification>, AppError> {
        if self.store.get_user(user_id).await.is_none() {
            return Err(AppError::user_not_found(user_id));
        }
        Ok(self.store.notifications_for(user_id).await)
    }
}
