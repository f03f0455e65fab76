//! User service
//!
//! Registration of Telegram users, their profile and contact details.

use crate::db::repositories::{PaymentRepository, UserRepository};
use crate::models::{ContactInput, CreateUserInput, TelegramUser, UserContact, UserProfile};
use crate::services::text::{is_valid_email, normalize_phone};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    payments: Arc<dyn PaymentRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, payments: Arc<dyn PaymentRepository>) -> Self {
        Self { users, payments }
    }

    /// Register a user the bot has just met.
    ///
    /// # Errors
    /// - `ValidationError` if the name is blank
    /// - `Conflict` if the Telegram id is already registered
    pub async fn register(&self, input: CreateUserInput) -> Result<TelegramUser, UserServiceError> {
        let tg_name = input.tg_name.trim();
        if tg_name.is_empty() {
            return Err(UserServiceError::ValidationError("tg_name cannot be empty".to_string()));
        }

        if self
            .users
            .get_by_tg_id(input.tg_id)
            .await
            .context("Failed to check Telegram id")?
            .is_some()
        {
            return Err(UserServiceError::Conflict(format!(
                "Telegram id {} is already registered",
                input.tg_id
            )));
        }

        let mut user = TelegramUser::new(tg_name.to_string(), input.tg_id);
        if let Some(role) = input.role {
            user.role = role;
        }
        let user = self.users.create(&user).await.context("Failed to create user")?;

        tracing::info!(
            user_id = user.user_id,
            tg_id = user.tg_id,
            role = %user.role,
            "User registered"
        );
        Ok(user)
    }

    pub async fn get_by_tg_id(&self, tg_id: i64) -> Result<TelegramUser, UserServiceError> {
        self.users
            .get_by_tg_id(tg_id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| UserServiceError::NotFound(format!("User with Telegram id {}", tg_id)))
    }

    pub async fn get_by_id(&self, user_id: i64) -> Result<TelegramUser, UserServiceError> {
        self.users
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| UserServiceError::NotFound(format!("User {}", user_id)))
    }

    /// User with contact details and payment history
    pub async fn profile(&self, tg_id: i64) -> Result<UserProfile, UserServiceError> {
        let user = self.get_by_tg_id(tg_id).await?;
        let contact = self
            .users
            .get_contact(user.user_id)
            .await
            .context("Failed to get contact")?;
        let payments = self
            .payments
            .list_by_user(user.user_id)
            .await
            .context("Failed to list payments")?;
        Ok(UserProfile {
            user,
            contact,
            payments,
        })
    }

    /// The admin who reviews practices
    pub async fn first_admin(&self) -> Result<TelegramUser, UserServiceError> {
        self.users
            .first_admin()
            .await
            .context("Failed to find admin")?
            .ok_or_else(|| UserServiceError::NotFound("No admin registered".to_string()))
    }

    /// Create or replace a user's contact details.
    ///
    /// The phone number is stored in E.164 form; blank optional fields are
    /// stored as absent.
    pub async fn save_contact(&self, input: ContactInput) -> Result<UserContact, UserServiceError> {
        let phonenumber = normalize_phone(&input.phonenumber).ok_or_else(|| {
            UserServiceError::ValidationError(format!(
                "Invalid phone number: {}",
                input.phonenumber
            ))
        })?;

        let email = non_blank(input.email);
        if let Some(email) = &email {
            if !is_valid_email(email) {
                return Err(UserServiceError::ValidationError(format!("Invalid email: {}", email)));
            }
        }

        let user = self.get_by_id(input.user_id).await?;
        let contact = UserContact {
            user_id: user.user_id,
            firstname: non_blank(input.firstname),
            secondname: non_blank(input.secondname),
            email,
            city: non_blank(input.city),
            phonenumber,
        };
        let contact = self
            .users
            .upsert_contact(&contact)
            .await
            .context("Failed to save contact")?;

        tracing::info!(user_id = contact.user_id, "Contact saved");
        Ok(contact)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxPaymentRepository, SqlxUserRepository};
    use crate::models::UserRole;
    use crate::services::test_support::empty_pool;

    async fn setup() -> (UserService, Arc<dyn UserRepository>) {
        let pool = empty_pool().await;
        let users = SqlxUserRepository::boxed(pool.clone());
        let service = UserService::new(users.clone(), SqlxPaymentRepository::boxed(pool));
        (service, users)
    }

    fn input(name: &str, tg_id: i64) -> CreateUserInput {
        CreateUserInput {
            tg_name: name.to_string(),
            tg_id,
            role: None,
        }
    }

    fn contact(user_id: i64, phone: &str, email: Option<&str>) -> ContactInput {
        ContactInput {
            user_id,
            firstname: Some(" Anna ".to_string()),
            secondname: Some(String::new()),
            email: email.map(str::to_string),
            city: None,
            phonenumber: phone.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let (service, _) = setup().await;
        let user = service.register(input(" anna ", 100)).await.unwrap();
        assert_eq!(user.tg_name, "anna");
        assert_eq!(user.role, UserRole::User);

        let found = service.get_by_tg_id(100).await.unwrap();
        assert_eq!(found.user_id, user.user_id);
        assert!(matches!(service.get_by_tg_id(101).await, Err(UserServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_blank_names() {
        let (service, _) = setup().await;
        service.register(input("anna", 100)).await.unwrap();

        assert!(matches!(
            service.register(input("other", 100)).await,
            Err(UserServiceError::Conflict(_))
        ));
        assert!(matches!(
            service.register(input("  ", 200)).await,
            Err(UserServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_first_admin() {
        let (service, _) = setup().await;
        assert!(matches!(service.first_admin().await, Err(UserServiceError::NotFound(_))));

        service.register(input("learner", 1)).await.unwrap();
        let admin = service
            .register(CreateUserInput {
                role: Some(UserRole::Admin),
                ..input("teacher", 2)
            })
            .await
            .unwrap();
        assert_eq!(service.first_admin().await.unwrap().user_id, admin.user_id);
    }

    #[tokio::test]
    async fn test_save_contact_normalizes() {
        let (service, _) = setup().await;
        let user = service.register(input("anna", 100)).await.unwrap();

        let saved = service
            .save_contact(contact(user.user_id, "8 (900) 123-45-67", Some("anna@example.com")))
            .await
            .unwrap();
        assert_eq!(saved.phonenumber, "+79001234567");
        assert_eq!(saved.firstname.as_deref(), Some("Anna"));
        assert_eq!(saved.secondname, None);

        let profile = service.profile(100).await.unwrap();
        assert_eq!(profile.contact, Some(saved));
        assert!(profile.payments.is_empty());
    }

    #[tokio::test]
    async fn test_save_contact_validation() {
        let (service, _) = setup().await;
        let user = service.register(input("anna", 100)).await.unwrap();

        assert!(matches!(
            service.save_contact(contact(user.user_id, "12", None)).await,
            Err(UserServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service
                .save_contact(contact(user.user_id, "89001234567", Some("not-an-email")))
                .await,
            Err(UserServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.save_contact(contact(9999, "89001234567", None)).await,
            Err(UserServiceError::NotFound(_))
        ));
    }
}
