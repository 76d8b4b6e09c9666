use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::password::PasswordHasher;
use crate::models::{
    validate_role, LoginResponse, LoginUserRequest, MessageResponse, RegisterUserRequest,
    RepositoryError, ServiceError, ServiceResult, User, Validate,
};
use crate::repositories::UserRepository;

/// Service for registration and login
pub struct AuthService {
    user_repository: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(user_repository: Arc<dyn UserRepository>, hasher: PasswordHasher) -> Self {
        Self {
            user_repository,
            hasher,
        }
    }

    /// Register a new buyer or seller
    #[instrument(skip(self, request), fields(username = %request.username, role = %request.role))]
    pub async fn register_user(&self, request: RegisterUserRequest) -> ServiceResult<MessageResponse> {
        info!("Registering user");

        request.validate()?;
        let role = validate_role(&request.role)?;
        let username = request.username.trim().to_string();

        let password_hash = self.hasher.hash_blocking(&request.password).await?;
        let user = User::new(username.clone(), password_hash, role);

        match self.user_repository.create(user).await {
            Ok(_) => {}
            Err(RepositoryError::ConstraintViolation { .. }) => {
                warn!("Username already taken");
                return Err(ServiceError::UserAlreadyExists { username });
            }
            Err(e) => return Err(e.into()),
        }

        info!("User registered");
        Ok(MessageResponse::new(format!(
            "User '{}' registered as '{}'.",
            username, role
        )))
    }

    /// Verify credentials and report the user's role
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login_user(&self, request: LoginUserRequest) -> ServiceResult<LoginResponse> {
        // Blank credentials can never match a stored user
        if request.validate().is_err() {
            return Err(ServiceError::InvalidCredentials);
        }

        let username = request.username.trim();

        let user = match self.user_repository.find_by_username(username).await? {
            Some(user) => user,
            None => {
                self.hasher.verify_dummy_blocking(&request.password).await?;
                warn!("Login for unknown user");
                return Err(ServiceError::InvalidCredentials);
            }
        };

        if !self
            .hasher
            .verify_blocking(&request.password, &user.password_hash)
            .await?
        {
            warn!("Login with wrong password");
            return Err(ServiceError::InvalidCredentials);
        }

        info!("Login successful");
        Ok(LoginResponse {
            message: format!("Login successful. You are logged in as '{}'.", user.role),
            role: user.role,
        })
    }
}
