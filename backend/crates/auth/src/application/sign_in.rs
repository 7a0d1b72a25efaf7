//! Sign In Use Case
//!
//! Verifies email + password and issues a credential through the
//! session authority.

use std::sync::Arc;

use platform::password::{ClearTextPassword, HashedPassword};

use crate::application::session_authority::{IssuedCredential, SessionAuthority};
use crate::domain::entity::UserAccount;
use crate::domain::repository::{SessionRepository, UserRepository};
use crate::error::{AuthError, AuthResult};

pub struct SignInInput {
    pub email: String,
    pub password: String,
}

pub struct SignInUseCase<U, S>
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    authority: Arc<SessionAuthority<S>>,
}

impl<U, S> SignInUseCase<U, S>
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, authority: Arc<SessionAuthority<S>>) -> Self {
        Self {
            user_repo,
            authority,
        }
    }

    pub async fn execute(&self, input: SignInInput) -> AuthResult<(UserAccount, IssuedCredential)> {
        let password = ClearTextPassword::new(input.password);
        let email = UserAccount::normalize_email(&input.email);

        let account = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = HashedPassword::from_phc_string(account.password_hash.clone())?;
        if !hash.verify_off_thread(password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.authority.issue(account.user_id, account.role).await?;

        tracing::info!(
            user_id = %account.user_id,
            role = %account.role,
            session_id = %issued.session.session_id,
            "User signed in"
        );

        Ok((account, issued))
    }
}
