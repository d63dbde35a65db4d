//! Interactive login / 2FA flow. Delegates to the auth adapter.
//!
//! Prompts run on the terminal; once the session file is authorized this
//! becomes a no-op on subsequent starts. A mistyped code is retried in
//! place instead of aborting the whole flow.

use crate::domain::{DomainError, SignInResult};
use crate::ports::AuthPort;
use std::sync::Arc;
use tracing::{info, warn};

/// Wrong-code retries before the flow gives up.
const CODE_ATTEMPTS: u32 = 3;

pub struct AuthService {
    auth: Arc<dyn AuthPort>,
    api_hash: String,
}

impl AuthService {
    pub fn new(auth: Arc<dyn AuthPort>, api_hash: String) -> Self {
        Self { auth, api_hash }
    }

    /// Run the full flow (phone -> code -> 2FA if needed), skipping it
    /// entirely when the session is already authorized.
    pub async fn run_auth_flow(&self) -> Result<(), DomainError> {
        if self.auth.is_authenticated().await? {
            info!("session already authorized");
            return Ok(());
        }

        let phone = inquire::Text::new("Phone number (international format):")
            .prompt()
            .map_err(|e| DomainError::Auth(format!("phone prompt: {}", e)))?;
        self.auth
            .request_login_code(phone.trim(), &self.api_hash)
            .await?;

        let mut attempts = CODE_ATTEMPTS;
        loop {
            let code = inquire::Text::new("Login code:")
                .prompt()
                .map_err(|e| DomainError::Auth(format!("code prompt: {}", e)))?;

            match self.auth.sign_in(code.trim()).await? {
                SignInResult::Success => {
                    info!("signed in");
                    return Ok(());
                }
                SignInResult::CodeRejected => {
                    attempts -= 1;
                    if attempts == 0 {
                        return Err(DomainError::Auth(
                            "too many rejected login codes".into(),
                        ));
                    }
                    warn!(remaining = attempts, "wrong login code, try again");
                }
                SignInResult::PasswordRequired { hint } => {
                    let label = match hint {
                        Some(h) => format!("2FA password (hint: {}):", h),
                        None => "2FA password:".to_string(),
                    };
                    let password = inquire::Password::new(&label)
                        .without_confirmation()
                        .prompt()
                        .map_err(|e| DomainError::Auth(format!("password prompt: {}", e)))?;
                    self.auth.check_password(password.as_bytes()).await?;
                    info!("signed in with 2FA");
                    return Ok(());
                }
            }
        }
    }
}
