//! Implements AuthPort using the grammers Client.
//!
//! The login flow is a small state machine: requesting a code arms it, the
//! submitted code either signs in, gets rejected (recoverable, the pending
//! login stays armed), or escalates to a 2FA challenge. A phone without an
//! account is terminal: this engine never signs accounts up.

use crate::domain::{DomainError, SignInResult};
use crate::ports::AuthPort;
use async_trait::async_trait;
use grammers_client::client::{LoginToken, PasswordToken};
use grammers_client::Client;
use tokio::sync::Mutex;

enum FlowState {
    Idle,
    CodeSent(LoginToken),
    AwaitingPassword(PasswordToken),
}

pub struct GrammersAuthAdapter {
    client: Client,
    flow: Mutex<FlowState>,
}

impl GrammersAuthAdapter {
    /// Create the adapter over a client clone sharing the gateway's session.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            flow: Mutex::new(FlowState::Idle),
        }
    }
}

#[async_trait]
impl AuthPort for GrammersAuthAdapter {
    async fn is_authenticated(&self) -> Result<bool, DomainError> {
        // A failed probe means we could not reach Telegram, not that the
        // session is invalid; keep it out of the terminal Auth kind.
        self.client
            .is_authorized()
            .await
            .map_err(|e| DomainError::Network(format!("authorization probe: {}", e)))
    }

    async fn request_login_code(&self, phone: &str, api_hash: &str) -> Result<(), DomainError> {
        let token = self
            .client
            .request_login_code(phone, api_hash)
            .await
            .map_err(|e| DomainError::Auth(format!("login code request: {}", e)))?;
        *self.flow.lock().await = FlowState::CodeSent(token);
        Ok(())
    }

    async fn sign_in(&self, code: &str) -> Result<SignInResult, DomainError> {
        let state = std::mem::replace(&mut *self.flow.lock().await, FlowState::Idle);
        let FlowState::CodeSent(token) = state else {
            return Err(DomainError::Auth(
                "no login code pending; request one first".into(),
            ));
        };
        match self.client.sign_in(&token, code).await {
            Ok(_user) => Ok(SignInResult::Success),
            Err(grammers_client::SignInError::InvalidCode) => {
                // The pending login survives a wrong code; re-arm it so the
                // flow can retry without a fresh code request.
                *self.flow.lock().await = FlowState::CodeSent(token);
                Ok(SignInResult::CodeRejected)
            }
            Err(grammers_client::SignInError::PasswordRequired(pt)) => {
                let hint = pt.hint().map(String::from);
                *self.flow.lock().await = FlowState::AwaitingPassword(pt);
                Ok(SignInResult::PasswordRequired { hint })
            }
            Err(grammers_client::SignInError::SignUpRequired) => Err(DomainError::Auth(
                "no Telegram account for this phone; create one with an official app first".into(),
            )),
            Err(e) => Err(DomainError::Auth(format!("sign in: {}", e))),
        }
    }

    async fn check_password(&self, password: &[u8]) -> Result<(), DomainError> {
        let state = std::mem::replace(&mut *self.flow.lock().await, FlowState::Idle);
        let FlowState::AwaitingPassword(pt) = state else {
            return Err(DomainError::Auth(
                "no 2FA challenge pending; sign_in must ask for a password first".into(),
            ));
        };
        self.client
            .check_password(pt, password)
            .await
            .map_err(|e| DomainError::Auth(format!("2fa password: {}", e)))?;
        Ok(())
    }
}
