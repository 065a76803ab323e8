//! crates/researchmate_core/src/auth.rs
//!
//! The auth orchestrator: composes the session store and the gateway into
//! bootstrap/login/register/logout and publishes the current identity.

use crate::domain::{Credential, UserIdentity};
use crate::error::{ClientError, ClientResult};
use crate::gateway::ApiClient;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

//=========================================================================================
// Published State
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Initial state until the stored credential (if any) has been checked. Never re-entered.
    Bootstrapping,
    Anonymous,
    Authenticating,
    Authenticated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub state: AuthState,
    pub user: Option<UserIdentity>,
}

//=========================================================================================
// The Orchestrator
//=========================================================================================

pub struct AuthOrchestrator {
    client: Arc<ApiClient>,
    snapshot: watch::Sender<AuthSnapshot>,
}

impl AuthOrchestrator {
    pub fn new(client: Arc<ApiClient>) -> Self {
        let (snapshot, _) = watch::channel(AuthSnapshot {
            state: AuthState::Bootstrapping,
            user: None,
        });
        Self { client, snapshot }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.snapshot.borrow().state
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.snapshot.borrow().user.clone()
    }

    /// An identity is loaded AND a credential is stored. A credential alone does not count,
    /// and neither does an identity that outlived its credential.
    pub fn is_authenticated(&self) -> bool {
        self.snapshot.borrow().user.is_some() && self.client.session().has()
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.state(),
            AuthState::Bootstrapping | AuthState::Authenticating
        )
    }

    fn publish(&self, state: AuthState, user: Option<UserIdentity>) {
        self.snapshot.send_replace(AuthSnapshot { state, user });
    }

    /// Resolves the initial state from the stored credential. Calling it again after it
    /// resolved is a no-op.
    pub async fn bootstrap(&self) -> AuthState {
        if self.state() != AuthState::Bootstrapping {
            return self.state();
        }

        let session = self.client.session();
        if !session.has() {
            self.settle_bootstrap(AuthState::Anonymous, None);
            return self.state();
        }

        match self.client.current_user().await {
            Ok(user) => {
                info!(username = %user.username, "Restored previous session.");
                self.settle_bootstrap(AuthState::Authenticated, Some(user));
            }
            Err(e) => {
                warn!("Stored credential rejected during bootstrap: {}", e);
                self.settle_bootstrap(AuthState::Anonymous, None);
            }
        }
        self.state()
    }

    // A login/logout that raced ahead of the bootstrap wins; the bootstrap result is dropped.
    fn settle_bootstrap(&self, state: AuthState, user: Option<UserIdentity>) {
        let session = self.client.session().clone();
        self.snapshot.send_if_modified(move |snapshot| {
            if snapshot.state != AuthState::Bootstrapping {
                return false;
            }
            if user.is_none() {
                session.clear();
            }
            *snapshot = AuthSnapshot { state, user };
            true
        });
    }

    pub async fn login(&self, username: &str, password: &str) -> ClientResult<UserIdentity> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ClientError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let session = self.client.session();
        session.clear();
        self.publish(AuthState::Authenticating, None);
        info!(username = %username, "Signing in");

        let result = async {
            let token = self.client.login(username, password).await?;
            session.set(Credential::new(token.access_token));
            self.client.current_user().await
        }
        .await;

        match result {
            Ok(user) => {
                info!(username = %user.username, "Signed in.");
                self.publish(AuthState::Authenticated, Some(user.clone()));
                Ok(user)
            }
            Err(e) => {
                warn!(username = %username, "Sign-in failed: {}", e);
                session.clear();
                self.publish(AuthState::Anonymous, None);
                Err(e)
            }
        }
    }

    /// Creates the account, then signs in with the same credentials.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> ClientResult<UserIdentity> {
        if email.trim().is_empty() || username.trim().is_empty() || password.is_empty() {
            return Err(ClientError::Validation(
                "Email, username and password are required".to_string(),
            ));
        }
        let full_name = full_name.map(str::trim).filter(|name| !name.is_empty());

        self.client.session().clear();
        self.publish(AuthState::Authenticating, None);
        info!(username = %username, "Registering account");

        if let Err(e) = self.client.register(email, username, password, full_name).await {
            warn!(username = %username, "Registration failed: {}", e);
            self.publish(AuthState::Anonymous, None);
            return Err(e);
        }

        self.login(username, password)
            .await
            .map_err(|e| ClientError::LoginAfterRegister(Box::new(e)))
    }

    /// Drops the credential and identity immediately. Does not contact the backend.
    pub fn logout(&self) {
        self.client.session().clear();
        self.publish(AuthState::Anonymous, None);
        info!("Signed out.");
    }
}

//=========================================================================================
// Form-layer Messages
//=========================================================================================

/// Turns an auth failure into the text shown next to the login/registration form.
pub fn auth_error_message(err: &ClientError) -> String {
    let message = err.to_string();
    let invalid_credentials = message.contains("Invalid credentials")
        || message.contains("Incorrect username or password")
        || matches!(err, ClientError::Http { status: 401, .. });

    if invalid_credentials {
        "Incorrect username or password. Please try again.".to_string()
    } else if message.contains("already exists")
        || message.contains("already registered")
        || message.contains("already taken")
    {
        "This email is already registered. Please sign in instead.".to_string()
    } else {
        message
    }
}
