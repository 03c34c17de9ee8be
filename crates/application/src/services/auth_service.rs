//! Authentication service
//!
//! OTP-gated login and registration. The flow: validate the number through
//! the provider lookup, start an SMS verification, hold the pending state in
//! the session, then check the user-entered code and bind the user to the
//! session.

use std::fmt;
use std::sync::Arc;

use domain::{EmailAddress, OtpCode, PhoneNumber, User};
use tracing::{info, instrument};

use crate::error::ApplicationError;
use crate::ports::{OtpVerifyPort, PendingVerification, Session, SessionStore, UserStore};

/// Service for phone-number authentication
pub struct AuthService {
    verify: Arc<dyn OtpVerifyPort>,
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService").finish_non_exhaustive()
    }
}

impl AuthService {
    /// Create a new auth service
    pub fn new(
        verify: Arc<dyn OtpVerifyPort>,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            verify,
            users,
            sessions,
        }
    }

    /// Start a login verification for a phone number
    ///
    /// The pending state is recorded in the session; the user proceeds to
    /// the verify form.
    #[instrument(skip(self, session), fields(phone = %phone))]
    pub async fn begin_login(
        &self,
        session: &mut Session,
        phone: PhoneNumber,
    ) -> Result<(), ApplicationError> {
        self.ensure_deliverable(&phone).await?;
        self.verify.start_verification(&phone).await?;

        session.pending = Some(PendingVerification::Login { phone });
        self.sessions.save(session).await?;

        Ok(())
    }

    /// Start a registration verification with profile details
    #[instrument(skip(self, session, name, email), fields(phone = %phone))]
    pub async fn begin_registration(
        &self,
        session: &mut Session,
        phone: PhoneNumber,
        name: String,
        email: Option<EmailAddress>,
    ) -> Result<(), ApplicationError> {
        self.ensure_deliverable(&phone).await?;
        self.verify.start_verification(&phone).await?;

        session.pending = Some(PendingVerification::Registration { phone, name, email });
        self.sessions.save(session).await?;

        Ok(())
    }

    /// Check the user-entered OTP and log the user in
    ///
    /// On success the session is bound to the user and the pending state is
    /// cleared. On a rejected code the pending state is kept so the user
    /// can retry.
    #[instrument(skip(self, session, code))]
    pub async fn complete_verification(
        &self,
        session: &mut Session,
        code: &OtpCode,
    ) -> Result<User, ApplicationError> {
        let Some(pending) = session.pending.clone() else {
            return Err(ApplicationError::NotAuthorized(
                "Phone number not found. Please request a new OTP.".to_string(),
            ));
        };

        let approved = self
            .verify
            .check_verification(pending.phone(), code)
            .await?;
        if !approved {
            return Err(ApplicationError::NotAuthorized("Invalid OTP".to_string()));
        }

        let user = match pending {
            PendingVerification::Login { phone } => self.users.get_or_create(&phone).await?,
            PendingVerification::Registration { phone, name, email } => {
                match self.users.find_by_phone(&phone).await? {
                    Some(existing) => existing,
                    None => {
                        let user = User::with_details(phone, name, email);
                        self.users.save(&user).await?;
                        user
                    },
                }
            },
        };

        info!(user_id = %user.id(), "User verified and logged in");

        session.user_id = Some(user.id());
        session.pending = None;
        self.sessions.save(session).await?;

        Ok(user)
    }

    /// Destroy a session
    #[instrument(skip(self))]
    pub async fn logout(&self, session_id: &str) -> Result<(), ApplicationError> {
        self.sessions.delete(session_id).await?;
        Ok(())
    }

    async fn ensure_deliverable(&self, phone: &PhoneNumber) -> Result<(), ApplicationError> {
        if self.verify.lookup(phone).await? {
            Ok(())
        } else {
            Err(ApplicationError::Domain(
                domain::DomainError::InvalidPhoneNumber(phone.to_string()),
            ))
        }
    }
}
