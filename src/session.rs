// 🔑 Session - login / account creation / logout
// Authentication is a plaintext equality check against the stored account.

use crate::error::{AttendanceError, Result};
use crate::model::Staff;
use crate::store::{Event, Store};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// No account existed for the code; one was created
    Created(Staff),
    /// Existing account, password matched
    LoggedIn(Staff),
}

impl LoginOutcome {
    pub fn staff(&self) -> &Staff {
        match self {
            LoginOutcome::Created(staff) | LoginOutcome::LoggedIn(staff) => staff,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LoginOutcome::Created(_) => "Account created successfully!",
            LoginOutcome::LoggedIn(_) => "Login successful!",
        }
    }
}

/// Log in as `code`, creating the account on first use
pub fn login(store: &Store, code: &str, password: &str) -> Result<LoginOutcome> {
    let code = code.trim();
    if code.is_empty() || password.trim().is_empty() {
        return Err(AttendanceError::MissingCredentials);
    }

    let outcome = match store.get_staff_by_code(code)? {
        Some(staff) => {
            if staff.password != password {
                tracing::warn!(staff = code, "login rejected: invalid password");
                return Err(AttendanceError::InvalidPassword);
            }
            LoginOutcome::LoggedIn(staff)
        }
        None => {
            let staff = Staff::new(code, password);
            store.save_staff(&staff)?;
            tracing::info!(staff = code, "staff account created");
            LoginOutcome::Created(staff)
        }
    };

    store.set_current_user(outcome.staff())?;
    let event_type = match outcome {
        LoginOutcome::Created(_) => "account_created",
        LoginOutcome::LoggedIn(_) => "logged_in",
    };
    store.record_event(&Event::new(event_type, code, serde_json::json!({})))?;

    Ok(outcome)
}

/// Clear the session. Returns the staff member who was logged in, if any.
pub fn logout(store: &Store) -> Result<Option<Staff>> {
    let current = store.get_current_user()?;
    store.clear_current_user()?;
    if let Some(staff) = &current {
        store.record_event(&Event::new("logged_out", &staff.code, serde_json::json!({})))?;
    }
    Ok(current)
}

/// The logged-in staff member, or `NotLoggedIn`
pub fn require_user(store: &Store) -> Result<Staff> {
    store
        .get_current_user()?
        .ok_or(AttendanceError::NotLoggedIn)
}
