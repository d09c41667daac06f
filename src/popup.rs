//! Popup
//!
//! The email-capture popup: shown at most once per calendar day, it
//! trades an email address for an earned discount code. The grant is
//! persisted in the shopper's profile, where the discount engine looks
//! it up at redemption time.

use jiff::civil::Date;
use thiserror::Error;

use crate::{
    mail::{Mailer, send_best_effort, welcome_message},
    storage::{CAPTURED_EMAIL_KEY, EARNED_CODE_KEY, KeyValueStore, POPUP_SEEN_KEY, StorageError},
};

/// The code granted for subscribing.
pub const EARNED_CODE: &str = "NEXTSITE10";

/// Errors related to the popup flow.
#[derive(Debug, Error)]
pub enum PopupError {
    /// The submitted address does not look like an email address.
    #[error("{0:?} is not a valid email address")]
    InvalidEmail(String),

    /// The grant could not be written to the profile store.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Whether the popup should be shown on `today`.
///
/// It is suppressed if it has already been seen today. A marker that
/// fails to parse as a date counts as not seen, so a corrupt value just
/// re-shows the popup.
#[must_use]
pub fn should_show<S: KeyValueStore>(store: &S, today: Date) -> bool {
    store
        .get(POPUP_SEEN_KEY)
        .and_then(|raw| raw.parse::<Date>().ok())
        .is_none_or(|seen| seen != today)
}

/// Record that the popup was shown on `today`.
///
/// # Errors
///
/// Returns [`StorageError`] if the marker cannot be persisted.
pub fn mark_seen<S: KeyValueStore>(store: &mut S, today: Date) -> Result<(), StorageError> {
    store.set(POPUP_SEEN_KEY, &today.to_string())
}

/// Handle a popup form submission: validate the address, persist it
/// with the granted code, and send the welcome message.
///
/// Mail delivery is best effort; a transport failure does not undo the
/// grant. Returns the granted code.
///
/// # Errors
///
/// Returns [`PopupError::InvalidEmail`] for a malformed address and
/// [`PopupError::Storage`] if the grant cannot be persisted.
pub fn subscribe<S: KeyValueStore>(
    store: &mut S,
    mailer: &mut dyn Mailer,
    email: &str,
) -> Result<&'static str, PopupError> {
    let email = email.trim();

    if !is_plausible_email(email) {
        return Err(PopupError::InvalidEmail(email.to_owned()));
    }

    store.set(CAPTURED_EMAIL_KEY, email)?;
    store.set(EARNED_CODE_KEY, EARNED_CODE)?;

    send_best_effort(mailer, &welcome_message(email, EARNED_CODE));

    Ok(EARNED_CODE)
}

/// Minimal shape check: one `@` with a dotted, non-empty domain and no
/// whitespace.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
