// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Input rules applied to records before they are stored, locally or on the server.

use thiserror::Error;

use crate::Amount;

pub const MIN_REASON_LEN: usize = 2;
pub const MIN_PERSON_NAME_LEN: usize = 2;
pub const MIN_ACCOUNT_NAME_LEN: usize = 2;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a positive amount.")]
    NonPositiveAmount,
    #[error("{field} must be at least {min} characters.")]
    TooShort { field: &'static str, min: usize },
    #[error("Please select a category.")]
    MissingCategory,
    #[error("Amount cannot exceed remaining balance of {remaining}")]
    ExceedsRemaining { remaining: Amount },
    #[error("An account with this name already exists.")]
    DuplicateAccount,
    #[error("All fields are required")]
    MissingFields,
    #[error("Username and password are required")]
    MissingCredentials,
    #[error("Password must be at least 6 characters long")]
    PasswordTooShort,
    #[error("Invalid month {0}")]
    InvalidMonth(u32),
}

pub(crate) fn positive_amount(amount: Amount) -> Result<(), ValidationError> {
    if amount > Amount::ZERO {
        Ok(())
    } else {
        Err(ValidationError::NonPositiveAmount)
    }
}

pub(crate) fn min_len(field: &'static str, value: &str, min: usize) -> Result<(), ValidationError> {
    if value.trim().chars().count() >= min {
        Ok(())
    } else {
        Err(ValidationError::TooShort { field, min })
    }
}
