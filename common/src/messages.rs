// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Request and response bodies of the REST API that are not records.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    records::User,
    summary::{DebtSummary, TransactionSummary},
    validation::{MIN_PASSWORD_LEN, ValidationError},
};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "user";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub mobile: String,
    pub password: Zeroizing<String>,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.username.as_str(),
            self.mobile.as_str(),
        ];
        if fields.iter().any(|f| f.trim().is_empty()) || self.password.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: Zeroizing<String>,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(ValidationError::MissingCredentials);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

/// Body of every error answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub transactions: TransactionSummary,
    pub debts: DebtSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyReportQuery {
    pub year: i32,
    pub month: u32,
}
