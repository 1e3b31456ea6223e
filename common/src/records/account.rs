// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};

use crate::{
    identifiers::{AccountId, Identifier},
    validation::{self, MIN_ACCOUNT_NAME_LEN, ValidationError},
};

/// A named place where money is kept, e.g. a wallet or a bank account.
///
/// Accounts only exist on the client and are not synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
}

impl Account {
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let account = Self {
            id: AccountId::random(),
            name: name.into().trim().to_owned(),
        };
        account.validate()?;
        Ok(account)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::min_len("Account name", &self.name, MIN_ACCOUNT_NAME_LEN)
    }
}
