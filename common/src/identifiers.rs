// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{fmt, hash::Hash, str::FromStr};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// Common behaviour of all UUID based identifiers.
pub trait Identifier:
    Copy
    + Eq
    + Hash
    + Default
    + fmt::Debug
    + fmt::Display
    + FromStr<Err = uuid::Error>
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    fn from_uuid(uuid: Uuid) -> Self;

    fn uuid(&self) -> Uuid;

    fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// A nil id marks a record that was not assigned an id yet.
    fn is_nil(&self) -> bool {
        self.uuid().is_nil()
    }
}

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl Identifier for $name {
            fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

uuid_identifier!(
    /// Id of an income or expense record
    TransactionId
);
uuid_identifier!(
    /// Id of a debt or debtor record
    DebtId
);
uuid_identifier!(
    /// Id of a partial payment of a debt
    PaymentId
);
uuid_identifier!(
    /// Id of a client-local account
    AccountId
);
uuid_identifier!(UserId);
