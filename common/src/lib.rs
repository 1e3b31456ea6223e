// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Types and logic shared between the server and the client.

pub mod identifiers;
pub mod messages;
pub mod records;
pub mod report;
pub mod summary;
pub mod sync;
pub mod validation;

/// Money amounts are decimals to avoid float rounding in sums.
pub type Amount = rust_decimal::Decimal;

/// Asserts that an expression matches a pattern.
#[macro_export]
macro_rules! assert_matches {
    ($expression:expr, $pattern:pat $(if $guard:expr)? $(,)?) => {
        match $expression {
            $pattern $(if $guard)? => {}
            ref value => panic!(
                "assertion failed: `{:?}` does not match `{}`",
                value,
                stringify!($pattern $(if $guard)?)
            ),
        }
    };
}
