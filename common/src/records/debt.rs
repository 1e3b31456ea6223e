// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Amount,
    identifiers::{DebtId, Identifier, PaymentId},
    validation::{self, MIN_PERSON_NAME_LEN, MIN_REASON_LEN, ValidationError},
};

use super::{Record, ResourceKind};

/// Direction of a debt record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtKind {
    /// Somebody owes the user.
    Debtor,
    /// The user owes somebody.
    Debt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    #[default]
    Unpaid,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub amount: Amount,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A partial payment as submitted by a client.
///
/// Clients working offline pick the id themselves so that replaying the
/// payment does not record it twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    #[serde(default)]
    pub id: PaymentId,
    pub amount: Amount,
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl NewPayment {
    pub fn new(amount: Amount) -> Self {
        Self {
            id: PaymentId::random(),
            amount,
            date: Utc::now(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Checks the payment against the current state of `debt`.
    pub fn validate(&self, debt: &Debt) -> Result<(), ValidationError> {
        validation::positive_amount(self.amount)?;
        let remaining = debt.remaining();
        if self.amount > remaining {
            return Err(ValidationError::ExceedsRemaining { remaining });
        }
        Ok(())
    }

    pub fn into_payment(self) -> Payment {
        let id = if self.id.is_nil() {
            PaymentId::random()
        } else {
            self.id
        };
        Payment {
            id,
            amount: self.amount,
            date: self.date,
            reason: self.reason,
        }
    }
}

impl From<Payment> for NewPayment {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            amount: payment.amount,
            date: payment.date,
            reason: payment.reason,
        }
    }
}

/// Money owed to or by the user, paid back in parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    #[serde(default)]
    pub id: DebtId,
    #[serde(rename = "type")]
    pub kind: DebtKind,
    pub amount: Amount,
    pub person_name: String,
    pub reason: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub paid_amount: Amount,
    #[serde(default)]
    pub status: DebtStatus,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl Debt {
    pub fn new(
        kind: DebtKind,
        amount: Amount,
        person_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: DebtId::random(),
            kind,
            amount,
            person_name: person_name.into(),
            reason: reason.into(),
            date: Utc::now(),
            paid_amount: Amount::ZERO,
            status: DebtStatus::Unpaid,
            payments: Vec::new(),
        }
    }

    /// What is left to be paid. Never negative.
    pub fn remaining(&self) -> Amount {
        (self.amount - self.paid_amount).max(Amount::ZERO)
    }

    pub fn has_payment(&self, id: PaymentId) -> bool {
        self.payments.iter().any(|p| p.id == id)
    }

    pub fn is_paid(&self) -> bool {
        self.status == DebtStatus::Paid
    }

    /// Records a payment and updates the paid amount and the status.
    ///
    /// Returns `false` without changing anything if a payment with the same id
    /// was already recorded.
    pub fn apply_payment(&mut self, payment: Payment) -> Result<bool, ValidationError> {
        if self.has_payment(payment.id) {
            return Ok(false);
        }
        validation::positive_amount(payment.amount)?;
        let remaining = self.remaining();
        if payment.amount > remaining {
            return Err(ValidationError::ExceedsRemaining { remaining });
        }
        self.payments.push(payment);
        self.recompute();
        Ok(true)
    }

    /// Derives the paid amount and the status from the recorded payments.
    pub fn recompute(&mut self) {
        self.paid_amount = self.payments.iter().map(|p| p.amount).sum();
        self.status = if self.paid_amount >= self.amount {
            DebtStatus::Paid
        } else {
            DebtStatus::Unpaid
        };
    }
}

impl Record for Debt {
    type Id = DebtId;

    const KIND: ResourceKind = ResourceKind::Debts;

    fn id(&self) -> DebtId {
        self.id
    }

    fn set_id(&mut self, id: DebtId) {
        self.id = id;
    }

    fn date(&self) -> DateTime<Utc> {
        self.date
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validation::positive_amount(self.amount)?;
        validation::min_len("Person name", &self.person_name, MIN_PERSON_NAME_LEN)?;
        validation::min_len("Reason", &self.reason, MIN_REASON_LEN)?;
        Ok(())
    }

    /// Payments are only ever added through [`Debt::apply_payment`], so the
    /// stored payment history wins over whatever the update carries.
    fn merge_update(&self, update: Self) -> Self {
        let mut merged = Self {
            payments: self.payments.clone(),
            ..update
        };
        merged.recompute();
        merged
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use crate::assert_matches;

    use super::*;

    fn loan() -> Debt {
        Debt::new(DebtKind::Debtor, dec!(100), "Alice", "Concert tickets")
    }

    fn payment(amount: Amount) -> Payment {
        NewPayment::new(amount).into_payment()
    }

    #[test]
    fn partial_payments_until_paid() {
        let mut debt = loan();
        assert_eq!(debt.remaining(), dec!(100));

        assert!(debt.apply_payment(payment(dec!(40))).unwrap());
        assert_eq!(debt.paid_amount, dec!(40));
        assert_eq!(debt.remaining(), dec!(60));
        assert_eq!(debt.status, DebtStatus::Unpaid);

        assert!(debt.apply_payment(payment(dec!(60))).unwrap());
        assert_eq!(debt.paid_amount, dec!(100));
        assert_eq!(debt.remaining(), dec!(0));
        assert!(debt.is_paid());
        assert_eq!(debt.payments.len(), 2);
    }

    #[test]
    fn payment_cannot_exceed_remaining() {
        let mut debt = loan();
        debt.apply_payment(payment(dec!(70))).unwrap();
        assert_matches!(
            debt.apply_payment(payment(dec!(30.01))),
            Err(ValidationError::ExceedsRemaining { remaining }) if remaining == dec!(30)
        );
        assert_matches!(
            debt.apply_payment(payment(dec!(0))),
            Err(ValidationError::NonPositiveAmount)
        );
        assert_eq!(debt.paid_amount, dec!(70));
    }

    #[test]
    fn replayed_payment_is_ignored() {
        let mut debt = loan();
        let first = payment(dec!(25));
        assert!(debt.apply_payment(first.clone()).unwrap());
        assert!(!debt.apply_payment(first).unwrap());
        assert_eq!(debt.paid_amount, dec!(25));
        assert_eq!(debt.payments.len(), 1);
    }

    #[test]
    fn nil_payment_id_is_replaced() {
        let new_payment = NewPayment {
            id: PaymentId::default(),
            ..NewPayment::new(dec!(5))
        };
        assert!(!new_payment.into_payment().id.is_nil());
    }

    #[test]
    fn update_keeps_stored_payments() {
        let mut stored = loan();
        stored.apply_payment(payment(dec!(50))).unwrap();

        let mut update = stored.clone();
        update.payments.clear();
        update.paid_amount = dec!(0);
        update.amount = dec!(50);
        update.reason = "Concert tickets and dinner".into();

        let merged = stored.merge_update(update);
        assert_eq!(merged.payments, stored.payments);
        assert_eq!(merged.paid_amount, dec!(50));
        assert_eq!(merged.reason, "Concert tickets and dinner");
        assert!(merged.is_paid());
    }

    #[test]
    fn new_record_deserializes_with_defaults() {
        let debt: Debt = serde_json::from_value(json!({
            "type": "debt",
            "amount": 250.75,
            "personName": "Bob",
            "reason": "Rent share",
            "date": "2024-05-01T12:00:00Z",
        }))
        .unwrap();
        assert!(debt.id.is_nil());
        assert_eq!(debt.kind, DebtKind::Debt);
        assert_eq!(debt.paid_amount, dec!(0));
        assert_eq!(debt.status, DebtStatus::Unpaid);
        assert!(debt.payments.is_empty());
        assert!(debt.validate().is_ok());
    }

    #[test]
    fn validation() {
        let mut debt = loan();
        debt.person_name = "A".into();
        assert_matches!(
            debt.validate(),
            Err(ValidationError::TooShort {
                field: "Person name",
                ..
            })
        );
    }
}
