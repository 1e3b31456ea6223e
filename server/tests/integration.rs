// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::time::Duration;

use chrono::{TimeZone, Utc};
use ledgerapiclient::{ApiClient, StatusCode};
use ledgerbackend::settings::RateLimitsSettings;
use ledgercommon::{
    identifiers::{DebtId, Identifier, TransactionId},
    messages::{LoginRequest, SESSION_COOKIE},
    records::{Debt, DebtKind, DebtStatus, NewPayment, Transaction, TransactionKind},
};
use ledgerserver_test_harness::utils::setup::{TEST_PASSWORD, TestBackend};
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tracing::info;
use zeroize::Zeroizing;

fn transaction(kind: TransactionKind, amount: ledgercommon::Amount, category: &str) -> Transaction {
    Transaction {
        id: TransactionId::default(),
        kind,
        amount,
        date: Utc.with_ymd_and_hms(2024, 5, 3, 9, 30, 0).unwrap(),
        reason: "Monthly".into(),
        category: category.into(),
        account_name: None,
    }
}

async fn logged_in_client(setup: &TestBackend) -> ApiClient {
    let client = setup.api_client();
    let signup = setup.signup(&client).await;
    client
        .login(&LoginRequest {
            username: signup.username,
            password: Zeroizing::new(TEST_PASSWORD.to_owned()),
        })
        .await
        .unwrap();
    client
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[tracing::instrument(name = "Health check test", skip_all)]
async fn health_check_works() {
    let setup = TestBackend::single().await;
    let response = reqwest::get(format!("{}health", setup.server_url()))
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[tracing::instrument(name = "Signup and login test", skip_all)]
async fn signup_login_logout() {
    let setup = TestBackend::single().await;
    let client = setup.api_client();
    let signup = setup.signup(&client).await;

    // Same username again
    let error = client.signup(&signup).await.unwrap_err();
    assert_eq!(error.status(), Some(StatusCode::CONFLICT));
    assert_eq!(
        error.to_string(),
        "Username already exists (409 Conflict)"
    );

    let wrong_password = LoginRequest {
        username: signup.username.clone(),
        password: Zeroizing::new("wrong password".to_owned()),
    };
    let error = client.login(&wrong_password).await.unwrap_err();
    assert!(error.is_unauthorized());
    assert!(!client.has_session());

    // The session is returned as a token and as a cookie.
    let response = reqwest::Client::new()
        .post(format!("{}api/auth/login", setup.server_url()))
        .json(&json!({ "username": signup.username, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=")));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age="));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["username"], signup.username.as_str());
    assert_eq!(body["user"]["firstName"], "Test");
    assert!(body["user"].get("password").is_none());
    assert!(body["token"].is_string());

    // The cookie alone authenticates.
    let session = cookie.split(';').next().unwrap();
    let response = reqwest::Client::new()
        .get(format!("{}api/transactions", setup.server_url()))
        .header(reqwest::header::COOKIE, session)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Logging out expires the cookie.
    let response = reqwest::Client::new()
        .post(format!("{}api/auth/logout", setup.server_url()))
        .header(reqwest::header::COOKIE, session)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let expired = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(expired.starts_with(&format!("{SESSION_COOKIE}=;")));
    assert!(expired.contains("Max-Age=0"));

    let login = client
        .login(&LoginRequest {
            username: signup.username,
            password: Zeroizing::new(TEST_PASSWORD.to_owned()),
        })
        .await
        .unwrap();
    assert_eq!(login.user.first_name, "Test");
    assert!(client.list_transactions().await.unwrap().is_empty());

    client.logout().await.unwrap();
    let error = client.list_transactions().await.unwrap_err();
    assert!(error.is_unauthorized());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[tracing::instrument(name = "Invalid signup test", skip_all)]
async fn signup_is_validated() {
    let setup = TestBackend::single().await;
    let response = reqwest::Client::new()
        .post(format!("{}api/auth/signup", setup.server_url()))
        .json(&json!({ "username": "bob", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "All fields are required");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[tracing::instrument(name = "Transactions test", skip_all)]
async fn transactions_crud() {
    let setup = TestBackend::single().await;
    let client = logged_in_client(&setup).await;

    let salary = client
        .create_transaction(&transaction(TransactionKind::Income, dec!(3000), "Salary"))
        .await
        .unwrap();
    assert!(!salary.id.is_nil());
    let mut rent = client
        .create_transaction(&transaction(TransactionKind::Expense, dec!(1200), "Housing"))
        .await
        .unwrap();

    // Creating with a known id again does not duplicate the record.
    let again = client.create_transaction(&rent).await.unwrap();
    assert_eq!(again, rent);
    assert_eq!(client.list_transactions().await.unwrap().len(), 2);

    rent.amount = dec!(1250);
    let updated = client.update_transaction(&rent).await.unwrap();
    assert_eq!(updated.amount, dec!(1250));

    let invalid = transaction(TransactionKind::Expense, dec!(-5), "Housing");
    let error = client.create_transaction(&invalid).await.unwrap_err();
    assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(error.to_string(), "Please enter a positive amount. (400 Bad Request)");

    let summary = client.summary().await.unwrap();
    assert_eq!(summary.transactions.total_income, dec!(3000));
    assert_eq!(summary.transactions.total_expenses, dec!(1250));
    assert_eq!(summary.transactions.balance, dec!(1750));

    let report = client.monthly_report(2024, 5).await.unwrap();
    assert_eq!(report.net, dec!(1750));
    assert_eq!(report.transaction_count, 2);
    assert_eq!(report.top_categories[0].category, "Housing");
    let error = client.monthly_report(2024, 0).await.unwrap_err();
    assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));

    client.delete_transaction(salary.id).await.unwrap();
    let error = client.delete_transaction(salary.id).await.unwrap_err();
    assert!(error.is_not_found());
    let error = client
        .update_transaction(&Transaction {
            id: TransactionId::random(),
            ..rent.clone()
        })
        .await
        .unwrap_err();
    assert!(error.is_not_found());
    assert_eq!(client.list_transactions().await.unwrap(), vec![updated]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[tracing::instrument(name = "Users are isolated test", skip_all)]
async fn records_are_per_user() {
    let setup = TestBackend::single().await;
    let alice = logged_in_client(&setup).await;
    let bob = logged_in_client(&setup).await;

    let rent = alice
        .create_transaction(&transaction(TransactionKind::Expense, dec!(900), "Housing"))
        .await
        .unwrap();
    assert!(bob.list_transactions().await.unwrap().is_empty());
    let error = bob.delete_transaction(rent.id).await.unwrap_err();
    assert!(error.is_not_found());
    assert_eq!(alice.list_transactions().await.unwrap(), vec![rent]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[tracing::instrument(name = "Debts test", skip_all)]
async fn debts_with_partial_payments() {
    let setup = TestBackend::single().await;
    let client = logged_in_client(&setup).await;

    let debt = client
        .create_debt(&Debt::new(DebtKind::Debtor, dec!(100), "Carla", "Train tickets"))
        .await
        .unwrap();
    assert_eq!(debt.status, DebtStatus::Unpaid);

    let first = NewPayment::new(dec!(30)).with_reason("Cash");
    let debt_after = client.add_payment(debt.id, &first).await.unwrap();
    assert_eq!(debt_after.paid_amount, dec!(30));
    assert_eq!(debt_after.payments.len(), 1);

    // Replaying the same payment does not record it twice.
    let replayed = client.add_payment(debt.id, &first).await.unwrap();
    assert_eq!(replayed, debt_after);

    let error = client
        .add_payment(debt.id, &NewPayment::new(dec!(80)))
        .await
        .unwrap_err();
    assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(
        error.to_string(),
        "Amount cannot exceed remaining balance of 70 (400 Bad Request)"
    );

    let paid = client
        .add_payment(debt.id, &NewPayment::new(dec!(70)))
        .await
        .unwrap();
    assert_eq!(paid.status, DebtStatus::Paid);

    let error = client
        .add_payment(DebtId::random(), &NewPayment::new(dec!(1)))
        .await
        .unwrap_err();
    assert!(error.is_not_found());

    // Updates keep the payment history.
    let mut edited = paid.clone();
    edited.payments.clear();
    edited.amount = dec!(150);
    let edited = client.update_debt(&edited).await.unwrap();
    assert_eq!(edited.payments.len(), 2);
    assert_eq!(edited.paid_amount, dec!(100));
    assert_eq!(edited.status, DebtStatus::Unpaid);

    let summary = client.summary().await.unwrap();
    assert_eq!(summary.debts.debtor_count, 1);
    assert_eq!(summary.debts.outstanding_debtors, dec!(50));

    client.delete_debt(debt.id).await.unwrap();
    assert!(client.list_debts().await.unwrap().is_empty());
    assert!(client.delete_debt(debt.id).await.unwrap_err().is_not_found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[tracing::instrument(name = "Wire format test", skip_all)]
async fn records_use_the_documented_wire_format() {
    let setup = TestBackend::single().await;
    let client = logged_in_client(&setup).await;
    let token = client.token().unwrap();

    let response = reqwest::Client::new()
        .post(format!("{}api/debts", setup.server_url()))
        .bearer_auth(&token)
        .json(&json!({
            "type": "debt",
            "amount": 42.5,
            "personName": "Dora",
            "reason": "Groceries",
            "date": "2024-06-01T10:00:00Z",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["type"], "debt");
    assert_eq!(body["personName"], "Dora");
    assert_eq!(body["paidAmount"], 0.0);
    assert_eq!(body["status"], "unpaid");
    assert_eq!(body["payments"], json!([]));
    assert!(body["id"].is_string());

    let response = reqwest::Client::new()
        .delete(format!(
            "{}api/debts/{}",
            setup.server_url(),
            body["id"].as_str().unwrap()
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Debt record deleted successfully" }));

    let response = reqwest::Client::new()
        .get(format!("{}api/transactions", setup.server_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Unauthorized" }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[tracing::instrument(name = "Rate limit test", skip_all)]
async fn rate_limit() {
    let setup = TestBackend::single_with_rate_limits(RateLimitsSettings {
        period: Duration::from_secs(1), // replenish one token every second
        burst: 10,                      // allow 10 requests
    })
    .await;
    let client = reqwest::Client::new();
    let url = format!("{}health", setup.server_url());

    let mut limited = false;
    for _ in 0..20 {
        let response = client.get(&url).send().await.unwrap();
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            limited = true;
            break;
        }
    }
    assert!(limited, "requests were never rate limited");
    info!("Rate limit hit, waiting for replenishment");

    tokio::time::sleep(Duration::from_secs(2)).await;
    let response = client.get(&url).send().await.unwrap();
    assert!(response.status().is_success());
}
