use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::{
    Error,
    enforcer::{BudgetEnforcer, BudgetStatus},
    transaction::Transaction,
    user::UserID,
    validation::TransactionInput,
};

/// The response body for a newly created transaction.
#[derive(Debug, Serialize)]
struct CreatedTransaction {
    transaction: Transaction,
    budget: BudgetStatus,
}

/// A route handler for creating a new transaction.
///
/// Responds with `201 Created`, the saved transaction and the state of its
/// category's budget. Any budget alert is delivered in the background and
/// does not affect the response.
pub async fn create_transaction_endpoint(
    State(enforcer): State<BudgetEnforcer>,
    Extension(user_id): Extension<UserID>,
    Json(input): Json<TransactionInput>,
) -> Result<impl IntoResponse, Error> {
    let outcome = enforcer.create_transaction(user_id, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedTransaction {
            transaction: outcome.transaction,
            budget: outcome.budget,
        }),
    ))
}
