use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{Error, enforcer::BudgetEnforcer, user::UserID, validation::LimitInput};

/// A route handler for setting the limit of one of the user's categories.
///
/// Responds with `201 Created` and the saved limit.
pub async fn set_limit_endpoint(
    State(enforcer): State<BudgetEnforcer>,
    Extension(user_id): Extension<UserID>,
    Json(input): Json<LimitInput>,
) -> Result<impl IntoResponse, Error> {
    let limit = enforcer.set_limit(user_id, input).await?;

    Ok((StatusCode::CREATED, Json(limit)))
}

/// A route handler for listing the user's limits.
pub async fn get_limits_endpoint(
    State(enforcer): State<BudgetEnforcer>,
    Extension(user_id): Extension<UserID>,
) -> Result<impl IntoResponse, Error> {
    let limits = enforcer.get_limits(user_id).await?;

    Ok(Json(limits))
}

/// A route handler for getting the limit of a single category.
pub async fn get_limit_endpoint(
    State(enforcer): State<BudgetEnforcer>,
    Extension(user_id): Extension<UserID>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let limit = enforcer.get_limit(user_id, &category).await?;

    Ok(Json(limit))
}
