//! Login handler.

use axum::http::StatusCode;
use tracing::instrument;

use store_core::Username;

use super::require_json;
use crate::error::{Result, set_sentry_user};
use crate::http::{Envelope, RequestContext};
use crate::services::ServiceError;
use crate::state::AppState;

/// `POST /login` with `{username, password}`; answers `{id_user, token}`.
#[instrument(skip_all)]
pub async fn login(state: AppState, ctx: RequestContext) -> Result<Envelope> {
    require_json(&ctx)?;
    ctx.check()?;

    let username: String = ctx.field("username")?;
    let password: String = ctx.field("password")?;
    // No stored member can carry a name that fails to parse.
    let username = Username::parse(&username).map_err(|_| ServiceError::NotFound("Member"))?;

    let session = state.service().login(&username, &password).await?;
    set_sentry_user(&session.id_user, Some(username.as_str()));

    Ok(Envelope::json(StatusCode::OK, "Login Success", &session)?)
}
