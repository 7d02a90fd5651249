//! Product catalog handlers.

use axum::http::StatusCode;
use tracing::instrument;

use super::require_json;
use crate::error::Result;
use crate::http::{Envelope, RequestContext};
use crate::state::AppState;

/// `POST /product/list` with an optional `category` filter.
///
/// A missing, null or empty category lists every product.
#[instrument(skip_all)]
pub async fn list(state: AppState, ctx: RequestContext) -> Result<Envelope> {
    require_json(&ctx)?;
    ctx.check()?;

    let category = ctx
        .optional_field::<String>("category")?
        .filter(|c| !c.is_empty());

    let products = state.service().list_products(category.as_deref()).await?;

    Ok(Envelope::json(
        StatusCode::OK,
        "List Product Success",
        &products,
    )?)
}
