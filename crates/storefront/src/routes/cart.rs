//! Cart route handlers.
//!
//! Carts are rows keyed by member; deleting a product deactivates its rows
//! rather than removing them.

use axum::http::StatusCode;
use tracing::instrument;

use store_core::{MemberId, ProductId};

use super::{positive_quantity, require_json};
use crate::error::Result;
use crate::http::{Envelope, RequestContext};
use crate::models::NewCartItem;
use crate::state::AppState;

/// `POST /cart/add` with `{member_id, product_id, quantity}`.
#[instrument(skip_all)]
pub async fn add(state: AppState, ctx: RequestContext) -> Result<Envelope> {
    require_json(&ctx)?;
    ctx.check()?;

    let item = NewCartItem {
        member_id: MemberId::new(ctx.field("member_id")?),
        product_id: ProductId::new(ctx.field("product_id")?),
        quantity: positive_quantity(&ctx)?,
    };

    state.service().add_to_cart(&item).await?;

    Ok(Envelope::message(StatusCode::OK, "Add To Cart Success"))
}

/// `POST /cart/view` with `{member_id}`: the member's active cart rows.
#[instrument(skip_all)]
pub async fn view(state: AppState, ctx: RequestContext) -> Result<Envelope> {
    require_json(&ctx)?;
    ctx.check()?;

    let member_id = MemberId::new(ctx.field("member_id")?);
    let items = state.service().view_cart(member_id).await?;

    Ok(Envelope::json(StatusCode::OK, "View Cart Success", &items)?)
}

/// `POST /cart/delete` with `{member_id, product_id}`.
#[instrument(skip_all)]
pub async fn delete(state: AppState, ctx: RequestContext) -> Result<Envelope> {
    require_json(&ctx)?;
    ctx.check()?;

    let member_id = MemberId::new(ctx.field("member_id")?);
    let product_id = ProductId::new(ctx.field("product_id")?);

    state
        .service()
        .delete_product_in_cart(member_id, product_id)
        .await?;

    Ok(Envelope::message(StatusCode::OK, "Delete Cart Success"))
}
