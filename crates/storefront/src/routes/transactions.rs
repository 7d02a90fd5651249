//! Checkout handler.

use axum::http::StatusCode;
use tracing::instrument;

use store_core::{MemberId, ProductId};

use super::{positive_quantity, require_json};
use crate::error::{Result, add_breadcrumb};
use crate::http::{Envelope, RequestContext};
use crate::models::CheckoutRequest;
use crate::state::AppState;

/// `POST /transaction/create`.
///
/// `member_id`, `product_id` and `quantity` are required; the channel fields
/// are optional strings stored as given.
#[instrument(skip_all)]
pub async fn create(state: AppState, ctx: RequestContext) -> Result<Envelope> {
    require_json(&ctx)?;
    ctx.check()?;

    let request = CheckoutRequest {
        member_id: MemberId::new(ctx.field("member_id")?),
        product_id: ProductId::new(ctx.field("product_id")?),
        quantity: positive_quantity(&ctx)?,
        trx_code: optional_text(&ctx, "trx_code")?,
        channel_id: optional_text(&ctx, "channel_id")?,
        channel_ref_no: optional_text(&ctx, "channel_ref_no")?,
        channel_time: optional_text(&ctx, "channel_time")?,
        channel_date: optional_text(&ctx, "channel_date")?,
    };

    let product_id = request.product_id.to_string();
    add_breadcrumb(
        "checkout",
        "Checkout started",
        Some(&[("product_id", product_id.as_str())]),
    );

    state.service().create_transaction(&request).await?;

    Ok(Envelope::message(StatusCode::OK, "Transaction Success"))
}

fn optional_text(ctx: &RequestContext, key: &str) -> Result<String> {
    Ok(ctx.optional_field::<String>(key)?.unwrap_or_default())
}
