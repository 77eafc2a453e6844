//! Merchandise route handlers: listings, wishlist, and the payment flow.
//!
//! The payment flow is the two-endpoint handshake with the gateway:
//! `initiate` opens a session and records a `Transaction`, `verify` is the
//! redirect target that looks the session up and finalizes the purchase.
//! Everything that can go wrong during verification collapses into a
//! redirect to the SPA's payment-failed page.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use tunila_core::{MerchandiseId, Money, UserId};

use crate::db::merchandise::MerchandiseRepository;
use crate::db::transactions::{PurchaseOutcome, TransactionRepository};
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthSession;
use crate::models::{Transaction, User};
use crate::services::khalti::{CustomerInfo, InitiateRequest};
use crate::services::uploads::MediaKind;
use crate::state::AppState;

/// Gateway sessions need some phone number; the platform doesn't collect one.
const PLACEHOLDER_PHONE: &str = "9800000000";

const MAX_LISTING_IMAGES: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    pub merch_id: MerchandiseId,
    #[serde(default)]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentQuery {
    pub pidx: Option<String>,
}

/// Create a listing.
///
/// POST /api/merch (multipart: `name`, `description`, `price`, `type`,
/// optional `stock`, up to five `images`)
#[instrument(skip(state, session, multipart))]
pub async fn create(
    State(state): State<AppState>,
    session: AuthSession,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let user = UserRepository::new(state.pool())
        .get(session.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !user.can_sell_merch {
        return Err(AppError::Forbidden(
            "Complete artist verification to sell items".to_string(),
        ));
    }

    let mut name: Option<String> = None;
    let mut description: Option<String> = None;
    let mut price: Option<Decimal> = None;
    let mut kind: Option<String> = None;
    let mut stock: i32 = 1;
    let mut images: Vec<String> = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => name = Some(field.text().await?),
            "description" => description = Some(field.text().await?),
            "type" => kind = Some(field.text().await?),
            "price" => {
                let raw = field.text().await?;
                let parsed = raw.trim().parse::<Decimal>().map_err(|_| {
                    AppError::BadRequest(format!("invalid price: {raw}"))
                })?;
                price = Some(parsed);
            }
            "stock" => {
                let raw = field.text().await?;
                stock = raw.trim().parse::<i32>().map_err(|_| {
                    AppError::BadRequest(format!("invalid stock: {raw}"))
                })?;
            }
            "images" => {
                if images.len() >= MAX_LISTING_IMAGES {
                    return Err(AppError::BadRequest(format!(
                        "At most {MAX_LISTING_IMAGES} images are allowed"
                    )));
                }
                let file_name = field.file_name().map(ToOwned::to_owned);
                let bytes = field.bytes().await?;
                images.push(
                    state
                        .uploads()
                        .save(MediaKind::MerchImage, file_name.as_deref(), bytes)
                        .await?,
                );
            }
            _ => {}
        }
    }

    if images.is_empty() {
        return Err(AppError::BadRequest(
            "At least one image is required".to_string(),
        ));
    }
    let name = require_text(name, "name")?;
    let description = require_text(description, "description")?;
    let kind = require_text(kind, "type")?;
    let price = price.ok_or_else(|| AppError::BadRequest("price is required".to_string()))?;

    // Money validates non-negativity; stored as decimal rupees
    let price = Money::new(price)
        .map_err(|e| AppError::BadRequest(e.to_string()))?
        .rupees();

    if stock < 0 {
        return Err(AppError::BadRequest("stock cannot be negative".to_string()));
    }

    let merch = MerchandiseRepository::new(state.pool())
        .create(&name, &description, price, &kind, &images, user.id, stock)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "merch": merch })),
    ))
}

/// Every listing with its artist card.
///
/// GET /api/merch
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let merchandise = MerchandiseRepository::new(state.pool()).list_all().await?;
    Ok(Json(json!({ "success": true, "merchandise": merchandise })))
}

/// One listing.
///
/// GET /api/merch/{merch_id}
#[instrument(skip(state))]
pub async fn get(
    State(state): State<AppState>,
    Path(merch_id): Path<MerchandiseId>,
) -> Result<impl IntoResponse> {
    let merch = MerchandiseRepository::new(state.pool())
        .get(merch_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Merchandise not found".to_string()))?;

    Ok(Json(json!({ "success": true, "merch": merch })))
}

/// Listings by one artist.
///
/// GET /api/merch/artist/{user_id}
#[instrument(skip(state))]
pub async fn by_artist(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse> {
    let merchandise = MerchandiseRepository::new(state.pool())
        .list_by_artist(user_id)
        .await?;

    Ok(Json(json!({ "success": true, "merchandise": merchandise })))
}

/// Toggle a wishlist entry.
///
/// POST /api/merch/{merch_id}/wishlist
#[instrument(skip(state, session))]
pub async fn toggle_wishlist(
    State(state): State<AppState>,
    session: AuthSession,
    Path(merch_id): Path<MerchandiseId>,
) -> Result<impl IntoResponse> {
    let in_wishlist = MerchandiseRepository::new(state.pool())
        .toggle_wishlist(merch_id, session.user_id)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => {
                AppError::NotFound("Merchandise not found".to_string())
            }
            other => AppError::Database(other),
        })?;

    Ok(Json(json!({
        "success": true,
        "message": if in_wishlist { "Added to wishlist" } else { "Removed from wishlist" },
        "inWishlist": in_wishlist,
    })))
}

/// The logged-in user's wishlist.
///
/// GET /api/merch/wishlist/my-items
#[instrument(skip(state, session))]
pub async fn my_wishlist(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<impl IntoResponse> {
    let merchandise = MerchandiseRepository::new(state.pool())
        .wishlist_of(session.user_id)
        .await?;

    Ok(Json(json!({ "success": true, "merchandise": merchandise })))
}

/// Open a payment session with the gateway.
///
/// POST /api/merch/payment/initiate
///
/// Stock is checked but not reserved here; the conditional decrement at
/// verification time is the enforcement point. A session that outlives the
/// stock simply fails to verify.
#[instrument(skip(state, session, req), fields(merch = %req.merch_id, quantity = req.quantity))]
pub async fn initiate_payment(
    State(state): State<AppState>,
    session: AuthSession,
    Json(req): Json<InitiatePaymentRequest>,
) -> Result<impl IntoResponse> {
    if req.quantity < 1 {
        return Err(AppError::BadRequest("Invalid request data".to_string()));
    }

    let merch = MerchandiseRepository::new(state.pool())
        .get(req.merch_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Merchandise not found".to_string()))?
        .merch;

    let buyer = UserRepository::new(state.pool())
        .get(session.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    if merch.stock < req.quantity {
        return Err(AppError::BadRequest("Insufficient stock".to_string()));
    }

    let amount = Money::new(merch.price)
        .and_then(|m| m.total_paisa(req.quantity.unsigned_abs()))
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let frontend = state.config().frontend_base();
    let order_id = format!("TUNILA_{}", uuid::Uuid::new_v4().simple());

    let initiated = state
        .khalti()
        .initiate(&InitiateRequest {
            return_url: format!("{frontend}/payment-verify"),
            website_url: frontend.to_string(),
            amount,
            purchase_order_id: order_id,
            purchase_order_name: merch.name.clone(),
            customer_info: CustomerInfo {
                name: buyer.name.clone(),
                email: buyer.email.as_str().to_string(),
                phone: PLACEHOLDER_PHONE.to_string(),
            },
        })
        .await?;

    let transaction = TransactionRepository::new(state.pool())
        .create(
            merch.id,
            buyer.id,
            merch.artist_id,
            req.quantity,
            i64::try_from(amount)
                .map_err(|_| AppError::BadRequest("amount too large".to_string()))?,
            &initiated.pidx,
        )
        .await?;

    tracing::info!(pidx = %transaction.pidx, "payment session opened");

    Ok(Json(json!({
        "success": true,
        "pidx": transaction.pidx,
        "paymentUrl": initiated.payment_url,
    })))
}

/// Gateway redirect target: look the session up and settle it.
///
/// GET /api/merch/payment/verify?pidx=...
///
/// Always responds with a redirect to the SPA - success or failure page -
/// never JSON; the buyer arrives here from the gateway's hosted page.
#[instrument(skip(state))]
pub async fn verify_payment(
    State(state): State<AppState>,
    Query(query): Query<VerifyPaymentQuery>,
) -> Result<Redirect> {
    let frontend = state.config().frontend_base().to_string();

    let Some(pidx) = query.pidx.filter(|p| !p.is_empty()) else {
        return Err(AppError::BadRequest("Payment ID is required".to_string()));
    };

    match settle(&state, &pidx).await {
        Ok(completed) => {
            if completed {
                Ok(Redirect::to(&format!("{frontend}/payment-success")))
            } else {
                Ok(Redirect::to(&format!("{frontend}/payment-failed")))
            }
        }
        Err(e) => {
            // Whatever went wrong, the buyer gets the failure page
            tracing::error!(error = %e, %pidx, "payment verification failed");
            Ok(Redirect::to(&format!("{frontend}/payment-failed")))
        }
    }
}

/// Drive a verification to its terminal state. Returns whether the purchase
/// is (now or already) completed.
async fn settle(state: &AppState, pidx: &str) -> Result<bool> {
    let lookup = state.khalti().lookup(pidx).await?;
    let transactions = TransactionRepository::new(state.pool());

    if !lookup.status.is_completed() {
        tracing::info!(%pidx, status = ?lookup.status, "payment not completed");
        transactions.mark_failed_if_initiated(pidx).await?;
        return Ok(false);
    }

    match transactions.finalize(pidx).await? {
        PurchaseOutcome::Completed(transaction) => {
            tracing::info!(%pidx, "purchase completed");
            send_purchase_emails(state, &transaction).await;
            Ok(true)
        }
        PurchaseOutcome::AlreadyCompleted(_) => {
            // Gateway re-delivered the redirect; nothing to hand over twice
            tracing::info!(%pidx, "verification replay on completed purchase");
            Ok(true)
        }
        PurchaseOutcome::AlreadyFailed(_) => Ok(false),
        PurchaseOutcome::InsufficientStock(_) => {
            tracing::warn!(%pidx, "stock ran out before verification");
            Ok(false)
        }
    }
}

/// Buyer confirmation and artist sale notice.
///
/// The purchase is already committed when these go out; a mail failure is
/// logged, not propagated.
async fn send_purchase_emails(state: &AppState, transaction: &Transaction) {
    let users = UserRepository::new(state.pool());
    let merch = MerchandiseRepository::new(state.pool());

    let item_name = match merch.get(transaction.merch_id).await {
        Ok(Some(m)) => m.merch.name,
        _ => "your order".to_string(),
    };

    if let Ok(Some(buyer)) = users.get(transaction.buyer_id).await {
        notify(
            state
                .email()
                .send_purchase_confirmation(
                    buyer.email.as_str(),
                    &buyer.name,
                    &item_name,
                    transaction.quantity,
                    transaction.amount_paisa,
                )
                .await,
            &buyer,
            "purchase confirmation",
        );
    }

    if let Ok(Some(artist)) = users.get(transaction.artist_id).await {
        notify(
            state
                .email()
                .send_sale_notice(
                    artist.email.as_str(),
                    &artist.name,
                    &item_name,
                    transaction.quantity,
                )
                .await,
            &artist,
            "sale notice",
        );
    }
}

fn notify(result: std::result::Result<(), crate::services::EmailError>, user: &User, what: &str) {
    if let Err(e) = result {
        tracing::warn!(error = %e, user = %user.id, "{what} email failed");
    }
}

fn require_text(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{field} is required")))
}
