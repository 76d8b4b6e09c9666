use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tracing::instrument;

use super::error::{ApiError, ApiQuery};
use crate::models::{
    AddBalanceRequest, AddToCartRequest, BalanceResponse, BalanceUpdatedResponse, BuyerQuery,
    CartEntryResponse, MessageResponse, OrderPlacedResponse, OrderResponse, ProductSummary,
    RemoveFromCartRequest,
};
use crate::observability::BusinessTracingMiddleware;
use crate::services::BuyerService;

const SERVICE: &str = "buyer";

#[derive(Clone)]
pub struct BuyerState {
    pub buyer_service: Arc<BuyerService>,
    pub tracer: Arc<BusinessTracingMiddleware>,
}

pub fn buyer_router(state: BuyerState) -> Router {
    Router::new()
        .route("/view_products", get(view_products))
        .route("/view_cart", get(view_cart))
        .route("/check_balance", get(check_balance))
        .route("/add_balance", post(add_balance))
        .route("/add_to_cart", post(add_to_cart))
        .route("/remove_from_cart", delete(remove_from_cart))
        .route("/place_order", post(place_order))
        .route("/view_orders", get(view_orders))
        .with_state(state)
}

#[instrument(name = "view_products", skip(state))]
pub async fn view_products(
    State(state): State<BuyerState>,
) -> Result<Json<Vec<ProductSummary>>, ApiError> {
    let products = state
        .tracer
        .trace_operation(SERVICE, "view_products", state.buyer_service.view_products())
        .await?;
    Ok(Json(products))
}

#[instrument(name = "view_cart", skip(state, query), fields(buyer = %query.buyer))]
pub async fn view_cart(
    State(state): State<BuyerState>,
    ApiQuery(query): ApiQuery<BuyerQuery>,
) -> Result<Json<Vec<CartEntryResponse>>, ApiError> {
    let cart = state
        .tracer
        .trace_operation(SERVICE, "view_cart", state.buyer_service.view_cart(&query.buyer))
        .await?;
    Ok(Json(cart))
}

#[instrument(name = "check_balance", skip(state, query), fields(buyer = %query.buyer))]
pub async fn check_balance(
    State(state): State<BuyerState>,
    ApiQuery(query): ApiQuery<BuyerQuery>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state
        .tracer
        .trace_operation(
            SERVICE,
            "check_balance",
            state.buyer_service.check_balance(&query.buyer),
        )
        .await?;
    Ok(Json(balance))
}

#[instrument(name = "add_balance", skip(state, request), fields(buyer = %request.buyer))]
pub async fn add_balance(
    State(state): State<BuyerState>,
    ApiQuery(request): ApiQuery<AddBalanceRequest>,
) -> Result<Json<BalanceUpdatedResponse>, ApiError> {
    let response = state
        .tracer
        .trace_operation(SERVICE, "add_balance", state.buyer_service.add_balance(request))
        .await?;
    Ok(Json(response))
}

#[instrument(name = "add_to_cart", skip(state, request), fields(
    buyer = %request.buyer,
    product_id = %request.product_id,
    quantity = request.quantity,
))]
pub async fn add_to_cart(
    State(state): State<BuyerState>,
    ApiQuery(request): ApiQuery<AddToCartRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    crate::info_with_trace!(
        "Adding {} of {} to {}'s cart",
        request.quantity,
        request.product_id,
        request.buyer
    );

    let response = state
        .tracer
        .trace_operation(SERVICE, "add_to_cart", state.buyer_service.add_to_cart(request))
        .await?;
    Ok(Json(response))
}

#[instrument(name = "remove_from_cart", skip(state, request), fields(
    buyer = %request.buyer,
    product_id = %request.product_id,
))]
pub async fn remove_from_cart(
    State(state): State<BuyerState>,
    ApiQuery(request): ApiQuery<RemoveFromCartRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let response = state
        .tracer
        .trace_operation(
            SERVICE,
            "remove_from_cart",
            state.buyer_service.remove_from_cart(request),
        )
        .await?;
    Ok(Json(response))
}

#[instrument(name = "place_order", skip(state, query), fields(buyer = %query.buyer))]
pub async fn place_order(
    State(state): State<BuyerState>,
    ApiQuery(query): ApiQuery<BuyerQuery>,
) -> Result<Json<OrderPlacedResponse>, ApiError> {
    let response = state
        .tracer
        .trace_checkout(SERVICE, state.buyer_service.place_order(&query.buyer))
        .await;

    match response {
        Ok(placed) => {
            crate::info_with_trace!(order_id = %placed.order_id, "Order placed");
            Ok(Json(placed))
        }
        Err(err) => {
            crate::warn_with_trace!(error = %err, "Checkout rejected");
            Err(err.into())
        }
    }
}

#[instrument(name = "view_orders", skip(state, query), fields(buyer = %query.buyer))]
pub async fn view_orders(
    State(state): State<BuyerState>,
    ApiQuery(query): ApiQuery<BuyerQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state
        .tracer
        .trace_operation(SERVICE, "view_orders", state.buyer_service.view_orders(&query.buyer))
        .await?;
    Ok(Json(orders))
}
