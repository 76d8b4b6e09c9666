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
    AddItemRequest, ImageMarkdownResponse, MessageResponse, ProductAddedResponse,
    ProductInfoResponse, ProductQuery, SellerProductQuery, SellerProductResponse, SellerQuery,
    UpdateItemRequest,
};
use crate::observability::BusinessTracingMiddleware;
use crate::services::SellerService;

const SERVICE: &str = "seller";

#[derive(Clone)]
pub struct SellerState {
    pub seller_service: Arc<SellerService>,
    pub tracer: Arc<BusinessTracingMiddleware>,
}

pub fn seller_router(state: SellerState) -> Router {
    Router::new()
        .route("/add_item", post(add_item))
        .route("/update_item", post(update_item))
        .route("/view_seller_products", get(view_seller_products))
        .route("/remove_item", delete(remove_item))
        .route("/get_product_image_url", get(get_product_image_url))
        .route("/get_product_info_with_image", get(get_product_info_with_image))
        .with_state(state)
}

#[instrument(name = "add_item", skip(state, request), fields(
    seller = %request.username,
    product = %request.product,
))]
pub async fn add_item(
    State(state): State<SellerState>,
    ApiQuery(request): ApiQuery<AddItemRequest>,
) -> Result<Json<ProductAddedResponse>, ApiError> {
    let response = state
        .tracer
        .trace_operation(SERVICE, "add_item", state.seller_service.add_item(request))
        .await?;
    Ok(Json(response))
}

#[instrument(name = "update_item", skip(state, request), fields(
    seller = %request.username,
    product = %request.product,
))]
pub async fn update_item(
    State(state): State<SellerState>,
    ApiQuery(request): ApiQuery<UpdateItemRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let response = state
        .tracer
        .trace_operation(SERVICE, "update_item", state.seller_service.update_item(request))
        .await?;
    Ok(Json(response))
}

#[instrument(name = "view_seller_products", skip(state, query), fields(seller = %query.username))]
pub async fn view_seller_products(
    State(state): State<SellerState>,
    ApiQuery(query): ApiQuery<SellerQuery>,
) -> Result<Json<Vec<SellerProductResponse>>, ApiError> {
    let products = state
        .tracer
        .trace_operation(
            SERVICE,
            "view_seller_products",
            state.seller_service.view_seller_products(&query.username),
        )
        .await?;
    Ok(Json(products))
}

#[instrument(name = "remove_item", skip(state, query), fields(
    seller = %query.username,
    product = %query.product,
))]
pub async fn remove_item(
    State(state): State<SellerState>,
    ApiQuery(query): ApiQuery<SellerProductQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let response = state
        .tracer
        .trace_operation(SERVICE, "remove_item", state.seller_service.remove_item(query))
        .await?;
    Ok(Json(response))
}

#[instrument(name = "get_product_image_url", skip(state, query), fields(product = %query.product))]
pub async fn get_product_image_url(
    State(state): State<SellerState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<ImageMarkdownResponse>, ApiError> {
    let response = state
        .tracer
        .trace_operation(
            SERVICE,
            "get_product_image_url",
            state.seller_service.get_product_image_url(&query.product),
        )
        .await?;
    Ok(Json(response))
}

#[instrument(name = "get_product_info_with_image", skip(state, query), fields(product = %query.product))]
pub async fn get_product_info_with_image(
    State(state): State<SellerState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<ProductInfoResponse>, ApiError> {
    let response = state
        .tracer
        .trace_operation(
            SERVICE,
            "get_product_info_with_image",
            state.seller_service.get_product_info_with_image(&query.product),
        )
        .await?;
    Ok(Json(response))
}
