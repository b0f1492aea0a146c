//! HTTP surface over the engine.
//!
//! Stateless: every request carries the lines and the catalog snapshot it is
//! checked against.

use axum::{extract::{Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use validator::Validate;

use crate::config::Config;
use crate::domain::aggregates::{Cart, CartError, DeliveryTarget, Order, OrderError};
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::Money;
use crate::engine::{build_query_params_with_threshold, compute_total, validate_stock_with_threshold, Catalog, FilterState, QueryParams, ValidationResult};
use crate::{ComboLineItem, Product, StorefrontError};

#[derive(Clone)] pub struct AppState { pub config: Arc<Config> }

impl AppState {
    pub fn new(config: Config) -> Self { Self { config: Arc::new(config) } }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "storefront-engine"})) }))
        .route("/api/v1/totals", post(totals))
        .route("/api/v1/stock/validate", post(validate_stock))
        .route("/api/v1/products/query", get(product_query))
        .route("/api/v1/checkout", post(checkout))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

type ApiError = (StatusCode, String);
type Rejection = (StatusCode, Json<Value>);

fn check_line_count(s: &AppState, lines: usize) -> Result<(), ApiError> {
    if lines > s.config.max_line_items {
        return Err((StatusCode::PAYLOAD_TOO_LARGE, format!("at most {} lines per request", s.config.max_line_items)));
    }
    Ok(())
}

fn reject(status: StatusCode, message: impl Into<String>) -> Rejection {
    (status, Json(json!({"error": message.into()})))
}

fn rejection_for(e: StorefrontError) -> Rejection {
    let status = match &e {
        StorefrontError::Cart(CartError::ProductNotFound(_)) | StorefrontError::Delivery(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StorefrontError::Order(OrderError::NoItems | OrderError::StockBlocked(_) | OrderError::RejectionReasonRequired) => StatusCode::UNPROCESSABLE_ENTITY,
        StorefrontError::Cart(_) | StorefrontError::Combo(_) | StorefrontError::Order(_) => StatusCode::CONFLICT,
        StorefrontError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    reject(status, e.to_string())
}

#[derive(Debug, Deserialize)] pub struct TotalsRequest { #[serde(default)] pub items: Vec<ComboLineItem> }
#[derive(Debug, Serialize)] #[serde(rename_all = "camelCase")] pub struct TotalsResponse { pub total: Money, pub display: String, pub line_count: usize }

async fn totals(State(s): State<AppState>, Json(r): Json<TotalsRequest>) -> Result<Json<TotalsResponse>, ApiError> {
    check_line_count(&s, r.items.len())?;
    let total = Money::new(compute_total(&r.items));
    Ok(Json(TotalsResponse { total, display: total.display(), line_count: r.items.len() }))
}

#[derive(Debug, Deserialize)] pub struct StockValidationRequest { #[serde(default)] pub items: Vec<ComboLineItem>, #[serde(default)] pub catalog: Vec<Product> }

async fn validate_stock(State(s): State<AppState>, Json(r): Json<StockValidationRequest>) -> Result<Json<ValidationResult>, ApiError> {
    check_line_count(&s, r.items.len())?;
    Ok(Json(validate_stock_with_threshold(&r.items, &r.catalog, s.config.low_stock_threshold)))
}

#[derive(Debug, Serialize)] #[serde(rename_all = "camelCase")] pub struct ProductQueryResponse { pub params: QueryParams, pub query_string: String }

async fn product_query(State(s): State<AppState>, Query(f): Query<FilterState>) -> Result<Json<ProductQueryResponse>, ApiError> {
    f.validate().map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let params = build_query_params_with_threshold(&f, s.config.low_stock_threshold);
    Ok(Json(ProductQueryResponse { query_string: params.to_query_string(), params }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate(length(min = 1))]
    pub items: Vec<ComboLineItem>,
    #[serde(default)]
    pub catalog: Vec<Product>,
    #[validate]
    pub delivery: DeliveryTarget,
    #[validate(length(min = 1, max = 120))]
    pub requested_by: String,
}

#[derive(Debug, Serialize)] pub struct CheckoutResponse { pub order: Order, pub warnings: Vec<String>, pub adjustments: Vec<CartEvent> }

async fn checkout(State(s): State<AppState>, Json(r): Json<CheckoutRequest>) -> Result<(StatusCode, Json<CheckoutResponse>), Rejection> {
    r.validate().map_err(|e| reject(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    check_line_count(&s, r.items.len()).map_err(|(status, msg)| reject(status, msg))?;

    // Stock is checked on what the cart will hold: repeated lines merged, combos at 1.
    let catalog = Catalog::with_threshold(&r.catalog, s.config.low_stock_threshold);
    let validation = catalog.validate(&Cart::requested_lines(&catalog, &r.items));
    if !validation.is_valid {
        tracing::info!(blocking = validation.blocking().count(), "checkout refused by stock validation");
        return Err((StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"error": "stock validation failed", "validation": validation}))));
    }

    let mut cart = Cart::new(catalog);
    for item in &r.items {
        cart.add_product(&item.product_id, item.quantity).map_err(|e| rejection_for(e.into()))?;
    }
    let adjustments: Vec<CartEvent> = cart.take_events().into_iter().filter_map(|e| match e {
        DomainEvent::Cart(event) => Some(event),
        DomainEvent::Order(_) => None,
    }).collect();
    let order = Order::place(&cart, r.delivery, r.requested_by).map_err(|e| rejection_for(e.into()))?;
    Ok((StatusCode::CREATED, Json(CheckoutResponse { warnings: cart.validation().warnings.clone(), order, adjustments })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router { router(AppState::new(Config::default())) }

    async fn send(req: Request<Body>) -> (StatusCode, Value) {
        let resp = app().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder().method("POST").uri(uri).header("content-type", "application/json").body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_totals() {
        let (status, body) = send(post_json("/api/v1/totals", json!({"items": [
            {"productId": "A", "unitPrice": 10, "quantity": 3},
            {"productId": "B", "unitPrice": 5, "quantity": 2},
            {"productId": "C", "quantity": 5}
        ]}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"].as_f64(), Some(40.0));
        assert_eq!(body["display"], "40.00");
        assert_eq!(body["lineCount"], 3);
    }

    #[tokio::test]
    async fn test_validate_stock() {
        let (status, body) = send(post_json("/api/v1/stock/validate", json!({
            "items": [{"productoId": {"_id": "A"}, "cantidad": 5}, {"productId": "X", "quantity": 1}],
            "catalog": [{"_id": "A", "nombre": "Escoba", "stock": 3}]
        }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isValid"], false);
        assert_eq!(body["warnings"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["issues"][0]["kind"], "insufficient");
        assert_eq!(body["issues"][1]["kind"], "notFound");
    }

    #[tokio::test]
    async fn test_product_query() {
        let (status, body) = send(get("/api/v1/products/query?showNoStockOnly=true&searchTerm=mop&category=limpieza&page=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["params"]["noStock"], "true");
        assert_eq!(body["params"]["page"], "2");
        assert!(body["params"].get("regex").is_none());
        assert!(body["params"].get("category").is_none());
        assert!(body["queryString"].as_str().unwrap().starts_with("page=2&noStock=true&_="));

        let (status, _) = send(get("/api/v1/products/query?limit=0")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    fn checkout_body(quantity: u32) -> Value {
        json!({
            "items": [{"productId": "A", "quantity": quantity}, {"productId": "K", "quantity": 1}],
            "catalog": [
                {"_id": "A", "nombre": "Escoba", "precio": 10, "stock": 8},
                {"_id": "K", "nombre": "Kit", "precio": 90, "stock": 30, "esCombo": true}
            ],
            "delivery": {"clientId": "C1", "subServiceId": "S1"},
            "requestedBy": "U7"
        })
    }

    #[tokio::test]
    async fn test_checkout_places_pending_order() {
        let (status, body) = send(post_json("/api/v1/checkout", checkout_body(2))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["order"]["status"], "pending_approval");
        assert_eq!(body["order"]["total"].as_f64(), Some(110.0));
        assert_eq!(body["order"]["delivery"]["subServiceId"], "S1");
        assert_eq!(body["warnings"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["adjustments"], json!([]));
    }

    #[tokio::test]
    async fn test_checkout_refused_on_stock() {
        let (status, body) = send(post_json("/api/v1/checkout", checkout_body(9))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["validation"]["isValid"], false);
    }

    #[tokio::test]
    async fn test_checkout_clamps_combo_before_checking_stock() {
        let mut body = checkout_body(1);
        body["items"] = json!([{"productId": "K", "quantity": 3}]);
        body["catalog"][1]["stock"] = json!(2);
        let (status, body) = send(post_json("/api/v1/checkout", body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["order"]["items"][0]["quantity"], 1);
        assert_eq!(body["adjustments"][0]["kind"], "comboQuantityClamped");
        assert_eq!(body["adjustments"][0]["attempted"], 3);
    }

    #[tokio::test]
    async fn test_checkout_checks_merged_quantities() {
        let mut body = checkout_body(1);
        body["items"] = json!([{"productId": "A", "quantity": 5}, {"productId": "A", "quantity": 5}]);
        let (status, body) = send(post_json("/api/v1/checkout", body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["validation"]["isValid"], false);
        assert_eq!(body["validation"]["issues"][0]["requested"], 10);
        assert_eq!(body["validation"]["issues"][0]["available"], 8);
    }

    #[tokio::test]
    async fn test_checkout_rejects_bad_request() {
        let mut body = checkout_body(1);
        body["delivery"]["clientId"] = json!("");
        let (status, _) = send(post_json("/api/v1/checkout", body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let mut body = checkout_body(1);
        body["items"] = json!([]);
        let (status, _) = send(post_json("/api/v1/checkout", body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
