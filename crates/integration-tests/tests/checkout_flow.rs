//! Hosted checkout from cart to recorded order.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use emporium_core::{OrderId, OrderStatus, Price, UserId};
use emporium_integration_tests::{TestClient, TestContext};
use emporium_storefront::db::{MemoryStore, OrderStore, RepositoryError};
use emporium_storefront::models::{NewOrder, Order, OrderItem, ShippingAddress};

async fn start_checkout(client: &mut TestClient) -> String {
    let response = client.post("/checkout/create-session").await;
    assert_eq!(response.status, 200, "{}", response.text());
    let created: Value = response.json();
    assert!(created["url"].as_str().unwrap().contains("cs_test_"));
    created["session_id"].as_str().unwrap().to_string()
}

async fn cart_count(client: &mut TestClient) -> u64 {
    client.get("/cart").await.json::<Value>()["item_count"]
        .as_u64()
        .unwrap()
}

#[tokio::test]
async fn test_signed_in_checkout_places_one_order() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    let user = ctx.seed_user("Grace", "grace@example.com").await;
    let mut client = ctx.signed_in("grace@example.com").await;

    client.post(&format!("/cart/add/{}", mug.id)).await;
    client.post(&format!("/cart/add/{}", mug.id)).await;
    let session_id = start_checkout(&mut client).await;

    let request = &ctx.payments.requests()[0];
    assert_eq!(request.customer_email.as_deref(), Some("grace@example.com"));
    assert_eq!(request.metadata["user_id"], user.id.to_string());
    assert_eq!(request.line_items[0].unit_amount, 999);
    assert_eq!(request.line_items[0].quantity, 2);
    assert_eq!(request.success_url, "http://shop.test/checkout/success?session_id={CHECKOUT_SESSION_ID}");

    assert!(ctx.payments.pay(&session_id));
    let success = client
        .get(&format!("/checkout/success?session_id={session_id}"))
        .await;
    assert!(success.status.is_redirection());
    let location = success.location().unwrap().to_string();
    assert!(location.starts_with("/order/"), "{location}");
    assert_eq!(cart_count(&mut client).await, 0);

    let order: Value = client.get(&location).await.json();
    assert_eq!(order["status"], "Order Placed");
    assert_eq!(order["user_id"], user.id.as_i32());
    assert_eq!(order["payment_intent_id"], "pi_test_1");
    assert_eq!(order["shipping_address"]["email"], "grace@example.com");
    assert_eq!(order["shipping_address"]["address"]["city"], "Springfield");
    assert_eq!(order["items"][0]["product_id"], mug.id.as_i32());
    assert_eq!(
        serde_json::from_value::<Price>(order["total_amount"].clone()).unwrap(),
        Price::parse("19.98").unwrap()
    );

    // Returning to the success page again must not place a second order
    let again = client
        .get(&format!("/checkout/success?session_id={session_id}"))
        .await;
    assert_eq!(again.location(), Some(location.as_str()));
    assert_eq!(ctx.store.order_count().await, 1);

    let mine: Value = client.get("/orders").await.json();
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_guest_checkout_redirects_to_landing() {
    let ctx = TestContext::new();
    let lamp = ctx.seed_product("Lamp", "45.50", "Lighting").await;
    let mut client = ctx.client();

    client.post(&format!("/cart/add/{}", lamp.id)).await;
    let session_id = start_checkout(&mut client).await;
    assert_eq!(ctx.payments.requests()[0].metadata["user_id"], "guest");
    assert!(ctx.payments.requests()[0].customer_email.is_none());

    ctx.payments.pay(&session_id);
    let success = client
        .get(&format!("/checkout/success?session_id={session_id}"))
        .await;
    let location = success.location().unwrap();
    assert!(location.starts_with("/?order_placed="), "{location}");

    let order_id: OrderId = location.trim_start_matches("/?order_placed=").parse().unwrap();
    let order = OrderStore::get_by_id(ctx.store.as_ref(), order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.user_id, None);
    assert_eq!(order.shipping_address.email, "guest@example.com");
    assert_eq!(order.shipping_address.shipping_method, "Standard Shipping");
    assert_eq!(cart_count(&mut client).await, 0);

    let landing: Value = client.get(location).await.json();
    let notice = landing["notice"].as_str().unwrap();
    assert!(notice.contains(&format!("order {order_id} ")), "{notice}");
    assert!(landing["products"].is_array());
}

#[tokio::test]
async fn test_unpaid_session_keeps_the_cart() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    let mut client = ctx.client();

    client.post(&format!("/cart/add/{}", mug.id)).await;
    let session_id = start_checkout(&mut client).await;

    let success = client
        .get(&format!("/checkout/success?session_id={session_id}"))
        .await;
    assert_eq!(success.location(), Some("/cart?error=payment_incomplete"));
    assert_eq!(ctx.store.order_count().await, 0);

    let cart: Value = client.get("/cart?error=payment_incomplete").await.json();
    assert_eq!(cart["item_count"], 1);
    assert!(cart["notice"].as_str().unwrap().contains("no order was placed"));
}

#[tokio::test]
async fn test_line_items_are_listed_when_not_embedded() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    let mut client = ctx.client();

    client.post(&format!("/cart/add/{}", mug.id)).await;
    let session_id = start_checkout(&mut client).await;
    ctx.payments.pay(&session_id);
    ctx.payments.strip_line_items(&session_id);

    client
        .get(&format!("/checkout/success?session_id={session_id}"))
        .await;

    let orders = OrderStore::list_all(ctx.store.as_ref()).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].items[0].name, "Mug");
    assert_eq!(orders[0].items[0].product_id, Some(mug.id));
}

#[tokio::test]
async fn test_paged_line_items_are_all_recorded() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "5.00", "Kitchen").await;
    let teapot = ctx.seed_product("Teapot", "5.00", "Kitchen").await;
    let mut client = ctx.client();

    client.post(&format!("/cart/add/{}", mug.id)).await;
    client.post(&format!("/cart/add/{}", teapot.id)).await;
    let session_id = start_checkout(&mut client).await;
    ctx.payments.pay(&session_id);
    ctx.payments.truncate_line_items(&session_id, 1);

    client
        .get(&format!("/checkout/success?session_id={session_id}"))
        .await;

    let orders = OrderStore::list_all(ctx.store.as_ref()).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].items.len(), 2);
    assert_eq!(orders[0].total_amount, Price::parse("10.00").unwrap());
}

#[tokio::test]
async fn test_checkout_rejects_empty_cart() {
    let ctx = TestContext::new();
    let mut client = ctx.client();

    let response = client.post("/checkout/create-session").await;
    assert_eq!(response.status, 400);
    assert!(ctx.payments.requests().is_empty());
}

#[tokio::test]
async fn test_provider_outage_surfaces_as_bad_gateway() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    let mut client = ctx.client();
    client.post(&format!("/cart/add/{}", mug.id)).await;

    ctx.payments.set_unavailable(true);
    let response = client.post("/checkout/create-session").await;
    assert_eq!(response.status, 502);
    assert_eq!(cart_count(&mut client).await, 1);
}

#[tokio::test]
async fn test_return_without_or_with_unknown_session() {
    let ctx = TestContext::new();
    let mut client = ctx.client();

    let missing = client.get("/checkout/success").await;
    assert_eq!(missing.location(), Some("/cart?error=missing_session"));

    let blank = client.get("/checkout/success?session_id=%20").await;
    assert_eq!(blank.location(), Some("/cart?error=missing_session"));

    let unknown = client.get("/checkout/success?session_id=cs_test_404").await;
    assert_eq!(
        unknown.location(),
        Some("/cart?error=payment_unverified&reference=cs_test_404")
    );

    let cart: Value = client
        .get(unknown.location().unwrap())
        .await
        .json();
    assert!(cart["notice"].as_str().unwrap().contains("cs_test_404"));
}

#[tokio::test]
async fn test_cancel_returns_to_cart() {
    let ctx = TestContext::new();
    let mut client = ctx.client();

    let cancel = client.get("/checkout/cancel").await;
    assert_eq!(cancel.location(), Some("/cart?error=checkout_canceled"));

    let cart: Value = client.get("/cart?error=checkout_canceled").await.json();
    assert_eq!(cart["notice"], "Checkout was canceled. Your cart has been kept.");
}

#[tokio::test]
async fn test_orders_are_private_to_their_owner() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    ctx.seed_user("Grace", "grace@example.com").await;
    ctx.seed_user("Alan", "alan@example.com").await;
    ctx.seed_admin("Root", "root@example.com").await;

    let mut grace = ctx.signed_in("grace@example.com").await;
    grace.post(&format!("/cart/add/{}", mug.id)).await;
    let session_id = start_checkout(&mut grace).await;
    ctx.payments.pay(&session_id);
    let placed = grace
        .get(&format!("/checkout/success?session_id={session_id}"))
        .await;
    let location = placed.location().unwrap().to_string();

    let mut alan = ctx.signed_in("alan@example.com").await;
    assert_eq!(alan.get(&location).await.status, 403);
    let alans: Value = alan.get("/orders").await.json();
    assert!(alans.as_array().unwrap().is_empty());

    let mut root = ctx.signed_in("root@example.com").await;
    assert_eq!(root.get(&location).await.status, 200);
    assert_eq!(root.get("/order/999").await.status, 404);
}

/// Reads from memory, refuses every write.
struct ReadOnlyOrders(Arc<MemoryStore>);

#[async_trait]
impl OrderStore for ReadOnlyOrders {
    async fn create(&self, _order: &NewOrder) -> Result<Order, RepositoryError> {
        Err(RepositoryError::DataCorruption("orders table is read-only".to_string()))
    }

    async fn get_by_payment_intent(&self, id: &str) -> Result<Option<Order>, RepositoryError> {
        OrderStore::get_by_payment_intent(self.0.as_ref(), id).await
    }

    async fn get_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        OrderStore::get_for_user(self.0.as_ref(), user_id).await
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        OrderStore::get_by_id(self.0.as_ref(), id).await
    }

    async fn update_status(
        &self,
        _id: OrderId,
        _status: OrderStatus,
        _tracking_number: Option<&str>,
    ) -> Result<Order, RepositoryError> {
        Err(RepositoryError::DataCorruption("orders table is read-only".to_string()))
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        OrderStore::list_all(self.0.as_ref()).await
    }

    async fn delete(&self, _id: OrderId) -> Result<bool, RepositoryError> {
        Ok(false)
    }
}

#[tokio::test]
async fn test_paid_but_unrecorded_order_quotes_reference() {
    let ctx = TestContext::with_orders(|store| Arc::new(ReadOnlyOrders(store)));
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    let mut client = ctx.client();

    client.post(&format!("/cart/add/{}", mug.id)).await;
    let session_id = start_checkout(&mut client).await;
    ctx.payments.pay(&session_id);

    let success = client
        .get(&format!("/checkout/success?session_id={session_id}"))
        .await;
    assert_eq!(
        success.location(),
        Some("/cart?error=order_not_recorded&reference=pi_test_1")
    );

    let cart: Value = client.get(success.location().unwrap()).await.json();
    assert_eq!(cart["item_count"], 0);
    assert!(cart["notice"].as_str().unwrap().contains("pi_test_1"));
}

/// Hides the first payment-intent lookup, as if a concurrent request had
/// not yet committed its order.
struct LateCommitOrders {
    inner: Arc<MemoryStore>,
    hidden: AtomicBool,
}

#[async_trait]
impl OrderStore for LateCommitOrders {
    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        OrderStore::create(self.inner.as_ref(), order).await
    }

    async fn get_by_payment_intent(&self, id: &str) -> Result<Option<Order>, RepositoryError> {
        if !self.hidden.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        OrderStore::get_by_payment_intent(self.inner.as_ref(), id).await
    }

    async fn get_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        OrderStore::get_for_user(self.inner.as_ref(), user_id).await
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        OrderStore::get_by_id(self.inner.as_ref(), id).await
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        tracking_number: Option<&str>,
    ) -> Result<Order, RepositoryError> {
        OrderStore::update_status(self.inner.as_ref(), id, status, tracking_number).await
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        OrderStore::list_all(self.inner.as_ref()).await
    }

    async fn delete(&self, id: OrderId) -> Result<bool, RepositoryError> {
        OrderStore::delete(self.inner.as_ref(), id).await
    }
}

#[tokio::test]
async fn test_losing_the_insert_race_reports_existing_order() {
    let ctx = TestContext::with_orders(|store| {
        Arc::new(LateCommitOrders {
            inner: store,
            hidden: AtomicBool::new(false),
        })
    });
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    let mut client = ctx.client();

    client.post(&format!("/cart/add/{}", mug.id)).await;
    let session_id = start_checkout(&mut client).await;
    ctx.payments.pay(&session_id);

    // The winning request already stored the order for this payment
    let session = ctx.payments.session(&session_id).unwrap();
    let winner = OrderStore::create(
        ctx.store.as_ref(),
        &NewOrder::new(
            None,
            vec![OrderItem {
                product_id: Some(mug.id),
                name: "Mug".to_string(),
                price: Price::parse("9.99").unwrap(),
                quantity: 1,
            }],
            session.payment_intent_id().unwrap().to_string(),
            ShippingAddress::default(),
        ),
    )
    .await
    .unwrap();

    let success = client
        .get(&format!("/checkout/success?session_id={session_id}"))
        .await;
    assert_eq!(
        success.location(),
        Some(format!("/?order_placed={}", winner.id).as_str())
    );
    assert_eq!(ctx.store.order_count().await, 1);
    assert_eq!(cart_count(&mut client).await, 0);
}
