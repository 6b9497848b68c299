//! Session cart behaviour over the full router.

#![allow(clippy::unwrap_used)]

use serde_json::Value;

use emporium_core::Price;
use emporium_integration_tests::TestContext;
use emporium_storefront::models::MAX_QUANTITY;

fn price(value: &Value) -> Price {
    serde_json::from_value(value.clone()).unwrap()
}

#[tokio::test]
async fn test_adding_twice_increments_quantity() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    let mut client = ctx.client();

    client.post(&format!("/cart/add/{}", mug.id)).await;
    let response = client.post(&format!("/cart/add/{}", mug.id)).await;

    assert_eq!(response.status, 200);
    let cart: Value = response.json();
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);
    assert_eq!(cart["lines"][0]["quantity"], 2);
    assert_eq!(price(&cart["lines"][0]["subtotal"]), Price::parse("19.98").unwrap());
    assert_eq!(price(&cart["total"]), Price::parse("19.98").unwrap());
    assert_eq!(cart["item_count"], 2);
}

#[tokio::test]
async fn test_cart_prices_lines_from_the_catalog() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    let lamp = ctx.seed_product("Lamp", "45.50", "Lighting").await;
    let mut client = ctx.client();

    client.post(&format!("/cart/add/{}", mug.id)).await;
    client.post(&format!("/cart/add/{}", lamp.id)).await;
    client
        .post_form(&format!("/cart/update/{}", lamp.id), &[("qty", "3")])
        .await;

    let cart: Value = client.get("/cart").await.json();
    assert_eq!(cart["item_count"], 4);
    assert_eq!(price(&cart["total"]), Price::parse("146.49").unwrap());
    assert!(cart["notice"].is_null());
}

#[tokio::test]
async fn test_unknown_product_is_not_added() {
    let ctx = TestContext::new();
    let mut client = ctx.client();

    assert_eq!(client.post("/cart/add/999").await.status, 404);
    assert_eq!(client.post("/cart/add/not-a-number").await.status, 404);

    let cart: Value = client.get("/cart").await.json();
    assert_eq!(cart["item_count"], 0);
}

#[tokio::test]
async fn test_invalid_quantity_leaves_cart_unchanged() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    let mut client = ctx.client();
    client.post(&format!("/cart/add/{}", mug.id)).await;

    for qty in ["two", "", "1.5"] {
        let response = client
            .post_form(&format!("/cart/update/{}", mug.id), &[("qty", qty)])
            .await;
        assert_eq!(response.status, 400, "qty {qty:?}");
    }

    let cart: Value = client.get("/cart").await.json();
    assert_eq!(cart["lines"][0]["quantity"], 1);
}

#[tokio::test]
async fn test_huge_quantities_are_capped() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    let lamp = ctx.seed_product("Lamp", "45.50", "Lighting").await;
    let mut client = ctx.client();

    for product in [mug.id, lamp.id] {
        let response = client
            .post_form(&format!("/cart/update/{product}"), &[("qty", "4294967295")])
            .await;
        assert_eq!(response.status, 200);
    }

    let cart: Value = client.get("/cart").await.json();
    assert_eq!(cart["lines"][0]["quantity"], MAX_QUANTITY);
    assert_eq!(cart["item_count"], 2 * MAX_QUANTITY);
}

#[tokio::test]
async fn test_zero_or_negative_quantity_removes_line() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    let lamp = ctx.seed_product("Lamp", "45.50", "Lighting").await;
    let mut client = ctx.client();
    client.post(&format!("/cart/add/{}", mug.id)).await;
    client.post(&format!("/cart/add/{}", lamp.id)).await;

    let after_zero: Value = client
        .post_form(&format!("/cart/update/{}", mug.id), &[("qty", "0")])
        .await
        .json();
    assert_eq!(after_zero["lines"].as_array().unwrap().len(), 1);

    let after_negative: Value = client
        .post_form(&format!("/cart/update/{}", lamp.id), &[("qty", "-2")])
        .await
        .json();
    assert_eq!(after_negative["item_count"], 0);
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    let mut client = ctx.client();
    client.post(&format!("/cart/add/{}", mug.id)).await;

    let first = client.post(&format!("/cart/remove/{}", mug.id)).await;
    let second = client.post(&format!("/cart/remove/{}", mug.id)).await;

    assert_eq!(first.status, 200);
    assert_eq!(second.status, 200);
    assert_eq!(second.json::<Value>()["item_count"], 0);
}

#[tokio::test]
async fn test_deleted_products_drop_out_of_the_cart() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    let lamp = ctx.seed_product("Lamp", "45.50", "Lighting").await;
    ctx.seed_admin("Root", "root@example.com").await;

    let mut shopper = ctx.client();
    shopper.post(&format!("/cart/add/{}", mug.id)).await;
    shopper.post(&format!("/cart/add/{}", lamp.id)).await;

    let mut admin = ctx.signed_in("root@example.com").await;
    let removed = admin.post(&format!("/admin/products/{}/remove", lamp.id)).await;
    assert!(removed.status.is_redirection());

    let cart: Value = shopper.get("/cart").await.json();
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);
    assert_eq!(cart["lines"][0]["name"], "Mug");
}

#[tokio::test]
async fn test_carts_are_per_session() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    let mut first = ctx.client();
    let mut second = ctx.client();

    first.post(&format!("/cart/add/{}", mug.id)).await;

    let cart: Value = second.get("/cart").await.json();
    assert_eq!(cart["item_count"], 0);
}
