//! Public catalog pages and health checks.

#![allow(clippy::unwrap_used)]

use serde_json::Value;

use emporium_integration_tests::TestContext;

#[tokio::test]
async fn test_health_and_request_ids() {
    let ctx = TestContext::new();
    let mut client = ctx.client();

    let live = client.get("/health").await;
    assert_eq!(live.status, 200);
    assert_eq!(live.text(), "ok");
    assert!(live.header("x-request-id").is_some());

    let ready = client.get("/health/ready").await;
    assert_eq!(ready.status, 200);

    let traced = client
        .get_with("/health", &[("x-request-id", "edge-42")])
        .await;
    assert_eq!(traced.header("x-request-id"), Some("edge-42"));
}

#[tokio::test]
async fn test_landing_lists_products_and_categories() {
    let ctx = TestContext::new();
    ctx.seed_product("Mug", "9.99", "Kitchen").await;
    ctx.seed_admin("Root", "root@example.com").await;
    let mut admin = ctx.signed_in("root@example.com").await;
    admin
        .post_form("/admin/categories", &[("category_name", "Kitchen")])
        .await;

    let mut visitor = ctx.client();
    let landing: Value = visitor.get("/").await.json();
    assert_eq!(landing["products"].as_array().unwrap().len(), 1);
    assert_eq!(landing["categories"][0]["name"], "Kitchen");
    assert!(landing["notice"].is_null());

    let products: Value = visitor.get("/products").await.json();
    assert_eq!(products["products"][0]["name"], "Mug");
}

#[tokio::test]
async fn test_product_detail() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "9.99", "Kitchen").await;
    let mut client = ctx.client();

    let found: Value = client.get(&format!("/products/{}", mug.id)).await.json();
    assert_eq!(found["name"], "Mug");
    assert_eq!(found["category"], "Kitchen");

    assert_eq!(client.get("/products/999").await.status, 404);
    assert_eq!(client.get("/products/0").await.status, 404);
    assert_eq!(client.get("/products/mug").await.status, 404);
}

#[tokio::test]
async fn test_search() {
    let ctx = TestContext::new();
    ctx.seed_product("Blue Mug", "9.99", "Kitchen").await;
    ctx.seed_product("Desk Lamp", "45.50", "Lighting").await;
    let mut client = ctx.client();

    let results: Value = client.get("/search?q=LAMP").await.json();
    assert_eq!(results["query"], "LAMP");
    assert_eq!(results["products"].as_array().unwrap().len(), 1);
    assert_eq!(results["products"][0]["name"], "Desk Lamp");

    for uri in ["/search", "/search?q=", "/search?q=%20%20"] {
        let empty = client.get(uri).await;
        assert!(empty.status.is_redirection(), "{uri}");
        assert_eq!(empty.location(), Some("/main"), "{uri}");
    }
}

#[tokio::test]
async fn test_category_page_by_slug() {
    let ctx = TestContext::new();
    ctx.seed_product("Throw Pillow", "19.00", "Home Goods").await;
    ctx.seed_product("Mug", "9.99", "Kitchen").await;
    ctx.seed_admin("Root", "root@example.com").await;
    let mut admin = ctx.signed_in("root@example.com").await;
    admin
        .post_form("/admin/categories", &[("category_name", "Home Goods")])
        .await;

    let mut client = ctx.client();
    let page: Value = client.get("/category/home-goods").await.json();
    assert_eq!(page["category"]["name"], "Home Goods");
    assert_eq!(page["slug"], "home-goods");
    assert_eq!(page["products"].as_array().unwrap().len(), 1);
    assert_eq!(page["products"][0]["name"], "Throw Pillow");

    assert_eq!(client.get("/category/garden").await.status, 404);
}
