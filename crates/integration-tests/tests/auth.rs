//! Signup, login, and signout over the full router.

#![allow(clippy::unwrap_used)]

use serde_json::Value;

use emporium_integration_tests::{PASSWORD, TestContext};

#[tokio::test]
async fn test_signup_starts_a_session() {
    let ctx = TestContext::new();
    let mut client = ctx.client();

    let response = client
        .post_form(
            "/user/signup",
            &[
                ("name", "Ada Lovelace"),
                ("email", "  Ada@Example.com "),
                ("password", PASSWORD),
            ],
        )
        .await;

    assert_eq!(response.status, 201, "{}", response.text());
    let user: Value = response.json();
    assert_eq!(user["email"], "ada@example.com");
    assert_eq!(user["is_admin"], false);
    assert!(user.get("password_hash").is_none());
    assert!(client.has_session());

    assert_eq!(client.get("/orders").await.status, 200);
    assert_eq!(client.get("/main").await.status, 200);
}

#[tokio::test]
async fn test_signup_rejects_duplicates_and_bad_input() {
    let ctx = TestContext::new();
    ctx.seed_user("Grace", "grace@example.com").await;
    let mut client = ctx.client();

    let duplicate = client
        .post_form(
            "/user/signup",
            &[
                ("name", "Grace Again"),
                ("email", "GRACE@example.com"),
                ("password", PASSWORD),
            ],
        )
        .await;
    assert_eq!(duplicate.status, 409);
    assert_eq!(duplicate.text(), "An account with this email already exists");

    let short_password = client
        .post_form(
            "/user/signup",
            &[("name", "Linus"), ("email", "linus@example.com"), ("password", "short")],
        )
        .await;
    assert_eq!(short_password.status, 400);

    let bad_email = client
        .post_form(
            "/user/signup",
            &[("name", "Linus"), ("email", "not-an-email"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(bad_email.status, 400);
    assert!(!client.has_session());
    assert_eq!(ctx.store.user_count().await, 1);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let ctx = TestContext::new();
    ctx.seed_user("Grace", "grace@example.com").await;
    let mut client = ctx.client();

    let wrong_password = client
        .post_form(
            "/user/login",
            &[("email", "grace@example.com"), ("password", "wrong-password")],
        )
        .await;
    let unknown_email = client
        .post_form(
            "/user/login",
            &[("email", "nobody@example.com"), ("password", PASSWORD)],
        )
        .await;

    assert_eq!(wrong_password.status, 401);
    assert_eq!(unknown_email.status, 401);
    assert_eq!(wrong_password.text(), unknown_email.text());
    assert!(!client.has_session());
}

#[tokio::test]
async fn test_login_keeps_cart_and_rotates_session_id() {
    let ctx = TestContext::new();
    let product = ctx.seed_product("Teapot", "24.00", "Kitchen").await;
    ctx.seed_user("Grace", "grace@example.com").await;
    let mut client = ctx.client();

    client.post(&format!("/cart/add/{}", product.id)).await;
    let before = client.get("/cart").await;
    assert_eq!(before.json::<Value>()["item_count"], 1);

    let login = client
        .post_form(
            "/user/login",
            &[("email", "grace@example.com"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(login.status, 200);
    assert_eq!(login.json::<Value>()["name"], "Grace");
    assert!(login.header("set-cookie").is_some());

    let after = client.get("/cart").await;
    assert_eq!(after.json::<Value>()["item_count"], 1);
}

#[tokio::test]
async fn test_signout_ends_session() {
    let ctx = TestContext::new();
    ctx.seed_user("Grace", "grace@example.com").await;
    let mut client = ctx.signed_in("grace@example.com").await;

    let signout = client.get("/user/signout").await;
    assert!(signout.status.is_redirection());
    assert_eq!(signout.location(), Some("/"));

    let orders = client.get("/orders").await;
    assert!(orders.status.is_redirection());
    assert_eq!(orders.location(), Some("/"));
}

#[tokio::test]
async fn test_protected_pages_redirect_anonymous_visitors() {
    let ctx = TestContext::new();
    let mut client = ctx.client();

    for path in ["/main", "/orders", "/order/1", "/admin/dashboard", "/admin/orders"] {
        let response = client.get(path).await;
        assert!(response.status.is_redirection(), "{path}: {}", response.status);
        assert_eq!(response.location(), Some("/"), "{path}");
    }
}

#[tokio::test]
async fn test_credential_attempts_are_rate_limited() {
    let ctx = TestContext::new();
    let mut client = ctx.client();
    let form = [("email", "nobody@example.com"), ("password", "wrong-password")];

    for _ in 0..5 {
        assert_eq!(client.post_form("/user/login", &form).await.status, 401);
    }
    assert_eq!(client.post_form("/user/login", &form).await.status, 429);

    // Other clients keep their own budget
    let mut other = ctx.client();
    assert_eq!(other.post_form("/user/login", &form).await.status, 401);
}
