//! Stripe Checkout API client.
//!
//! Requests are form encoded with Stripe's bracket notation
//! (`line_items[0][price_data][currency]=usd`) and authenticated with the
//! secret key as a bearer token.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use super::{
    CheckoutSession, CheckoutSessionRequest, Customer, LineItem, List, PRODUCT_ID_METADATA_KEY,
    PaymentError, PaymentProvider,
};
use crate::config::StripeConfig;

/// Stripe API version the types in this module are written against.
const API_VERSION: &str = "2024-06-20";

/// Expansions requested when reading a session back after payment.
const SESSION_EXPANSIONS: &[&str] = &[
    "line_items",
    "line_items.data.price.product",
    "payment_intent",
];

/// Stripe caps list pages at 100 entries.
const LINE_ITEM_PAGE_SIZE: &str = "100";

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: Url,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value, the API base is
    /// not an absolute URL, or the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| PaymentError::Parse(format!("Invalid API key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);

        // Pin the API version so response shapes match our types
        headers.insert("Stripe-Version", HeaderValue::from_static(API_VERSION));

        let api_base = Url::parse(&config.api_base)
            .map_err(|e| PaymentError::Parse(format!("Invalid API base URL: {e}")))?;
        if api_base.cannot_be_a_base() {
            return Err(PaymentError::Parse(format!(
                "Invalid API base URL: {}",
                config.api_base
            )));
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { client, api_base })
    }

    /// Build an endpoint URL from path segments. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, PaymentError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| PaymentError::Parse("API base cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// One page of a session's line items, after `starting_after` when given.
    fn line_items_url(
        &self,
        session_id: &str,
        starting_after: Option<&str>,
    ) -> Result<Url, PaymentError> {
        let mut url = self.endpoint(&["checkout", "sessions", session_id, "line_items"])?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("limit", LINE_ITEM_PAGE_SIZE)
                .append_pair("expand[]", "data.price.product");
            if let Some(id) = starting_after {
                query.append_pair("starting_after", id);
            }
        }
        Ok(url)
    }

    /// Send a request and decode a successful JSON response.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PaymentError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[instrument(skip(self, request), fields(items = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = self.endpoint(&["checkout", "sessions"])?;
        let form = checkout_form(request);

        let session: CheckoutSession = self.send(self.client.post(url).form(&form)).await?;
        tracing::info!(session_id = %session.id, "Created checkout session");
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut url = self.endpoint(&["checkout", "sessions", session_id])?;
        {
            let mut query = url.query_pairs_mut();
            for expansion in SESSION_EXPANSIONS {
                query.append_pair("expand[]", expansion);
            }
        }

        self.send(self.client.get(url)).await
    }

    #[instrument(skip(self))]
    async fn list_line_items(&self, session_id: &str) -> Result<Vec<LineItem>, PaymentError> {
        let mut items: Vec<LineItem> = Vec::new();
        loop {
            let cursor = items.last().map(|item| item.id.as_str());
            let url = self.line_items_url(session_id, cursor)?;
            let page: List<LineItem> = self.send(self.client.get(url)).await?;

            let has_more = page.has_more && !page.data.is_empty();
            items.extend(page.data);
            if !has_more {
                break;
            }
            tracing::debug!(session_id, fetched = items.len(), "Fetching next line item page");
        }
        Ok(items)
    }

    #[instrument(skip(self))]
    async fn retrieve_customer(&self, customer_id: &str) -> Result<Customer, PaymentError> {
        let url = self.endpoint(&["customers", customer_id])?;
        self.send(self.client.get(url)).await
    }
}

/// Encode a checkout request as Stripe form fields.
fn checkout_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            item.currency.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][metadata][{PRODUCT_ID_METADATA_KEY}]"),
            item.product_id.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }

    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }

    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }

    for country in &request.shipping_countries {
        form.push((
            "shipping_address_collection[allowed_countries][]".to_string(),
            country.clone(),
        ));
    }

    form
}

/// Pull the human-readable message out of a Stripe error body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match (envelope.error.message, envelope.error.kind) {
            (Some(message), _) => message,
            (None, Some(kind)) => kind,
            (None, None) => "unknown error".to_string(),
        },
        Err(_) if body.is_empty() => "empty response".to_string(),
        Err(_) => body.to_string(),
    }
}
