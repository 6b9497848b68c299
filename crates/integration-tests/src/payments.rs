//! In-process payment provider.
//!
//! Sessions are created unpaid. Tests settle them with
//! [`FakePaymentProvider::pay`] before sending the shopper back.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use emporium_storefront::payments::{
    Address, CheckoutSession, CheckoutSessionRequest, Customer, CustomerDetails, Expandable,
    LineItem, LinePrice, List, PRODUCT_ID_METADATA_KEY, PaymentError, PaymentProvider,
    PaymentStatus, ProviderProduct, ShippingDetails,
};

#[derive(Default)]
struct Ledger {
    sessions: HashMap<String, CheckoutSession>,
    requests: Vec<CheckoutSessionRequest>,
    created: u32,
    unavailable: bool,
}

/// Records checkout requests and serves the sessions it created.
#[derive(Default)]
pub struct FakePaymentProvider {
    ledger: Mutex<Ledger>,
}

impl FakePaymentProvider {
    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call fail as if the provider were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.ledger().unavailable = unavailable;
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CheckoutSessionRequest> {
        self.ledger().requests.clone()
    }

    /// A created session, as the provider currently reports it.
    #[must_use]
    pub fn session(&self, id: &str) -> Option<CheckoutSession> {
        self.ledger().sessions.get(id).cloned()
    }

    /// Mark a session paid and attach the details the hosted page collects.
    ///
    /// Returns `false` for unknown sessions.
    pub fn pay(&self, id: &str) -> bool {
        let mut ledger = self.ledger();
        let Some(session) = ledger.sessions.get_mut(id) else {
            return false;
        };

        let email = session
            .customer_email
            .clone()
            .unwrap_or_else(|| "guest@example.com".to_string());
        let address = Address {
            line1: Some("1 Market Street".to_string()),
            line2: None,
            city: Some("Springfield".to_string()),
            state: Some("OR".to_string()),
            postal_code: Some("97477".to_string()),
            country: Some("US".to_string()),
        };

        session.payment_status = PaymentStatus::Paid;
        session.customer_details = Some(CustomerDetails {
            email: Some(email),
            name: Some("Test Shopper".to_string()),
            phone: Some("555-0100".to_string()),
            address: Some(address.clone()),
        });
        session.shipping_details = Some(ShippingDetails {
            name: Some("Test Shopper".to_string()),
            phone: None,
            address: Some(address),
        });
        true
    }

    /// Drop the embedded line items so the storefront has to list them.
    pub fn strip_line_items(&self, id: &str) {
        if let Some(session) = self.ledger().sessions.get_mut(id) {
            session.line_items = None;
        }
    }

    /// Embed only the first `keep` line items and flag the list as paged.
    pub fn truncate_line_items(&self, id: &str, keep: usize) {
        if let Some(list) = self
            .ledger()
            .sessions
            .get_mut(id)
            .and_then(|session| session.line_items.as_mut())
        {
            list.data.truncate(keep);
            list.has_more = true;
        }
    }

    fn check_available(&self) -> Result<(), PaymentError> {
        if self.ledger().unavailable {
            return Err(PaymentError::Api {
                status: 503,
                message: "payment provider unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(id: &str) -> PaymentError {
        PaymentError::Api {
            status: 404,
            message: format!("No such checkout session: '{id}'"),
        }
    }
}

fn line_items(n: u32, request: &CheckoutSessionRequest) -> Vec<LineItem> {
    request
        .line_items
        .iter()
        .enumerate()
        .map(|(i, item)| LineItem {
            id: format!("li_test_{n}_{i}"),
            description: Some(item.name.clone()),
            quantity: Some(item.quantity),
            amount_total: item.unit_amount * i64::from(item.quantity),
            price: Some(LinePrice {
                id: format!("price_test_{n}_{i}"),
                unit_amount: Some(item.unit_amount),
                currency: Some(item.currency.clone()),
                product: Some(Expandable::Object(Box::new(ProviderProduct {
                    id: format!("prod_test_{n}_{i}"),
                    name: item.name.clone(),
                    metadata: HashMap::from([(
                        PRODUCT_ID_METADATA_KEY.to_string(),
                        item.product_id.to_string(),
                    )]),
                }))),
            }),
        })
        .collect()
}

#[async_trait]
impl PaymentProvider for FakePaymentProvider {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.check_available()?;
        let mut ledger = self.ledger();
        ledger.created += 1;
        let n = ledger.created;

        let items = line_items(n, request);
        let id = format!("cs_test_{n}");
        let session = CheckoutSession {
            id: id.clone(),
            url: Some(format!("https://checkout.test/pay/{id}")),
            payment_status: PaymentStatus::Unpaid,
            payment_intent: Some(Expandable::Id(format!("pi_test_{n}"))),
            customer: None,
            customer_email: request.customer_email.clone(),
            customer_details: None,
            shipping_details: None,
            amount_total: Some(items.iter().map(|item| item.amount_total).sum()),
            line_items: Some(List {
                data: items,
                has_more: false,
            }),
            metadata: request
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };

        ledger.requests.push(request.clone());
        ledger.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, PaymentError> {
        self.check_available()?;
        self.session(id).ok_or_else(|| Self::not_found(id))
    }

    async fn list_line_items(&self, session_id: &str) -> Result<Vec<LineItem>, PaymentError> {
        self.check_available()?;
        let ledger = self.ledger();
        let n = session_id
            .strip_prefix("cs_test_")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| Self::not_found(session_id))?;
        let request = ledger
            .requests
            .get(n - 1)
            .ok_or_else(|| Self::not_found(session_id))?;
        Ok(line_items(u32::try_from(n).unwrap_or_default(), request))
    }

    async fn retrieve_customer(&self, id: &str) -> Result<Customer, PaymentError> {
        self.check_available()?;
        Err(PaymentError::Api {
            status: 404,
            message: format!("No such customer: '{id}'"),
        })
    }
}
