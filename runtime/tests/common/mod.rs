//! Requests shared by the integration tests.

#![allow(dead_code)]

use request_pipeline_core::{
    CacheOptions, Cacheable, Idempotent, InvalidatesCache, Outcome, Request, RequestKind,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: u64,
    pub sku: String,
}

/// Idempotent command that also invalidates the `orders` cache tag.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub sku: String,
    pub ttl: Option<Duration>,
}

impl PlaceOrder {
    pub fn new(sku: &str) -> Self {
        Self {
            sku: sku.to_string(),
            ttl: None,
        }
    }
}

impl Idempotent for PlaceOrder {
    fn idempotency_ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

impl InvalidatesCache for PlaceOrder {
    fn invalidation_tags(&self) -> Vec<String> {
        vec!["orders".to_string()]
    }
}

impl Request for PlaceOrder {
    type Response = OrderReceipt;
    const KIND: RequestKind = RequestKind::Command;

    fn as_idempotent(&self) -> Option<&dyn Idempotent> {
        Some(self)
    }

    fn as_cache_invalidating(&self) -> Option<&dyn InvalidatesCache> {
        Some(self)
    }
}

/// Idempotent command sharing keys with [`PlaceOrder`] but not its type.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub order_id: u64,
}

impl Idempotent for CancelOrder {}

impl Request for CancelOrder {
    type Response = ();
    const KIND: RequestKind = RequestKind::Command;

    fn as_idempotent(&self) -> Option<&dyn Idempotent> {
        Some(self)
    }
}

/// Cacheable query.
#[derive(Debug, Clone)]
pub struct GetOrder {
    pub id: u64,
}

impl Cacheable for GetOrder {
    fn cache_key(&self) -> String {
        format!("order:{}", self.id)
    }

    fn cache_options(&self) -> CacheOptions {
        CacheOptions::new(Duration::from_secs(60)).with_tag("orders")
    }
}

impl Request for GetOrder {
    type Response = OrderReceipt;
    const KIND: RequestKind = RequestKind::Query;

    fn as_cacheable(&self) -> Option<&dyn Cacheable> {
        Some(self)
    }
}

/// Cacheable query whose key may be blank.
#[derive(Debug, Clone)]
pub struct SearchOrders {
    pub term: String,
}

impl Cacheable for SearchOrders {
    fn cache_key(&self) -> String {
        self.term.clone()
    }
}

impl Request for SearchOrders {
    type Response = Vec<u64>;
    const KIND: RequestKind = RequestKind::Query;

    fn as_cacheable(&self) -> Option<&dyn Cacheable> {
        Some(self)
    }
}

/// Cacheable query whose response is itself an outcome.
#[derive(Debug, Clone)]
pub struct GetNested;

impl Cacheable for GetNested {
    fn cache_key(&self) -> String {
        "nested".to_string()
    }
}

impl Request for GetNested {
    type Response = Outcome<u32>;
    const KIND: RequestKind = RequestKind::Query;
    const RESPONSE_IS_OUTCOME: bool = true;

    fn as_cacheable(&self) -> Option<&dyn Cacheable> {
        Some(self)
    }
}

/// Command invalidating an arbitrary tag list.
#[derive(Debug, Clone)]
pub struct ArchiveOrders {
    pub tags: Vec<String>,
}

impl InvalidatesCache for ArchiveOrders {
    fn invalidation_tags(&self) -> Vec<String> {
        self.tags.clone()
    }
}

impl Request for ArchiveOrders {
    type Response = ();
    const KIND: RequestKind = RequestKind::Command;

    fn as_cache_invalidating(&self) -> Option<&dyn InvalidatesCache> {
        Some(self)
    }
}

/// Command opting out of transactions.
#[derive(Debug, Clone)]
pub struct RecordAudit;

impl Request for RecordAudit {
    type Response = ();
    const KIND: RequestKind = RequestKind::Command;

    fn is_transactional(&self) -> bool {
        false
    }
}

/// Command with customer fields for validation tests.
#[derive(Debug, Clone)]
pub struct RegisterCustomer {
    pub name: String,
    pub email: String,
}

impl Request for RegisterCustomer {
    type Response = u64;
    const KIND: RequestKind = RequestKind::Command;
}

pub fn receipt(order_id: u64, sku: &str) -> OrderReceipt {
    OrderReceipt {
        order_id,
        sku: sku.to_string(),
    }
}
