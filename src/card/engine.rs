//! Card Resolution Engine
//!
//! Resolves a resource's cards concurrently: one task per card, results sent
//! over a channel that closes once every task has dropped its sender, and a
//! collector that places each result in the slot of the card's original
//! position. A failing card only ever affects its own slot.

use super::Card;
use crate::context::RequestContext;
use crate::error::PanelError;
use crate::notification::{CardFailure, FailureSink};
use crate::store::DataProvider;
use anyhow::anyhow;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

/// Reported for a slot whose task ended without sending a result
const INCOMPLETE: &str = "card resolution did not complete";

/// Fan-out limits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardSettings {
    /// Maximum cards resolving at once; unbounded when `None`
    pub concurrency: Option<usize>,
    /// Per-card deadline; a card exceeding it fails on its own
    pub timeout: Option<Duration>,
}

/// The outcome of one card, tied to its position
#[derive(Debug, Clone, PartialEq)]
pub struct CardResult {
    pub index: usize,
    pub metadata: Map<String, Value>,
    pub outcome: Result<Value, String>,
}

impl CardResult {
    /// `{ ...metadata, "index", "data" | "error" }`
    pub fn into_value(self) -> Value {
        let mut map = self.metadata;
        map.insert("index".to_string(), json!(self.index));
        match self.outcome {
            Ok(data) => map.insert("data".to_string(), data),
            Err(message) => map.insert("error".to_string(), json!(message)),
        };
        Value::Object(map)
    }
}

async fn run_card(
    card: &dyn Card,
    ctx: &RequestContext,
    store: &dyn DataProvider,
    timeout: Option<Duration>,
) -> Result<Value, String> {
    let resolution = card.resolve(ctx, store);
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, resolution).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!("timed out after {}ms", limit.as_millis())),
        },
        None => resolution.await,
    };
    result.map_err(|err| format!("{:#}", err))
}

fn report(sink: &dyn FailureSink, ctx: &RequestContext, card: &dyn Card, index: usize, message: &str) {
    sink.card_failed(&CardFailure {
        request_id: ctx.request_id,
        resource: ctx.resource.clone(),
        card: card.name().to_string(),
        index,
        message: message.to_string(),
    });
}

/// Resolve every card, returning results in input order
pub async fn resolve_all(
    ctx: &RequestContext,
    cards: &[Arc<dyn Card>],
    store: Arc<dyn DataProvider>,
    settings: &CardSettings,
    sink: &dyn FailureSink,
) -> Vec<CardResult> {
    if cards.is_empty() {
        return Vec::new();
    }

    let (tx, mut rx) = mpsc::channel(cards.len());
    let limiter = settings
        .concurrency
        .map(|permits| Arc::new(Semaphore::new(permits.clamp(1, Semaphore::MAX_PERMITS))));

    for (index, card) in cards.iter().enumerate() {
        let tx = tx.clone();
        let card = Arc::clone(card);
        let store = Arc::clone(&store);
        let ctx = ctx.clone();
        let limiter = limiter.clone();
        let timeout = settings.timeout;

        tokio::spawn(async move {
            let _permit = match limiter {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };
            let outcome = run_card(card.as_ref(), &ctx, store.as_ref(), timeout).await;
            // receiver gone means the request was dropped; nothing to deliver to
            let _ = tx.send((index, outcome)).await;
        });
    }
    drop(tx);

    let mut slots: Vec<Option<Result<Value, String>>> = vec![None; cards.len()];
    while let Some((index, outcome)) = rx.recv().await {
        slots[index] = Some(outcome);
    }

    tracing::debug!(
        resource = %ctx.resource,
        request_id = %ctx.request_id,
        count = cards.len(),
        "resolved cards"
    );

    cards
        .iter()
        .zip(slots)
        .enumerate()
        .map(|(index, (card, slot))| {
            let outcome = slot.unwrap_or_else(|| Err(INCOMPLETE.to_string()));
            if let Err(ref message) = outcome {
                report(sink, ctx, card.as_ref(), index, message);
            }
            CardResult {
                index,
                metadata: card.metadata(),
                outcome,
            }
        })
        .collect()
}

/// Parse a card index, accepting only `0 <= index < len`
pub fn parse_card_index(raw: &str, len: usize) -> Option<usize> {
    let index: i64 = raw.trim().parse().ok()?;
    usize::try_from(index).ok().filter(|i| *i < len)
}

/// Resolve a single card in place and return its payload
pub async fn resolve_one(
    ctx: &RequestContext,
    cards: &[Arc<dyn Card>],
    raw_index: &str,
    store: &dyn DataProvider,
    settings: &CardSettings,
    sink: &dyn FailureSink,
) -> Result<Value, PanelError> {
    let Some(index) = parse_card_index(raw_index, cards.len()) else {
        return Err(PanelError::not_found("Card"));
    };
    let card = cards[index].as_ref();

    run_card(card, ctx, store, settings.timeout)
        .await
        .map_err(|message| {
            report(sink, ctx, card, index, &message);
            PanelError::Card(message)
        })
}
