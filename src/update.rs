use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::{DeriveError, UpdateError};
use crate::fetch::Fetcher;
use crate::sections::{Derived, DeriverSet};
use crate::store::Store;
use crate::types::{RawContent, SectionKey, LAST_UPDATED_KEY, TIMESTAMP_FORMAT};

/// Why a section kept its previous value.
#[derive(Debug)]
pub enum SectionFailure {
    Derive(DeriveError),
    Panicked(String),
    /// The deriver returned something the document cannot hold.
    Contract(String),
    Join(String),
}

impl fmt::Display for SectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Derive(e) => write!(f, "{e}"),
            Self::Panicked(msg) => write!(f, "deriver panicked: {msg}"),
            Self::Contract(msg) => write!(f, "contract violation: {msg}"),
            Self::Join(msg) => write!(f, "deriver task failed: {msg}"),
        }
    }
}

#[derive(Debug)]
pub struct SectionFallback {
    pub key: SectionKey,
    pub failure: SectionFailure,
    /// `true` if the previous stored value was kept, `false` if the empty
    /// section shape was written instead.
    pub kept_previous: bool,
}

/// Outcome of a run that reached disk.
#[derive(Debug)]
pub struct UpdateReport {
    pub fetched: bool,
    pub degraded: Vec<SectionKey>,
    pub fallbacks: Vec<SectionFallback>,
    pub last_updated: String,
}

impl UpdateReport {
    pub fn is_degraded(&self) -> bool {
        !self.fetched || !self.degraded.is_empty() || !self.fallbacks.is_empty()
    }
}

/// Fetch, derive every section, merge into the stored document, persist.
pub struct Updater<F, S> {
    fetcher: F,
    store: S,
    derivers: DeriverSet,
}

impl<F: Fetcher, S: Store> Updater<F, S> {
    pub fn new(fetcher: F, store: S, derivers: DeriverSet) -> Self {
        Self {
            fetcher,
            store,
            derivers,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Single pass. Only a failed write fails the run.
    pub async fn update(&self) -> Result<UpdateReport, UpdateError> {
        info!("starting data update");

        let raw = self.fetcher.fetch().await;
        match &raw {
            RawContent::Body(body) => info!(bytes = body.len(), "fetched source page"),
            RawContent::Unavailable { reason } => {
                warn!(%reason, "source page unavailable, sections will be degraded");
            }
        }
        let fetched = raw.is_available();

        let mut doc = self.store.load();
        let outcomes = run_derivers(&self.derivers, Arc::new(raw)).await;

        let mut degraded = Vec::new();
        let mut fallbacks = Vec::new();
        for (key, outcome) in outcomes {
            match outcome {
                Ok(derived) => {
                    if derived.degraded {
                        warn!(section = %key, "no source data, writing empty section");
                        degraded.push(key);
                    }
                    doc.insert(key.as_str().to_string(), derived.value);
                }
                Err(failure) => {
                    // the previous value is only reused if it still meets the contract
                    let previous = doc
                        .get(key.as_str())
                        .filter(|v| check_contract(key, v).is_ok())
                        .cloned();
                    let kept_previous = previous.is_some();
                    error!(section = %key, error = %failure, kept_previous, "section derivation failed");
                    doc.insert(
                        key.as_str().to_string(),
                        previous.unwrap_or_else(|| key.empty_record()),
                    );
                    fallbacks.push(SectionFallback {
                        key,
                        failure,
                        kept_previous,
                    });
                }
            }
        }

        let last_updated = next_timestamp(doc.get(LAST_UPDATED_KEY), Local::now());
        doc.insert(LAST_UPDATED_KEY.to_string(), Value::String(last_updated.clone()));

        if let Err(e) = self.store.save(&doc) {
            error!(error = %e, "failed to write data document");
            return Err(UpdateError::Persist(e));
        }
        info!(
            sections = SectionKey::ALL.len(),
            degraded = degraded.len(),
            fallbacks = fallbacks.len(),
            "✅ data document written"
        );
        info!(%last_updated, "update complete");

        Ok(UpdateReport {
            fetched,
            degraded,
            fallbacks,
            last_updated,
        })
    }
}

type Outcome = Result<Derived, SectionFailure>;

/// Every deriver on its own blocking task. A panic only takes down its own
/// task and comes back as [`SectionFailure::Panicked`].
async fn run_derivers(derivers: &DeriverSet, raw: Arc<RawContent>) -> Vec<(SectionKey, Outcome)> {
    let handles: Vec<_> = derivers
        .iter()
        .map(|(key, deriver)| {
            let deriver = Arc::clone(deriver);
            let raw = Arc::clone(&raw);
            (key, tokio::task::spawn_blocking(move || deriver.derive(&raw)))
        })
        .collect();

    let mut out = Vec::with_capacity(handles.len());
    for (key, handle) in handles {
        let outcome = match handle.await {
            Ok(Ok(derived)) => check_contract(key, &derived.value).map(|()| derived),
            Ok(Err(e)) => Err(SectionFailure::Derive(e)),
            Err(e) if e.is_panic() => Err(SectionFailure::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(SectionFailure::Join(e.to_string())),
        };
        out.push((key, outcome));
    }
    out
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Section values must be arrays or objects, and every percentage field the
/// section declares must be an integer in `0..=100`.
fn check_contract(key: SectionKey, value: &Value) -> Result<(), SectionFailure> {
    if !(value.is_array() || value.is_object()) {
        return Err(SectionFailure::Contract(format!(
            "section value must be an array or object, got {value}"
        )));
    }
    check_percents(key.percent_fields(), value).map_err(SectionFailure::Contract)
}

fn check_percents(fields: &[&str], value: &Value) -> Result<(), String> {
    match value {
        Value::Array(items) => items.iter().try_for_each(|v| check_percents(fields, v)),
        Value::Object(map) => map.iter().try_for_each(|(name, v)| {
            if fields.contains(&name.as_str()) {
                match v.as_u64() {
                    Some(n) if n <= 100 => {}
                    _ => return Err(format!("{name} = {v} is not a percentage")),
                }
            }
            check_percents(fields, v)
        }),
        _ => Ok(()),
    }
}

/// Current local time, unless the stored timestamp is later (clock went
/// backwards); the published value never decreases.
fn next_timestamp<Tz: TimeZone>(previous: Option<&Value>, now: DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    let now_naive = now.naive_local();
    let prev = previous
        .and_then(Value::as_str)
        .and_then(|s| NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok());
    match prev {
        Some(p) if p > now_naive => p.format(TIMESTAMP_FORMAT).to_string(),
        _ => now.format(TIMESTAMP_FORMAT).to_string(),
    }
}
