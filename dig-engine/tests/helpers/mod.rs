//! Test Helper Utilities
//!
//! Mock enrichers and catalog shortcuts shared by the integration tests.

#![allow(dead_code)]

pub mod log_capture;

pub use log_capture::{capture_logs, LogCapture};

use async_trait::async_trait;
use dig_engine::{
    CatalogBuilder, Enricher, EnricherCatalog, EnricherError, EnricherInput, Enrichment, Findings,
    Parameters, SchemaRegistry, WritePolicy,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Respond = dyn Fn(&EnricherInput) -> Result<Enrichment, EnricherError> + Send + Sync;

/// Enricher answering through a closure and recording every call
pub struct ScriptedEnricher {
    name: String,
    calls: AtomicUsize,
    inputs: Mutex<Vec<EnricherInput>>,
    delay: Option<Duration>,
    respond: Box<Respond>,
}

impl ScriptedEnricher {
    pub fn new<F>(name: &str, respond: F) -> Arc<Self>
    where
        F: Fn(&EnricherInput) -> Result<Enrichment, EnricherError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
            delay: None,
            respond: Box::new(respond),
        })
    }

    /// Always propose the same findings
    pub fn returning(name: &str, findings: Findings) -> Arc<Self> {
        Self::new(name, move |_| Ok(Enrichment::found(findings.clone())))
    }

    /// Never find anything
    pub fn empty(name: &str) -> Arc<Self> {
        Self::new(name, |_| Ok(Enrichment::NotFound))
    }

    /// Always fail with a network error
    pub fn failing(name: &str) -> Arc<Self> {
        Self::new(name, |_| Err(EnricherError::Network("connection refused".into())))
    }

    /// Always report an opt-out
    pub fn opting_out(name: &str) -> Arc<Self> {
        Self::new(name, |_| Ok(Enrichment::OptedOut))
    }

    /// Sleep before answering with `findings`
    pub fn slow(name: &str, delay: Duration, findings: Findings) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
            delay: Some(delay),
            respond: Box::new(move |_| Ok(Enrichment::found(findings.clone()))),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<EnricherInput> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Enricher for ScriptedEnricher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enrich(&self, input: EnricherInput) -> Result<Enrichment, EnricherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(input.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.respond)(&input)
    }
}

/// Enricher that panics on every call
pub struct PanickingEnricher;

#[async_trait]
impl Enricher for PanickingEnricher {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn enrich(&self, _input: EnricherInput) -> Result<Enrichment, EnricherError> {
        panic!("provider exploded")
    }
}

/// Tracks the peak number of concurrent invocations
#[derive(Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

impl ConcurrencyGauge {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Enricher for ConcurrencyGauge {
    fn name(&self) -> &str {
        "concurrency-gauge"
    }

    async fn enrich(&self, _input: EnricherInput) -> Result<Enrichment, EnricherError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(Enrichment::found(Findings::new().with("jobTitle", "Gauge")))
    }
}

/// Catalog builder over the person schema
pub fn person_builder() -> CatalogBuilder {
    EnricherCatalog::builder(Arc::new(SchemaRegistry::person()))
}

/// Register a whole-record, catch-all enricher
pub fn register_catch_all(builder: &mut CatalogBuilder, trigger: &str, enricher: Arc<dyn Enricher>) {
    builder
        .register(trigger, WritePolicy::catch_all(), Parameters::WholeRecord, enricher)
        .unwrap();
}

/// Register a whole-record enricher with an explicit policy
pub fn register(
    builder: &mut CatalogBuilder,
    trigger: &str,
    policy: WritePolicy,
    enricher: Arc<dyn Enricher>,
) {
    builder
        .register(trigger, policy, Parameters::WholeRecord, enricher)
        .unwrap();
}
