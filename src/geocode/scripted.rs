//! Scripted geocoder for tests and offline runs
//!
//! Replays a fixed sequence of answers, one per lookup, and records every
//! query it receives. Once the script runs out every lookup is not-found.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{GeocodeError, GeocodeGateway, GeocodeLookup, GeocodeResult};

#[derive(Debug, Clone)]
pub enum ScriptedAnswer {
    Found(GeocodeResult),
    NotFound,
    Fail(String),
    /// Never answers; only a timeout ends the lookup
    Hang,
}

#[derive(Debug, Default)]
pub struct ScriptedGateway {
    answers: Mutex<VecDeque<ScriptedAnswer>>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new(answers: impl IntoIterator<Item = ScriptedAnswer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Every lookup finds `result`
    pub fn always(result: GeocodeResult, times: usize) -> Self {
        Self::new(std::iter::repeat(ScriptedAnswer::Found(result)).take(times))
    }

    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.queries.lock().await.len()
    }
}

#[async_trait]
impl GeocodeGateway for ScriptedGateway {
    async fn lookup(&self, query: &str, _timeout: Duration) -> Result<GeocodeLookup, GeocodeError> {
        self.queries.lock().await.push(query.to_string());
        let answer = self.answers.lock().await.pop_front();
        match answer {
            Some(ScriptedAnswer::Found(result)) => Ok(GeocodeLookup::Found(result)),
            Some(ScriptedAnswer::NotFound) | None => Ok(GeocodeLookup::NotFound),
            Some(ScriptedAnswer::Fail(reason)) => Err(GeocodeError::Unavailable(reason)),
            Some(ScriptedAnswer::Hang) => std::future::pending().await,
        }
    }
}
