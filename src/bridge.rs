use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt as _;
use futures::future::BoxFuture;
use log::{debug, error, info};
use serde_json::Value;
use thiserror::Error;

use crate::messages::BridgeCall;
use crate::webhook::PresenceNotifier;

pub type Handler = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("handler `{0}` is already registered")]
    AlreadyRegistered(String),
    #[error("no handler registered for `{0}`")]
    UnknownMethod(String),
    #[error("invalid params for `{method}`: {reason}")]
    InvalidParams { method: String, reason: String },
    #[error("handler `{method}` failed: {source:#}")]
    Handler {
        method: String,
        source: anyhow::Error,
    },
}

/// Named callbacks the sensor side can invoke.
#[derive(Default, Clone)]
pub struct Bridge {
    handlers: HashMap<String, Handler>,
}

impl Bridge {
    pub fn new() -> Self {
        Bridge::default()
    }

    /// Registers `handler` under `name`. A name can only be registered once;
    /// later attempts are rejected and leave the first handler in place.
    pub fn register<F, Fut>(&mut self, name: &str, handler: F) -> Result<(), BridgeError>
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        if self.handlers.contains_key(name) {
            return Err(BridgeError::AlreadyRegistered(name.to_string()));
        }
        debug!("Registering bridge handler {}", name);
        let handler: Handler = Arc::new(move |params| handler(params).boxed());
        self.handlers.insert(name.to_string(), handler);
        Ok(())
    }

    /// Exposes `notifier` as a handler taking a single distance in millimeters.
    pub fn provide_distance(
        &mut self,
        name: &str,
        notifier: PresenceNotifier,
    ) -> Result<(), BridgeError> {
        let notifier = Arc::new(notifier);
        self.register(name, move |params| {
            let notifier = notifier.clone();
            async move {
                let distance_mm = distance_param(&params)?;
                let delivered = notifier.notify(distance_mm).await?;
                Ok::<_, anyhow::Error>(Value::Bool(delivered))
            }
        })
    }

    pub async fn dispatch(&self, call: BridgeCall) -> Result<Value, BridgeError> {
        let handler = self
            .handlers
            .get(&call.method)
            .cloned()
            .ok_or_else(|| BridgeError::UnknownMethod(call.method.clone()))?;

        handler(call.params).await.map_err(|source| {
            match source.downcast::<BadParams>() {
                Ok(BadParams(reason)) => BridgeError::InvalidParams {
                    method: call.method.clone(),
                    reason,
                },
                Err(source) => BridgeError::Handler {
                    method: call.method.clone(),
                    source,
                },
            }
        })
    }

    /// Dispatches a call and logs the outcome. Handler failures stop here.
    pub async fn dispatch_logged(&self, call: BridgeCall) {
        let method = call.method.clone();
        match self.dispatch(call).await {
            Ok(result) => info!("Bridge call {} returned {}", method, result),
            Err(err) => error!("Bridge call failed: {}", err),
        }
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct BadParams(String);

fn distance_param(params: &[Value]) -> Result<u32, BadParams> {
    let [value] = params else {
        return Err(BadParams(format!(
            "expected one distance argument, got {}",
            params.len()
        )));
    };
    value
        .as_u64()
        .and_then(|mm| u32::try_from(mm).ok())
        .ok_or_else(|| BadParams(format!("distance must be a non-negative integer, got {value}")))
}
