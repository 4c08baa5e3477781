//! Fault injection for the in-memory store
//!
//! Rules are matched in insertion order against the collection and operation
//! of each call; the first match fires. A rule can be limited to a number of
//! firings, after which it is discarded.

use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use tenantload_interfaces::BackendError;

/// Store operations a rule can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    InsertOne,
    InsertMany,
    Find,
    Count,
    Aggregate,
    Ping,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::InsertOne => "insert_one",
            Operation::InsertMany => "insert_many",
            Operation::Find => "find",
            Operation::Count => "count",
            Operation::Aggregate => "aggregate",
            Operation::Ping => "ping",
        };
        f.write_str(name)
    }
}

/// What happens when a rule fires
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// Fail the call with this error
    Fail(BackendError),
    /// Stall the call, then let it proceed normally
    Delay(Duration),
}

/// A single injection rule
#[derive(Debug, Clone, PartialEq)]
pub struct FaultRule {
    collection: Option<String>,
    operation: Option<Operation>,
    fault: Fault,
    remaining: Option<u32>,
}

impl FaultRule {
    /// Fail every matching call with `error`
    pub fn fail(error: BackendError) -> Self {
        Self {
            collection: None,
            operation: None,
            fault: Fault::Fail(error),
            remaining: None,
        }
    }

    /// Delay every matching call by `delay`
    pub fn delay(delay: Duration) -> Self {
        Self {
            collection: None,
            operation: None,
            fault: Fault::Delay(delay),
            remaining: None,
        }
    }

    /// Only match calls on the collection called `name`
    pub fn on_collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    /// Only match calls of `operation`
    pub fn on_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Fire at most `n` times
    pub fn times(mut self, n: u32) -> Self {
        self.remaining = Some(n);
        self
    }

    fn applies(&self, collection: Option<&str>, operation: Operation) -> bool {
        let collection_ok = match (&self.collection, collection) {
            (None, _) => true,
            (Some(wanted), Some(actual)) => wanted == actual,
            (Some(_), None) => false,
        };
        collection_ok && self.operation.map(|op| op == operation).unwrap_or(true)
    }
}

/// Shared, mutable set of fault rules
#[derive(Debug, Default)]
pub struct FaultInjector {
    rules: Mutex<Vec<FaultRule>>,
}

impl FaultInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule after the existing ones
    pub fn inject(&self, rule: FaultRule) {
        self.rules.lock().push(rule);
    }

    /// Remove every rule
    pub fn clear(&self) {
        self.rules.lock().clear();
    }

    /// Number of rules still armed
    pub fn pending(&self) -> usize {
        self.rules.lock().len()
    }

    fn take(&self, collection: Option<&str>, operation: Operation) -> Option<Fault> {
        let mut rules = self.rules.lock();
        let index = rules
            .iter()
            .position(|rule| rule.applies(collection, operation))?;

        let fault = rules[index].fault.clone();
        if let Some(remaining) = rules[index].remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                rules.remove(index);
            }
        }
        Some(fault)
    }

    /// Apply the first matching rule to a call. Delays sleep without holding
    /// the rule lock.
    pub async fn apply(
        &self,
        collection: Option<&str>,
        operation: Operation,
    ) -> Result<(), BackendError> {
        match self.take(collection, operation) {
            None => Ok(()),
            Some(Fault::Fail(error)) => {
                debug!(collection, %operation, %error, "Injecting failure");
                Err(error)
            }
            Some(Fault::Delay(delay)) => {
                debug!(collection, %operation, ?delay, "Injecting delay");
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}
