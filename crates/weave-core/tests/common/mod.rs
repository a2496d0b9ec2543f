//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use weave_core::{
    Advice, FnTarget, Method, MethodRef, TargetHandle, Throwable, TypeDescriptor, TypeRef, Value,
};

/// `FileStore : BaseStore, IStore`
pub fn store_type() -> TypeRef {
    TypeDescriptor::new("FileStore")
        .with_supertype("BaseStore")
        .with_interface("IStore")
        .into_ref()
}

pub fn method(name: &'static str) -> MethodRef {
    Method::new("IStore", name).with_parameters(["key"]).into_ref()
}

/// Target that counts calls and echoes `<method>:<first arg>`
pub struct EchoTarget {
    pub calls: Arc<AtomicUsize>,
    pub handle: TargetHandle,
}

impl EchoTarget {
    pub fn new() -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handle: TargetHandle = Arc::new(FnTarget::new(move |method, args| {
            counter.fetch_add(1, Ordering::SeqCst);
            let arg = match args.first() {
                Some(Value::Str(s)) => s.to_string(),
                Some(Value::Int(i)) => i.to_string(),
                _ => String::new(),
            };
            Ok(Value::from(format!("{}:{}", method.name(), arg)))
        }));
        EchoTarget { calls, handle }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Target that always fails with `error`
pub fn failing_target<F>(error: F) -> TargetHandle
where
    F: Fn() -> Throwable + Send + Sync + 'static,
{
    Arc::new(FnTarget::new(move |_, _| Err(error())))
}

/// Shared event log
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Around advice recording entry and exit under `name`
    pub fn tracer(&self, name: &'static str) -> Advice {
        let journal = self.clone();
        Advice::around_fn(move |inv| {
            journal.push(format!("enter {}", name));
            let result = inv.proceed();
            journal.push(format!("exit {}", name));
            result
        })
    }
}
