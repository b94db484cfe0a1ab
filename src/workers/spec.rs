//! # Worker specification: how to load a worker, when, and with what input.
//!
//! A [`WorkerSpec`] is the static, immutable descriptor behind one registry
//! entry. It tells the supervisor everything about a worker *except* its
//! behavior:
//! - how to obtain its executable logic ([`LogicLoader`], always required),
//! - how to obtain auxiliary startup data ([`DataLoader`], optional),
//! - when it auto-starts ([`LoadStrategy`]),
//! - what input the live worker receives ([`InputSpec`]).
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use lazyvisor::{WorkerFn, WorkerSpec};
//!
//! let spec = WorkerSpec::new("ticker", || async {
//!     Ok(WorkerFn::boxed(|mut ctx| async move {
//!         while ctx.inbox.recv().await.is_some() {}
//!         Ok(())
//!     }))
//! })
//! .eager()
//! .with_input(json!({ "interval_ms": 250 }));
//!
//! assert_eq!(spec.id().as_ref(), "ticker");
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::error::BoxError;
use crate::workers::worker::BoxWorker;

/// Future resolved by a logic loader.
pub type LogicFuture = BoxFuture<'static, Result<BoxWorker, BoxError>>;

/// Zero-argument asynchronous operation producing a worker's executable
/// logic. Invoked once per start attempt.
pub type LogicLoader = Arc<dyn Fn() -> LogicFuture + Send + Sync>;

/// Future resolved by a data loader.
pub type DataFuture = BoxFuture<'static, Result<Value, BoxError>>;

/// Zero-argument asynchronous operation producing a worker's auxiliary
/// startup data.
pub type DataLoader = Arc<dyn Fn() -> DataFuture + Send + Sync>;

/// Predicate over the external configuration, for
/// [`LoadStrategy::Conditional`].
pub type ConfigPredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// When a worker auto-starts.
#[derive(Clone)]
pub enum LoadStrategy {
    /// Never auto-starts; started only by an explicit `start` command.
    Manual,
    /// Auto-starts once, when the supervisor initializes.
    Eager,
    /// Auto-starts when an externally supplied configuration satisfies the
    /// predicate (evaluated on every `config_available` signal).
    Conditional(ConfigPredicate),
}

impl LoadStrategy {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            LoadStrategy::Manual => "manual",
            LoadStrategy::Eager => "eager",
            LoadStrategy::Conditional(_) => "conditional",
        }
    }
}

impl fmt::Debug for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// How the live worker's input is produced.
#[derive(Clone, Default)]
pub enum InputSpec {
    /// No configured input; the worker receives `Value::Null`.
    #[default]
    None,
    /// A fixed value.
    Static(Value),
    /// Built from the loaded auxiliary data at spawn time (`None` when the
    /// spec has no data loader).
    FromData(Arc<dyn Fn(Option<&Value>) -> Value + Send + Sync>),
    /// Built from the external configuration that triggered a conditional
    /// start.
    FromConfig(Arc<dyn Fn(&Value) -> Value + Send + Sync>),
}

impl InputSpec {
    /// Resolves the input against loaded data.
    ///
    /// Returns `None` for [`InputSpec::FromConfig`]: configuration-derived
    /// input can only be computed when a configuration is at hand, which the
    /// supervisor does at conditional-start time.
    pub(crate) fn resolve(&self, data: Option<&Value>) -> Option<Value> {
        match self {
            InputSpec::None => Some(Value::Null),
            InputSpec::Static(value) => Some(value.clone()),
            InputSpec::FromData(build) => Some(build(data)),
            InputSpec::FromConfig(_) => None,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            InputSpec::None => "none",
            InputSpec::Static(_) => "static",
            InputSpec::FromData(_) => "from_data",
            InputSpec::FromConfig(_) => "from_config",
        }
    }
}

impl fmt::Debug for InputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Static descriptor for one supervised worker.
///
/// Immutable after construction; the supervisor only reads it. Ids live in a
/// single flat namespace shared across registry, status map, and live handle
/// lookup.
#[derive(Clone)]
pub struct WorkerSpec {
    id: Arc<str>,
    logic: LogicLoader,
    data: Option<DataLoader>,
    strategy: LoadStrategy,
    input: InputSpec,
}

impl WorkerSpec {
    /// Creates a descriptor with the required logic loader, strategy
    /// `Manual`, and no data loader or input.
    ///
    /// The loader closure is invoked once per start attempt and must produce
    /// a fresh worker each time.
    pub fn new<F, Fut>(id: impl Into<Arc<str>>, logic: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<BoxWorker, BoxError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            logic: Arc::new(move || logic().boxed()),
            data: None,
            strategy: LoadStrategy::Manual,
            input: InputSpec::None,
        }
    }

    /// Adds an auxiliary data loader, raced concurrently with the logic load.
    pub fn with_data<F, Fut>(mut self, data: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        self.data = Some(Arc::new(move || data().boxed()));
        self
    }

    /// Auto-start once at supervisor initialization.
    pub fn eager(mut self) -> Self {
        self.strategy = LoadStrategy::Eager;
        self
    }

    /// Auto-start when the external configuration satisfies `predicate`.
    pub fn when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.strategy = LoadStrategy::Conditional(Arc::new(predicate));
        self
    }

    /// Fixed input for the live worker.
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = InputSpec::Static(input);
        self
    }

    /// Input built from the loaded auxiliary data at spawn time.
    pub fn with_input_from_data<F>(mut self, build: F) -> Self
    where
        F: Fn(Option<&Value>) -> Value + Send + Sync + 'static,
    {
        self.input = InputSpec::FromData(Arc::new(build));
        self
    }

    /// Input built from the configuration that triggers a conditional start.
    pub fn with_input_from_config<F>(mut self, build: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.input = InputSpec::FromConfig(Arc::new(build));
        self
    }

    /// Unique worker id.
    pub fn id(&self) -> &Arc<str> {
        &self.id
    }

    /// The logic loader.
    pub fn logic(&self) -> &LogicLoader {
        &self.logic
    }

    /// The data loader, if configured.
    pub fn data(&self) -> Option<&DataLoader> {
        self.data.as_ref()
    }

    /// The loading strategy.
    pub fn strategy(&self) -> &LoadStrategy {
        &self.strategy
    }

    /// The input specification.
    pub fn input(&self) -> &InputSpec {
        &self.input
    }
}

impl fmt::Debug for WorkerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerSpec")
            .field("id", &self.id)
            .field("strategy", &self.strategy)
            .field("input", &self.input)
            .field("has_data_loader", &self.data.is_some())
            .finish()
    }
}
