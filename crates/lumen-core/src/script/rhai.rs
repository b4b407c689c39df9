//! Rhai-backed script evaluator.
//!
//! The one concrete [`Evaluator`]. Scripts run against a persistent scope
//! so top-level state survives between the body and the init/exit hook
//! expressions; [`Evaluator::collect_garbage`] clears that scope on
//! teardown.

use std::sync::Mutex;

use rhai::{Dynamic, Engine, Scope};

use super::{EvalResult, Evaluator};

/// Script evaluator running on a [`rhai::Engine`].
pub struct RhaiEvaluator {
    engine: Engine,
    scope: Mutex<Scope<'static>>,
}

impl Default for RhaiEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl RhaiEvaluator {
    /// Evaluator with a stock engine.
    pub fn new() -> Self {
        Self::with_engine(Engine::new())
    }

    /// Evaluator with a caller-prepared engine. Register host functions on
    /// the engine before handing it over; the engine is not accessible
    /// afterwards.
    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine,
            scope: Mutex::new(Scope::new()),
        }
    }
}

impl Evaluator for RhaiEvaluator {
    fn evaluate(&self, source: &[u8]) -> EvalResult {
        let source = String::from_utf8_lossy(source);
        let mut scope = self.scope.lock().expect("scope lock poisoned");

        self.engine
            .eval_with_scope::<Dynamic>(&mut scope, &source)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn evaluate_expression(&self, expression: &str) -> EvalResult {
        let mut scope = self.scope.lock().expect("scope lock poisoned");

        self.engine
            .eval_with_scope::<Dynamic>(&mut scope, expression)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn collect_garbage(&self) {
        let mut scope = self.scope.lock().expect("scope lock poisoned");
        log::debug!("Clearing script scope, {} variable(s)", scope.len());
        scope.clear();
    }
}
