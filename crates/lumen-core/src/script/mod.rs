//! Script resources and the reload/rollback controller.
//!
//! A [`Script`] wraps a [`Resource`] and drives it through the reload
//! state machine: detect change, read a new pending version, hand it to
//! the evaluator for activation, and on failure fall back to the previous
//! committed version. The controller only depends on the [`Evaluator`]
//! capability interface; [`rhai::RhaiEvaluator`] is the concrete engine.
//!
//! # Reload lifecycle
//!
//! ```text
//! Idle ── load() ──▶ Loading ──▶ Activating ──▶ Committed ──▶ Idle
//!                       │            │
//!                       │            └─ failure ─▶ RollingBack ─▶ Idle
//!                       └─ read failure: previous version untouched
//! ```
//!
//! Rollback re-activates the previous history entry instead of re-reading
//! the file, so the consumer returns to exactly the bytes that last
//! succeeded, not to a possibly-still-broken disk state. Rollback happens
//! at most once per attempt; a failure during rollback is a hard error.

pub mod rhai;

use std::sync::Arc;

use crate::assets::AssetStore;
use crate::config::Settings;
use crate::diff::DiffRunner;
use crate::error::{ResourceError, Result};
use crate::resource::{Resource, ResourceScope};

/// File extension accepted by the script evaluator.
pub const SCRIPT_EXTENSION: &str = "rhai";

/// Result type for evaluator calls. The controller never inspects why an
/// evaluation failed; the message is only logged and carried into errors.
pub type EvalResult = std::result::Result<(), String>;

/// Capability interface of the script evaluator.
pub trait Evaluator: Send + Sync {
    /// Parse and execute a full script body.
    fn evaluate(&self, source: &[u8]) -> EvalResult;

    /// Evaluate a single expression, used for init/exit hooks.
    fn evaluate_expression(&self, expression: &str) -> EvalResult;

    /// Reclaim evaluator-side state on teardown.
    fn collect_garbage(&self);
}

/// What a reload attempt did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Fresh content was activated and committed.
    Loaded,
    /// Nothing new on disk (or the content can never change).
    Unchanged,
    /// The new content failed activation; the previous version is active
    /// again.
    RolledBack,
}

/// A reloadable script resource.
pub struct Script {
    resource: Resource,
    evaluator: Arc<dyn Evaluator>,
    diff: Option<DiffRunner>,
    init_call: String,
    exit_call: String,
    init_class_call: String,
    exit_class_call: String,
    initialized: bool,
    error: bool,
}

impl Script {
    /// Wrap an already resolved resource.
    pub fn new(resource: Resource, evaluator: Arc<dyn Evaluator>, settings: &Settings) -> Self {
        let diff = settings
            .diff_enabled
            .then(|| DiffRunner::new(settings.diff_command.clone()));

        Self {
            resource,
            evaluator,
            diff,
            init_call: String::new(),
            exit_call: String::new(),
            init_class_call: String::new(),
            exit_class_call: String::new(),
            initialized: false,
            error: false,
        }
    }

    /// Resolve a logical path and wrap it in one step.
    pub fn from_path(
        logical_path: impl Into<String>,
        evaluator: Arc<dyn Evaluator>,
        settings: &Settings,
        assets: &AssetStore,
    ) -> Self {
        let resource = Resource::resolve(logical_path, settings, assets);
        Self::new(resource, evaluator, settings)
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn resource_mut(&mut self) -> &mut Resource {
        &mut self.resource
    }

    /// Whether the last load attempt failed.
    pub fn has_error(&self) -> bool {
        self.error
    }

    /// Expression evaluated before the script body on every activation.
    pub fn set_init_class_call(&mut self, eval: impl Into<String>) {
        self.init_class_call = eval.into();
    }

    /// Expression evaluated after the script body on every activation.
    pub fn set_init_call(&mut self, eval: impl Into<String>) {
        self.init_call = eval.into();
    }

    /// Expression evaluated first on teardown.
    pub fn set_exit_call(&mut self, eval: impl Into<String>) {
        self.exit_call = eval.into();
    }

    /// Expression evaluated last on teardown, before garbage collection.
    pub fn set_exit_class_call(&mut self, eval: impl Into<String>) {
        self.exit_class_call = eval.into();
    }

    /// Only files with the evaluator's extension can be activated.
    pub fn is_supported(&self) -> bool {
        self.resource.extension().as_deref() == Some(SCRIPT_EXTENSION)
    }

    /// Reload if the backing file has changed.
    ///
    /// A handle that was never loaded proceeds unconditionally. A loaded
    /// mutable handle first consults the stability check, which may block
    /// for grace-period steps while a write settles; call this from a
    /// coarse polling tick, not a per-frame path. Immutable handles load
    /// once and are `Unchanged` forever after.
    pub fn load(&mut self) -> Result<LoadOutcome> {
        if self.resource.is_loaded() {
            match self.resource.scope() {
                ResourceScope::Immutable => return Ok(LoadOutcome::Unchanged),
                ResourceScope::Mutable => {
                    if !self.resource.is_modified() {
                        return Ok(LoadOutcome::Unchanged);
                    }
                }
            }
        }

        self.reload()
    }

    /// Reload without consulting the stability check. Immutable handles
    /// still never load twice.
    pub fn force_load(&mut self) -> Result<LoadOutcome> {
        if self.resource.is_loaded() && self.resource.scope() == ResourceScope::Immutable {
            return Ok(LoadOutcome::Unchanged);
        }

        self.reload()
    }

    fn reload(&mut self) -> Result<LoadOutcome> {
        self.error = true;

        // Captured at load start so an edit racing activation is detected
        // on the next poll. Stamped up front: a failed attempt must not
        // retrigger on every poll, the next reload waits for a fresh edit.
        let modified_at = self.resource.last_modified();
        self.resource.stamp_load_time(modified_at);

        if self.resource.exists() && !self.resource.is_file() {
            log::error!("Not a file. file:'{}'", self.resource.resolved_path().display());
            return Err(ResourceError::NotAFile(
                self.resource.resolved_path().to_path_buf(),
            ));
        }

        if !self.is_supported() {
            log::error!(
                "File type not supported. file:'{}'",
                self.resource.resolved_path().display()
            );
            return Err(ResourceError::Unsupported(
                self.resource.resolved_path().to_path_buf(),
            ));
        }

        self.resource.load_raw().inspect_err(|_| {
            log::error!(
                "Could not load file. file:'{}'",
                self.resource.resolved_path().display()
            );
        })?;

        match self.activate() {
            Ok(()) => {
                self.error = false;
                if self.resource.scope() == ResourceScope::Immutable {
                    log::debug!("Loaded script. file:'{}'", self.resource.resolved_path().display());
                } else {
                    log::info!("Loaded script. file:'{}'", self.resource.resolved_path().display());
                }
                Ok(LoadOutcome::Loaded)
            }
            Err(message) => {
                log::error!(
                    "Script activation failed. file:'{}': {}",
                    self.resource.resolved_path().display(),
                    message
                );
                self.run_diff();
                self.roll_back(message)
            }
        }
    }

    /// Activation: teardown of the previous instance, then the class-init
    /// hook, the script body and the init hook. Each sub-phase can fail
    /// independently.
    fn activate(&mut self) -> EvalResult {
        if self.initialized {
            self.free();
        }

        if !self.init_class_call.is_empty() {
            self.evaluator.evaluate_expression(&self.init_class_call)?;
        }

        let source = match self.resource.data() {
            Some(data) => data.clone(),
            None => return Err("no content loaded".to_string()),
        };
        self.evaluator.evaluate(&source)?;

        if !self.init_call.is_empty() {
            self.evaluator.evaluate_expression(&self.init_call)?;
        }

        self.initialized = true;
        Ok(())
    }

    /// Discard the failed pending version and re-activate the previous
    /// committed one from history, never from disk. At most one level: a
    /// failure here is returned as a hard error, not retried.
    fn roll_back(&mut self, cause: String) -> Result<LoadOutcome> {
        let has_previous = self.resource.history().len() > 1;

        // broken content is never retained
        self.resource.history_mut().discard_current();

        if !has_previous {
            return Err(ResourceError::Activation {
                path: self.resource.resolved_path().to_path_buf(),
                message: cause,
            });
        }

        log::warn!(
            "Rolling back to previous version. file:'{}'",
            self.resource.resolved_path().display()
        );

        match self.activate() {
            Ok(()) => {
                self.error = false;
                log::info!(
                    "Rollback successful. file:'{}'",
                    self.resource.resolved_path().display()
                );
                Ok(LoadOutcome::RolledBack)
            }
            Err(message) => {
                log::error!(
                    "Rollback failed. file:'{}': {}",
                    self.resource.resolved_path().display(),
                    message
                );
                Err(ResourceError::Rollback {
                    path: self.resource.resolved_path().to_path_buf(),
                    message,
                })
            }
        }
    }

    /// Show the operator what changed: previous version against the file
    /// currently on disk. Best-effort, requires two retained versions.
    fn run_diff(&mut self) {
        let Some(diff) = self.diff.as_mut() else {
            return;
        };

        let Ok(previous) = self.resource.history().from_past(1) else {
            return;
        };
        let previous = previous.clone();

        diff.run(&previous, self.resource.resolved_path());
    }

    /// Teardown: exit hooks, then evaluator garbage collection. Hook
    /// failures are logged and do not stop the teardown.
    pub fn free(&mut self) {
        if !self.exit_call.is_empty() {
            if let Err(e) = self.evaluator.evaluate_expression(&self.exit_call) {
                log::warn!(
                    "Exit call failed. file:'{}': {}",
                    self.resource.resolved_path().display(),
                    e
                );
            }
        }

        if !self.exit_class_call.is_empty() {
            if let Err(e) = self.evaluator.evaluate_expression(&self.exit_class_call) {
                log::warn!(
                    "Exit class call failed. file:'{}': {}",
                    self.resource.resolved_path().display(),
                    e
                );
            }
        }

        self.evaluator.collect_garbage();
        self.initialized = false;

        log::debug!(
            "Deinitialized script. file:'{}'",
            self.resource.resolved_path().display()
        );
    }
}

impl Drop for Script {
    fn drop(&mut self) {
        if self.initialized {
            self.free();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetStore;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scriptable evaluator double: records every call and fails the next
    /// N evaluations or expression evaluations on demand.
    #[derive(Default)]
    struct MockEvaluator {
        calls: Mutex<Vec<String>>,
        fail_evals: Mutex<usize>,
        fail_exprs: Mutex<usize>,
        active: Mutex<Vec<u8>>,
    }

    impl MockEvaluator {
        fn fail_next_evals(&self, count: usize) {
            *self.fail_evals.lock().unwrap() = count;
        }

        fn fail_next_exprs(&self, count: usize) {
            *self.fail_exprs.lock().unwrap() = count;
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn active(&self) -> Vec<u8> {
            self.active.lock().unwrap().clone()
        }
    }

    impl Evaluator for MockEvaluator {
        fn evaluate(&self, source: &[u8]) -> EvalResult {
            self.calls
                .lock()
                .unwrap()
                .push(format!("eval:{}", String::from_utf8_lossy(source)));

            let mut fails = self.fail_evals.lock().unwrap();
            if *fails > 0 {
                *fails -= 1;
                return Err("evaluation rejected".to_string());
            }

            *self.active.lock().unwrap() = source.to_vec();
            Ok(())
        }

        fn evaluate_expression(&self, expression: &str) -> EvalResult {
            self.calls.lock().unwrap().push(format!("expr:{}", expression));

            let mut fails = self.fail_exprs.lock().unwrap();
            if *fails > 0 {
                *fails -= 1;
                return Err("expression rejected".to_string());
            }

            Ok(())
        }

        fn collect_garbage(&self) {
            self.calls.lock().unwrap().push("gc".to_string());
        }
    }

    fn test_settings(root: &Path) -> Settings {
        Settings {
            project_root: root.to_path_buf(),
            file_modify_grace_period: Duration::from_millis(10),
            ..Settings::default()
        }
    }

    fn script_fixture(
        dir: &Path,
        name: &str,
        content: &[u8],
    ) -> (Script, Arc<MockEvaluator>) {
        fs::write(dir.join(name), content).unwrap();
        let settings = test_settings(dir);
        let evaluator = Arc::new(MockEvaluator::default());
        let script = Script::from_path(
            name,
            evaluator.clone(),
            &settings,
            &AssetStore::new(),
        );
        (script, evaluator)
    }

    fn rewrite(dir: &Path, name: &str, content: &[u8]) {
        // separate the new mtime/size stamp from the previous load
        std::thread::sleep(Duration::from_millis(30));
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_first_load_succeeds_unconditionally() {
        let dir = tempfile::tempdir().unwrap();
        let (mut script, evaluator) = script_fixture(dir.path(), "demo.rhai", b"let a = 1;");

        assert_eq!(script.load().unwrap(), LoadOutcome::Loaded);
        assert!(!script.has_error());
        assert_eq!(script.resource().history().len(), 1);
        assert_eq!(evaluator.active(), b"let a = 1;");
    }

    #[test]
    fn test_unmodified_file_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let (mut script, evaluator) = script_fixture(dir.path(), "demo.rhai", b"let a = 1;");

        script.load().unwrap();
        assert_eq!(script.load().unwrap(), LoadOutcome::Unchanged);
        assert_eq!(script.load().unwrap(), LoadOutcome::Unchanged);

        // the body was evaluated exactly once
        let evals = evaluator
            .calls()
            .iter()
            .filter(|c| c.starts_with("eval:"))
            .count();
        assert_eq!(evals, 1);
    }

    #[test]
    fn test_reload_picks_up_new_content() {
        let dir = tempfile::tempdir().unwrap();
        let (mut script, evaluator) = script_fixture(dir.path(), "demo.rhai", b"let a = 1;");

        script.load().unwrap();
        rewrite(dir.path(), "demo.rhai", b"let a = 22;");

        assert_eq!(script.load().unwrap(), LoadOutcome::Loaded);
        assert_eq!(evaluator.active(), b"let a = 22;");
        assert_eq!(script.resource().history().len(), 2);
    }

    #[test]
    fn test_rollback_restores_previous_version() {
        let dir = tempfile::tempdir().unwrap();
        let (mut script, evaluator) = script_fixture(dir.path(), "demo.rhai", b"let a = 1;");

        script.load().unwrap();
        rewrite(dir.path(), "demo.rhai", b"broken {");
        evaluator.fail_next_evals(1);

        assert_eq!(script.load().unwrap(), LoadOutcome::RolledBack);

        // consumer-visible state equals the previously committed content
        assert_eq!(evaluator.active(), b"let a = 1;");
        // the broken pending version was discarded, the good one retained
        assert_eq!(script.resource().history().len(), 1);
        assert_eq!(&script.resource().data().unwrap()[..], b"let a = 1;");
        assert!(!script.has_error());
    }

    #[test]
    fn test_rollback_does_not_retrigger_until_next_edit() {
        let dir = tempfile::tempdir().unwrap();
        let (mut script, evaluator) = script_fixture(dir.path(), "demo.rhai", b"let a = 1;");

        script.load().unwrap();
        rewrite(dir.path(), "demo.rhai", b"broken {");
        evaluator.fail_next_evals(1);

        assert_eq!(script.load().unwrap(), LoadOutcome::RolledBack);
        // the broken file is still on disk, but it was already tried
        assert_eq!(script.load().unwrap(), LoadOutcome::Unchanged);

        // a fresh edit is picked up again
        rewrite(dir.path(), "demo.rhai", b"let a = 3;");
        assert_eq!(script.load().unwrap(), LoadOutcome::Loaded);
        assert_eq!(evaluator.active(), b"let a = 3;");
    }

    #[test]
    fn test_double_failure_is_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut script, evaluator) = script_fixture(dir.path(), "demo.rhai", b"let a = 1;");

        script.load().unwrap();
        rewrite(dir.path(), "demo.rhai", b"broken {");
        evaluator.fail_next_evals(2);

        assert!(matches!(
            script.load(),
            Err(ResourceError::Rollback { .. })
        ));
        assert!(script.has_error());
        // pending discarded, committed version still retained
        assert_eq!(script.resource().history().len(), 1);
        assert_eq!(&script.resource().data().unwrap()[..], b"let a = 1;");
    }

    #[test]
    fn test_first_load_failure_has_nothing_to_roll_back() {
        let dir = tempfile::tempdir().unwrap();
        let (mut script, evaluator) = script_fixture(dir.path(), "demo.rhai", b"broken {");

        evaluator.fail_next_evals(1);
        assert!(matches!(
            script.load(),
            Err(ResourceError::Activation { .. })
        ));
        assert!(!script.resource().is_loaded());

        // edit-and-retry: a corrected file loads
        rewrite(dir.path(), "demo.rhai", b"let a = 1;");
        assert_eq!(script.load().unwrap(), LoadOutcome::Loaded);
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (mut script, _evaluator) = script_fixture(dir.path(), "notes.txt", b"hello");

        assert!(!script.is_supported());
        assert!(matches!(
            script.load(),
            Err(ResourceError::Unsupported(_))
        ));
    }

    #[test]
    fn test_empty_file_leaves_previous_version_active() {
        let dir = tempfile::tempdir().unwrap();
        let (mut script, evaluator) = script_fixture(dir.path(), "demo.rhai", b"let a = 1;");

        script.load().unwrap();
        rewrite(dir.path(), "demo.rhai", b"");

        assert!(matches!(
            script.load(),
            Err(ResourceError::EmptyFile(_))
        ));
        assert_eq!(evaluator.active(), b"let a = 1;");
        assert_eq!(script.resource().history().len(), 1);
    }

    #[test]
    fn test_activation_hook_ordering() {
        let dir = tempfile::tempdir().unwrap();
        let (mut script, evaluator) = script_fixture(dir.path(), "demo.rhai", b"body");

        script.set_init_class_call("ClassInit()");
        script.set_init_call("init()");
        script.set_exit_call("exit()");
        script.set_exit_class_call("ClassExit()");

        script.load().unwrap();
        assert_eq!(
            evaluator.calls(),
            vec!["expr:ClassInit()", "eval:body", "expr:init()"]
        );

        script.free();
        assert_eq!(
            evaluator.calls()[3..],
            ["expr:exit()", "expr:ClassExit()", "gc"]
        );
    }

    #[test]
    fn test_failing_init_hook_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let (mut script, evaluator) = script_fixture(dir.path(), "demo.rhai", b"let a = 1;");

        script.set_init_class_call("ClassInit()");
        script.load().unwrap();

        rewrite(dir.path(), "demo.rhai", b"let a = 2222;");
        evaluator.fail_next_exprs(1);

        // class-init fails for the new version; the rollback re-runs the
        // full activation with the previous content
        assert_eq!(script.load().unwrap(), LoadOutcome::RolledBack);
        assert_eq!(evaluator.active(), b"let a = 1;");
    }

    #[test]
    fn test_immutable_script_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let settings = test_settings(dir.path());
        let mut assets = AssetStore::new();
        assets.register("packaged.rhai", b"let p = 1;".as_slice());

        let evaluator = Arc::new(MockEvaluator::default());
        let mut script =
            Script::from_path("packaged.rhai", evaluator.clone(), &settings, &assets);

        assert_eq!(script.load().unwrap(), LoadOutcome::Loaded);
        assert_eq!(script.load().unwrap(), LoadOutcome::Unchanged);
        assert_eq!(script.force_load().unwrap(), LoadOutcome::Unchanged);
        assert_eq!(script.resource().history().len(), 1);
        assert_eq!(evaluator.active(), b"let p = 1;");
    }

    #[test]
    fn test_history_keeps_only_configured_depth() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("demo.rhai"), b"v1").unwrap();

        let mut settings = test_settings(dir.path());
        settings.file_history_depth = 2;

        let evaluator = Arc::new(MockEvaluator::default());
        let mut script =
            Script::from_path("demo.rhai", evaluator.clone(), &settings, &AssetStore::new());

        script.load().unwrap();
        rewrite(dir.path(), "demo.rhai", b"v2 v2");
        script.load().unwrap();
        rewrite(dir.path(), "demo.rhai", b"v3 v3 v3");
        script.load().unwrap();

        let history = script.resource().history();
        assert_eq!(history.len(), 2);
        assert_eq!(&history.from_past(0).unwrap()[..], b"v3 v3 v3");
        assert_eq!(&history.from_past(1).unwrap()[..], b"v2 v2");
        assert!(history.from_past(2).is_err());
    }
}
