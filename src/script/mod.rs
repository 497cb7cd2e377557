//! Script binding layer.
//!
//! Wires the query engine to the host scripting language: the population
//! and collection member functions users call from configuration scripts,
//! the global functions (`EXIT`, `GET_UPDATE`, `PP`, ...), deprecated-name
//! handling, and event signal declarations. The host engine itself is an
//! external collaborator reached through two seams: [`ExpressionHost`] for
//! general string evaluation inside `${...}` templates, and [`SimControl`]
//! for run control and organism transfer between populations.

pub mod functions;

use std::cell::Cell;
use std::collections::BTreeMap;

use vivarium_core::aggregate::{build_summary, SummaryValue};
use vivarium_core::{ErrorLog, ExpressionHost, InterpreterConfig, MathHost, Preprocessor, QueryError};
use vivarium_data::{Collection, OrganismSource, Population};

/// Control seam into the owning simulation: exit requests, the update
/// counter, and organism transfer. Mirrors what the orchestrator exposes to
/// its scripting surface.
pub trait SimControl {
    /// Asks the run to terminate in an orderly way.
    fn request_exit(&mut self);

    fn exit_requested(&self) -> bool;

    /// Current simulation update number.
    fn update(&self) -> u64;

    fn verbose(&self) -> bool {
        false
    }

    /// Moves every organism out of `from` and appends them to `to`. The
    /// binding layer handles sequencing (clearing the destination for a
    /// replace); the transfer itself belongs to the coordinator.
    fn transfer_organisms(&mut self, from: &mut Population, to: &mut Population) {
        to.absorb(from.take_all());
    }
}

/// Minimal stand-alone control, used when no orchestrator is wired in.
#[derive(Debug, Clone, Default)]
pub struct BasicControl {
    update: u64,
    verbose: bool,
    exit_requested: bool,
}

impl BasicControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_update(&mut self, update: u64) {
        self.update = update;
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }
}

impl SimControl for BasicControl {
    fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    fn update(&self) -> u64 {
        self.update
    }

    fn verbose(&self) -> bool {
        self.verbose
    }
}

/// A value flowing back into the host scripting language.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Number(f64),
    Text(String),
    Subset(Collection),
    Unit,
}

impl ScriptValue {
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            ScriptValue::Number(v) => vivarium_data::format_number(*v),
            ScriptValue::Text(s) => s.clone(),
            ScriptValue::Subset(c) => format!("[{} organisms]", c.len()),
            ScriptValue::Unit => String::new(),
        }
    }
}

impl From<SummaryValue> for ScriptValue {
    fn from(value: SummaryValue) -> Self {
        match value {
            SummaryValue::Number(v) => ScriptValue::Number(v),
            SummaryValue::Text(s) => ScriptValue::Text(s),
        }
    }
}

/// Where a registered function hangs in the host engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Population,
    Collection,
    Global,
}

/// One entry of the registration surface the host engine enumerates.
#[derive(Debug, Clone, Copy)]
pub struct FunctionInfo {
    pub name: &'static str,
    pub desc: &'static str,
    pub target: TargetKind,
}

/// The scripting surface of one run: builds summaries on demand, expands
/// templates, tracks configuration errors, and forwards control requests.
pub struct ScriptEngine<C: SimControl> {
    control: C,
    config: InterpreterConfig,
    host: Box<dyn ExpressionHost>,
    errors: ErrorLog,
    signals: Vec<String>,
    deprecated: BTreeMap<&'static str, &'static str>,
    pp_depth: Cell<usize>,
}

impl<C: SimControl> ScriptEngine<C> {
    #[must_use]
    pub fn new(control: C) -> Self {
        Self::with_config(control, InterpreterConfig::default())
    }

    #[must_use]
    pub fn with_config(control: C, config: InterpreterConfig) -> Self {
        let mut engine = Self {
            control,
            config,
            host: Box::new(MathHost::new()),
            errors: ErrorLog::new(),
            signals: Vec::new(),
            deprecated: BTreeMap::new(),
            pp_depth: Cell::new(0),
        };
        engine.initialize();
        engine
    }

    /// Declares built-in event triggers and the deprecated-name table.
    fn initialize(&mut self) {
        self.add_signal("START"); // Triggered at the beginning of a run.
        self.add_signal("UPDATE"); // Tested every update.

        self.deprecated.insert("EVAL", "EXEC");
        self.deprecated.insert("exit", "EXIT");
        self.deprecated.insert("inject", "INJECT");
        self.deprecated.insert("print", "PRINT");
    }

    /// Swaps in the host engine's general evaluator for `${...}` spans.
    /// Until one is wired, templates evaluate as constant math.
    pub fn set_expression_host(&mut self, host: Box<dyn ExpressionHost>) {
        self.host = host;
    }

    #[must_use]
    pub fn control(&self) -> &C {
        &self.control
    }

    pub fn control_mut(&mut self) -> &mut C {
        &mut self.control
    }

    #[must_use]
    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    #[must_use]
    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    pub fn record_error(&mut self, message: String) {
        self.errors.record(message);
    }

    // --- signals ---

    pub fn add_signal(&mut self, name: &str) {
        if !self.has_signal(name) {
            self.signals.push(name.to_string());
        }
    }

    #[must_use]
    pub fn has_signal(&self, name: &str) -> bool {
        self.signals.iter().any(|s| s == name)
    }

    #[must_use]
    pub fn signals(&self) -> &[String] {
        &self.signals
    }

    // --- preprocessing ---

    /// Expands `${...}` spans through the host evaluator. Host re-entry
    /// (a span whose evaluation preprocesses further text) shares one depth
    /// counter, so self-referential configuration fails fast instead of
    /// recursing without bound.
    pub fn preprocess(&self, text: &str) -> vivarium_core::Result<String> {
        let depth = self.pp_depth.get() + 1;
        let limit = self.config.preprocess_depth_limit;
        if depth > limit {
            return Err(QueryError::DepthExceeded(limit));
        }
        self.pp_depth.set(depth);
        let result = Preprocessor::new(self.host.as_ref(), limit).expand(text);
        self.pp_depth.set(depth - 1);
        result
    }

    // --- the summary pipeline every member function funnels through ---

    /// Preprocesses `expr`, builds the summary for `mode`, and applies it.
    /// An empty source short-circuits to `default` before any compilation;
    /// build failures are recorded and also yield `default`.
    pub fn summarize(
        &mut self,
        source: &dyn OrganismSource,
        expr: &str,
        mode: &str,
        default: SummaryValue,
    ) -> SummaryValue {
        if source.source_is_empty() {
            return default;
        }
        let expanded = match self.preprocess(expr) {
            Ok(text) => text,
            Err(err) => {
                self.errors.record(format!("Trait function '{expr}': {err}"));
                return default;
            }
        };
        let max_len = self.config.max_expression_len;
        if expanded.len() > max_len {
            self.errors.record(
                QueryError::ExpressionTooLong {
                    len: expanded.len(),
                    max: max_len,
                }
                .to_string(),
            );
            return default;
        }
        match build_summary(&expanded, mode, source.source_layout()) {
            Ok(summary) => summary(source),
            Err(err) => {
                self.errors
                    .record(format!("Trait function '{expr}' with mode '{mode}': {err}"));
                default
            }
        }
    }

    // --- global functions ---

    /// Dispatches a global script function by name. Deprecated names warn,
    /// request an orderly exit, and are recorded; they are intentionally
    /// fatal rather than silently remapped.
    pub fn call_global(&mut self, name: &str, arg: Option<&str>) -> ScriptValue {
        if let Some(&replacement) = self.deprecated.get(name) {
            tracing::warn!(
                function = name,
                replacement,
                "Deprecated function invoked"
            );
            self.errors
                .record(format!("Function '{name}' deprecated; use '{replacement}'"));
            self.control.request_exit();
            return ScriptValue::Unit;
        }
        match name {
            "EXIT" => {
                self.control.request_exit();
                ScriptValue::Unit
            }
            "GET_UPDATE" => ScriptValue::Number(self.control.update() as f64),
            "GET_VERBOSE" => {
                ScriptValue::Number(if self.control.verbose() { 1.0 } else { 0.0 })
            }
            "PP" => {
                let text = arg.unwrap_or_default();
                match self.preprocess(text) {
                    Ok(out) => ScriptValue::Text(out),
                    Err(err) => {
                        self.errors.record(format!("PP: {err}"));
                        ScriptValue::Text(text.to_string())
                    }
                }
            }
            _ => {
                self.errors.record(format!("Unknown function '{name}'"));
                ScriptValue::Unit
            }
        }
    }

    /// Global functions this engine exposes, for the host's registration
    /// pass.
    #[must_use]
    pub fn global_functions(&self) -> Vec<FunctionInfo> {
        vec![
            FunctionInfo {
                name: "EXIT",
                desc: "Exit from this run.",
                target: TargetKind::Global,
            },
            FunctionInfo {
                name: "GET_UPDATE",
                desc: "Get current update.",
                target: TargetKind::Global,
            },
            FunctionInfo {
                name: "GET_VERBOSE",
                desc: "Has the verbose flag been set?",
                target: TargetKind::Global,
            },
            FunctionInfo {
                name: "PP",
                desc: "Preprocess a string (replacing any ${...} with result.)",
                target: TargetKind::Global,
            },
        ]
    }
}

impl<C: SimControl> std::fmt::Debug for ScriptEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("signals", &self.signals)
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}
