use vivarium_core::{ExpressionHost, InterpreterConfig, MathHost, Preprocessor, QueryError};
use vivarium_lib::script::{BasicControl, ScriptEngine, ScriptValue};

#[test]
fn arithmetic_spans_substitute() {
    let engine = ScriptEngine::new(BasicControl::new());
    assert_eq!(engine.preprocess("a${1+1}b").unwrap(), "a2b");
    assert_eq!(engine.preprocess("${10/4}").unwrap(), "2.5");
    assert_eq!(engine.preprocess("x${2**3}y${1+2}z").unwrap(), "x8y3z");
}

#[test]
fn double_dollar_escapes() {
    let engine = ScriptEngine::new(BasicControl::new());
    assert_eq!(engine.preprocess("$${x}").unwrap(), "${x}");
    assert_eq!(engine.preprocess("$$$${x}").unwrap(), "$${x}");
}

#[test]
fn unbalanced_brace_left_untouched() {
    let engine = ScriptEngine::new(BasicControl::new());
    assert_eq!(engine.preprocess("a${1+{2}").unwrap(), "a${1+{2}");
    // Substitutions before the unmatched span still happen.
    assert_eq!(engine.preprocess("${1+1} then ${open").unwrap(), "2 then ${open");
}

#[test]
fn plain_text_passes_through() {
    let engine = ScriptEngine::new(BasicControl::new());
    assert_eq!(engine.preprocess("no templates here").unwrap(), "no templates here");
    assert_eq!(engine.preprocess("price is $5").unwrap(), "price is $5");
}

#[test]
fn pp_global_exposes_preprocessing_to_scripts() {
    let mut engine = ScriptEngine::new(BasicControl::new());
    assert_eq!(
        engine.call_global("PP", Some("pop size ${25*4}")),
        ScriptValue::Text("pop size 100".into())
    );
}

/// Host whose every evaluation re-enters preprocessing, the shape of a
/// configuration variable that expands into itself.
struct SelfExpandingHost {
    depth_limit: usize,
}

impl ExpressionHost for SelfExpandingHost {
    fn eval_expression(&self, expr: &str) -> vivarium_core::Result<String> {
        let host = MathHost::new();
        let inner = Preprocessor::new(&host, self.depth_limit);
        inner.expand(&format!("${{{expr}}}"))
    }
}

#[test]
fn host_chain_expansion_terminates() {
    let deep = SelfExpandingHost { depth_limit: 4 };
    let outer = Preprocessor::new(&deep, 1);
    // The host's own expansion resolves the math; the outer pass
    // substitutes its result.
    assert_eq!(outer.expand("${1+1}").unwrap(), "2");
}

#[test]
fn self_referential_expansion_terminates() {
    use std::cell::RefCell;
    use std::rc::Rc;

    // A host wired back to the engine it serves: every span evaluation
    // preprocesses the same span again, the shape of a configuration
    // variable that expands into itself.
    struct Reentrant {
        engine: Rc<RefCell<Option<ScriptEngine<BasicControl>>>>,
        calls: std::cell::Cell<usize>,
    }
    impl ExpressionHost for Reentrant {
        fn eval_expression(&self, expr: &str) -> vivarium_core::Result<String> {
            self.calls.set(self.calls.get() + 1);
            let shared = self.engine.borrow();
            match shared.as_ref() {
                Some(engine) => engine.preprocess(&format!("${{{expr}}}")),
                None => Err(QueryError::host("engine not wired")),
            }
        }
    }

    let shared = Rc::new(RefCell::new(None));
    let mut engine = ScriptEngine::with_config(
        BasicControl::new(),
        InterpreterConfig {
            preprocess_depth_limit: 3,
            ..Default::default()
        },
    );
    let host = Reentrant {
        engine: Rc::clone(&shared),
        calls: std::cell::Cell::new(0),
    };
    let calls = Rc::new(host);
    // Box the Rc so the engine and this test both see the call counter.
    struct HostRef(Rc<Reentrant>);
    impl ExpressionHost for HostRef {
        fn eval_expression(&self, expr: &str) -> vivarium_core::Result<String> {
            self.0.eval_expression(expr)
        }
    }
    engine.set_expression_host(Box::new(HostRef(Rc::clone(&calls))));
    *shared.borrow_mut() = Some(engine);

    let shared_ref = shared.borrow();
    let engine = shared_ref.as_ref().unwrap();
    // The depth guard abandons the span instead of recursing forever; the
    // unexpandable span survives as literal text.
    let result = engine.preprocess("${1+1}").unwrap();
    assert_eq!(result, "${1+1}");
    // Re-entry was attempted and bounded by the configured depth.
    assert!(calls.calls.get() >= 2);
    assert!(calls.calls.get() <= 3);
}
