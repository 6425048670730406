//! Reactive controller - binds control properties to output regions
//!
//! A callback declares the input properties it reads and the output
//! properties it replaces. Dispatching a set of changed inputs runs exactly
//! the callbacks that declared one of them, each receiving its declared
//! inputs in declared order and returning one value per declared output.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// `component.property`, e.g. `point-size.value`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropRef {
    pub component: String,
    pub property: String,
}

impl PropRef {
    pub fn new(component: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            property: property.into(),
        }
    }
}

impl fmt::Display for PropRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.property)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid property reference '{0}', expected component.property")]
pub struct ParsePropRefError(String);

impl FromStr for PropRef {
    type Err = ParsePropRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('.') {
            Some((component, property)) if !component.is_empty() && !property.is_empty() => {
                Ok(PropRef::new(component, property))
            }
            _ => Err(ParsePropRefError(s.to_string())),
        }
    }
}

impl TryFrom<String> for PropRef {
    type Error = ParsePropRefError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PropRef> for String {
    fn from(p: PropRef) -> String {
        p.to_string()
    }
}

/// Current values of control properties
pub type PropertyMap = BTreeMap<PropRef, Value>;

#[derive(Error, Debug)]
pub enum CallbackError {
    #[error("no value supplied for input {0}")]
    MissingInput(PropRef),
    #[error("invalid value for {input}: {reason}")]
    InvalidInput { input: PropRef, reason: String },
    #[error("returned {got} outputs, expected {expected}")]
    OutputArity { expected: usize, got: usize },
    #[error("{0}")]
    Failed(String),
}

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("callback '{0}' declares no inputs")]
    NoInputs(String),
    #[error("callback '{0}' declares no outputs")]
    NoOutputs(String),
    #[error("output {output} of '{callback}' is already bound by '{existing}'")]
    DuplicateOutput {
        output: PropRef,
        callback: String,
        existing: String,
    },
}

/// A callback failed; none of its outputs were applied
#[derive(Error, Debug)]
#[error("callback '{callback}' failed: {source}")]
pub struct DispatchError {
    pub callback: String,
    #[source]
    pub source: CallbackError,
}

type Handler = Box<dyn Fn(&[Value]) -> Result<Vec<Value>, CallbackError> + Send + Sync>;

pub struct Callback {
    name: String,
    inputs: Vec<PropRef>,
    outputs: Vec<PropRef>,
    prevent_initial_call: bool,
    handler: Handler,
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("prevent_initial_call", &self.prevent_initial_call)
            .finish_non_exhaustive()
    }
}

impl Callback {
    pub fn new<F>(name: impl Into<String>, inputs: Vec<PropRef>, outputs: Vec<PropRef>, handler: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Vec<Value>, CallbackError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            inputs,
            outputs,
            prevent_initial_call: false,
            handler: Box::new(handler),
        }
    }

    /// Skip this callback when the page is first mounted
    pub fn prevent_initial_call(mut self) -> Self {
        self.prevent_initial_call = true;
        self
    }

    fn invoke(&self, values: &PropertyMap) -> Result<Vec<Update>, CallbackError> {
        let args = self
            .inputs
            .iter()
            .map(|input| {
                values
                    .get(input)
                    .cloned()
                    .ok_or_else(|| CallbackError::MissingInput(input.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let results = (self.handler)(&args)?;
        if results.len() != self.outputs.len() {
            return Err(CallbackError::OutputArity {
                expected: self.outputs.len(),
                got: results.len(),
            });
        }

        Ok(self
            .outputs
            .iter()
            .cloned()
            .zip(results)
            .map(|(target, value)| Update { target, value })
            .collect())
    }
}

/// New content for one output property
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
    pub target: PropRef,
    pub value: Value,
}

/// Registration table of callbacks, dispatched by changed input
#[derive(Debug, Default)]
pub struct Controller {
    callbacks: Vec<Callback>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, callback: Callback) -> Result<(), RegistrationError> {
        if callback.inputs.is_empty() {
            return Err(RegistrationError::NoInputs(callback.name));
        }
        if callback.outputs.is_empty() {
            return Err(RegistrationError::NoOutputs(callback.name));
        }
        for output in &callback.outputs {
            if let Some(existing) = self.callbacks.iter().find(|c| c.outputs.contains(output)) {
                return Err(RegistrationError::DuplicateOutput {
                    output: output.clone(),
                    callback: callback.name.clone(),
                    existing: existing.name.clone(),
                });
            }
        }
        tracing::debug!(
            "Registered callback '{}': {} inputs -> {} outputs",
            callback.name,
            callback.inputs.len(),
            callback.outputs.len()
        );
        self.callbacks.push(callback);
        Ok(())
    }

    pub fn callbacks(&self) -> &[Callback] {
        &self.callbacks
    }

    /// Callbacks that declared at least one of `changed`, in registration order
    pub fn affected<'a>(&'a self, changed: &'a [PropRef]) -> impl Iterator<Item = &'a Callback> + 'a {
        self.callbacks
            .iter()
            .filter(move |c| c.inputs.iter().any(|i| changed.contains(i)))
    }

    /// Run the callbacks affected by `changed`.
    ///
    /// Either every affected callback succeeds and all their updates are
    /// returned, or the first failure is returned and nothing is applied.
    pub fn dispatch(&self, changed: &[PropRef], values: &PropertyMap) -> Result<Vec<Update>, DispatchError> {
        Self::run(self.affected(changed), values)
    }

    /// Run every callback that does not opt out of the initial mount
    pub fn initial(&self, values: &PropertyMap) -> Result<Vec<Update>, DispatchError> {
        Self::run(self.callbacks.iter().filter(|c| !c.prevent_initial_call), values)
    }

    fn run<'a>(
        callbacks: impl Iterator<Item = &'a Callback>,
        values: &PropertyMap,
    ) -> Result<Vec<Update>, DispatchError> {
        let mut updates = Vec::new();
        for callback in callbacks {
            tracing::debug!("Running callback '{}'", callback.name);
            let produced = callback.invoke(values).map_err(|source| {
                crate::log_callback_error!(callback.name, source);
                DispatchError {
                    callback: callback.name.clone(),
                    source,
                }
            })?;
            updates.extend(produced);
        }
        Ok(updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn p(s: &str) -> PropRef {
        s.parse().unwrap()
    }

    fn echo(name: &str, input: &str, output: &str) -> Callback {
        Callback::new(name, vec![p(input)], vec![p(output)], |args| Ok(vec![args[0].clone()]))
    }

    #[test]
    fn test_prop_ref_parse_and_display() {
        let r = p("point-size.value");
        assert_eq!(r.component, "point-size");
        assert_eq!(r.property, "value");
        assert_eq!(r.to_string(), "point-size.value");
        assert!("nodot".parse::<PropRef>().is_err());
        assert!(".value".parse::<PropRef>().is_err());
    }

    #[test]
    fn test_prop_ref_serde_as_string() {
        let r: PropRef = serde_json::from_value(json!("shuffle.n_clicks")).unwrap();
        assert_eq!(r, PropRef::new("shuffle", "n_clicks"));
        assert_eq!(serde_json::to_value(&r).unwrap(), json!("shuffle.n_clicks"));
    }

    #[test]
    fn test_duplicate_output_rejected() {
        let mut c = Controller::new();
        c.register(echo("a", "x.value", "out.children")).unwrap();
        let err = c.register(echo("b", "y.value", "out.children")).unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateOutput { .. }));
    }

    #[test]
    fn test_empty_bindings_rejected() {
        let mut c = Controller::new();
        let no_inputs = Callback::new("a", vec![], vec![p("o.children")], |_| Ok(vec![]));
        assert!(matches!(c.register(no_inputs), Err(RegistrationError::NoInputs(_))));
        let no_outputs = Callback::new("b", vec![p("i.value")], vec![], |_| Ok(vec![]));
        assert!(matches!(c.register(no_outputs), Err(RegistrationError::NoOutputs(_))));
    }

    #[test]
    fn test_only_affected_callbacks_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut c = Controller::new();
        c.register(Callback::new("counted", vec![p("a.value")], vec![p("a_out.children")], move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![json!("a")])
        }))
        .unwrap();
        c.register(echo("b", "b.value", "b_out.children")).unwrap();

        let values = PropertyMap::from([(p("a.value"), json!(1)), (p("b.value"), json!(2))]);

        let updates = c.dispatch(&[p("b.value")], &values).unwrap();
        assert_eq!(updates, vec![Update { target: p("b_out.children"), value: json!(2) }]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(c.dispatch(&[p("zzz.value")], &values).unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        c.dispatch(&[p("a.value"), p("b.value")], &values).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_inputs_passed_in_declared_order() {
        let mut c = Controller::new();
        c.register(Callback::new(
            "join",
            vec![p("second.value"), p("first.value")],
            vec![p("out.children")],
            |args| Ok(vec![json!(format!("{}{}", args[0], args[1]))]),
        ))
        .unwrap();
        let values = PropertyMap::from([
            (p("first.value"), json!(1)),
            (p("second.value"), json!(2)),
            (p("unrelated.value"), json!(3)),
        ]);
        let updates = c.dispatch(&[p("first.value")], &values).unwrap();
        assert_eq!(updates[0].value, json!("21"));
    }

    #[test]
    fn test_missing_input_is_error() {
        let mut c = Controller::new();
        c.register(echo("e", "x.value", "o.children")).unwrap();
        let err = c.dispatch(&[p("x.value")], &PropertyMap::new()).unwrap_err();
        assert_eq!(err.callback, "e");
        assert!(matches!(err.source, CallbackError::MissingInput(_)));
    }

    #[test]
    fn test_wrong_output_count_is_error() {
        let mut c = Controller::new();
        c.register(Callback::new(
            "short",
            vec![p("x.value")],
            vec![p("o1.children"), p("o2.children")],
            |_| Ok(vec![json!(1)]),
        ))
        .unwrap();
        let values = PropertyMap::from([(p("x.value"), json!(0))]);
        let err = c.dispatch(&[p("x.value")], &values).unwrap_err();
        assert!(matches!(err.source, CallbackError::OutputArity { expected: 2, got: 1 }));
    }

    #[test]
    fn test_failure_applies_nothing() {
        let mut c = Controller::new();
        c.register(echo("ok", "x.value", "o1.children")).unwrap();
        c.register(Callback::new("boom", vec![p("x.value")], vec![p("o2.children")], |_| {
            Err(CallbackError::Failed("boom".into()))
        }))
        .unwrap();
        let values = PropertyMap::from([(p("x.value"), json!(0))]);
        assert!(c.dispatch(&[p("x.value")], &values).is_err());
    }

    #[test]
    fn test_initial_honours_prevent_initial_call() {
        let mut c = Controller::new();
        c.register(echo("mounted", "x.value", "o1.children")).unwrap();
        c.register(echo("skipped", "x.value", "o2.children").prevent_initial_call())
            .unwrap();
        let values = PropertyMap::from([(p("x.value"), json!("v"))]);
        let updates = c.initial(&values).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].target, p("o1.children"));
    }
}
