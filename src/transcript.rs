//! AttrModel v1: Transcripts
//!
//! A transcript is an ordered list of attribute operations, the way a REPL
//! session reads: create an object, read, write, delete, call. Each step
//! carries a sequence number. Attribute errors are recorded in the step's
//! outcome and the replay continues.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AttrError;
use crate::protocols::to_repr;
use crate::resolver::AttributeResolver;
use crate::value::Value;

/// Operation applied to a bound handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// `handle = Class(args...)`
    New {
        handle: String,
        class: String,
        #[serde(default)]
        args: Vec<serde_json::Value>,
    },
    /// `target.name`
    Get { target: String, name: String },
    /// `target.name = value`
    Set {
        target: String,
        name: String,
        value: serde_json::Value,
    },
    /// `del target.name`
    Delete { target: String, name: String },
    /// `target.name(args...)`
    Call {
        target: String,
        name: String,
        #[serde(default)]
        args: Vec<serde_json::Value>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEnvelope {
    pub seq: u64,
    #[serde(flatten)]
    pub step: Step,
}

/// What a step printed, or the error it raised.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub seq: u64,
    /// `repr` of the produced value; `None` for steps that produce nothing.
    pub output: Option<String>,
    pub error: Option<AttrError>,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Failures that stop a replay outright.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranscriptError {
    #[error("sequence violation: expected {expected}, got {got}")]
    Sequence { expected: u64, got: u64 },

    #[error("unknown handle '{0}'")]
    UnknownHandle(String),

    #[error("unsupported value in step {seq}: {value}")]
    UnsupportedValue { seq: u64, value: String },

    #[error("malformed transcript: {0}")]
    Malformed(String),
}

/// Handle table plus the outcomes recorded so far.
#[derive(Debug, Default)]
pub struct Transcript {
    bindings: BTreeMap<String, Value>,
    last_seq: u64,
    outcomes: Vec<Outcome>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array of steps.
    pub fn parse(json: &str) -> Result<Vec<StepEnvelope>, TranscriptError> {
        serde_json::from_str(json).map_err(|e| TranscriptError::Malformed(e.to_string()))
    }

    /// Make a class or entity reachable from steps under `handle`.
    pub fn bind(&mut self, handle: &str, value: Value) {
        self.bindings.insert(handle.to_string(), value);
    }

    pub fn binding(&self, handle: &str) -> Option<&Value> {
        self.bindings.get(handle)
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Apply one step:
    ///   1. sequence must be exactly last + 1
    ///   2. handles and argument values are resolved
    ///   3. the operation runs; attribute errors land in the outcome
    pub fn apply(
        &mut self,
        rt: &mut AttributeResolver,
        envelope: &StepEnvelope,
    ) -> Result<&Outcome, TranscriptError> {
        let expected = self.last_seq + 1;
        if envelope.seq != expected {
            return Err(TranscriptError::Sequence {
                expected,
                got: envelope.seq,
            });
        }
        let seq = envelope.seq;

        let result: Result<Option<Value>, AttrError> = match &envelope.step {
            Step::New { handle, class, args } => {
                let class = self.lookup(class)?;
                let args = self.values(seq, args)?;
                let created = rt.call(&class, &args);
                if let Ok(value) = &created {
                    self.bindings.insert(handle.clone(), value.clone());
                }
                created.map(Some)
            }
            Step::Get { target, name } => match self.lookup(target)? {
                Value::Class(c) => rt.resolve_class_get(c, name).map(Some),
                Value::Entity(e) => rt.resolve_get(e, name).map(Some),
                _ => return Err(TranscriptError::UnknownHandle(target.clone())),
            },
            Step::Set {
                target,
                name,
                value,
            } => {
                let value = self.value(seq, value)?;
                match self.lookup(target)? {
                    Value::Class(c) => rt.set_class_attr(c, name, value).map(|_| None),
                    Value::Entity(e) => rt.resolve_set(e, name, value).map(|_| None),
                    _ => return Err(TranscriptError::UnknownHandle(target.clone())),
                }
            }
            Step::Delete { target, name } => match self.lookup(target)? {
                Value::Class(c) => rt.delete_class_attr(c, name).map(|_| None),
                Value::Entity(e) => rt.resolve_delete(e, name).map(|_| None),
                _ => return Err(TranscriptError::UnknownHandle(target.clone())),
            },
            Step::Call { target, name, args } => {
                let args = self.values(seq, args)?;
                let callee = match self.lookup(target)? {
                    Value::Class(c) => rt.resolve_class_get(c, name),
                    Value::Entity(e) => rt.resolve_get(e, name),
                    _ => return Err(TranscriptError::UnknownHandle(target.clone())),
                };
                callee.and_then(|f| rt.call(&f, &args)).map(Some)
            }
        };

        let outcome = match result {
            Ok(Some(value)) => match to_repr(rt, &value) {
                Ok(text) => Outcome {
                    seq,
                    output: Some(text),
                    error: None,
                },
                Err(err) => Outcome {
                    seq,
                    output: None,
                    error: Some(err),
                },
            },
            Ok(None) => Outcome {
                seq,
                output: None,
                error: None,
            },
            Err(err) => {
                debug!(seq, error = %err, "step raised");
                Outcome {
                    seq,
                    output: None,
                    error: Some(err),
                }
            }
        };

        self.last_seq = seq;
        self.outcomes.push(outcome);
        Ok(&self.outcomes[self.outcomes.len() - 1])
    }

    /// Apply an ordered sequence of steps.
    pub fn replay(
        &mut self,
        rt: &mut AttributeResolver,
        steps: &[StepEnvelope],
    ) -> Result<&[Outcome], TranscriptError> {
        for step in steps {
            self.apply(rt, step)?;
        }
        Ok(&self.outcomes)
    }

    fn lookup(&self, handle: &str) -> Result<Value, TranscriptError> {
        self.bindings
            .get(handle)
            .cloned()
            .ok_or_else(|| TranscriptError::UnknownHandle(handle.to_string()))
    }

    /// JSON scalar, or `{"ref": "handle"}` for a bound object.
    fn value(&self, seq: u64, json: &serde_json::Value) -> Result<Value, TranscriptError> {
        if let Some(handle) = json.get("ref").and_then(|h| h.as_str()) {
            return self.lookup(handle);
        }
        Value::from_json(json).ok_or_else(|| TranscriptError::UnsupportedValue {
            seq,
            value: json.to_string(),
        })
    }

    fn values(&self, seq: u64, json: &[serde_json::Value]) -> Result<Vec<Value>, TranscriptError> {
        json.iter().map(|j| self.value(seq, j)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::ClassBuilder;

    #[test]
    fn steps_parse_from_tagged_json() {
        let steps = Transcript::parse(
            r#"[{"seq":1,"op":"new","handle":"c","class":"C"},
                {"seq":2,"op":"set","target":"c","name":"r","value":2},
                {"seq":3,"op":"get","target":"c","name":"r"}]"#,
        )
        .unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[1].step,
            Step::Set {
                target: "c".into(),
                name: "r".into(),
                value: serde_json::json!(2),
            }
        );
    }

    #[test]
    fn sequence_gaps_are_rejected() {
        let mut rt = AttributeResolver::new();
        let c = rt.define_class(ClassBuilder::new("C")).unwrap();
        let mut transcript = Transcript::new();
        transcript.bind("C", Value::Class(c));

        let steps = Transcript::parse(r#"[{"seq":2,"op":"new","handle":"c","class":"C"}]"#).unwrap();
        assert_eq!(
            transcript.replay(&mut rt, &steps).unwrap_err(),
            TranscriptError::Sequence { expected: 1, got: 2 }
        );
    }

    #[test]
    fn attribute_errors_are_recorded_not_fatal() {
        let mut rt = AttributeResolver::new();
        let c = rt.define_class(ClassBuilder::new("C")).unwrap();
        let mut transcript = Transcript::new();
        transcript.bind("C", Value::Class(c));

        let steps = Transcript::parse(
            r#"[{"seq":1,"op":"new","handle":"c","class":"C"},
                {"seq":2,"op":"get","target":"c","name":"color"},
                {"seq":3,"op":"set","target":"c","name":"color","value":"yellow"},
                {"seq":4,"op":"get","target":"c","name":"color"}]"#,
        )
        .unwrap();
        let outcomes = transcript.replay(&mut rt, &steps).unwrap();
        assert_eq!(
            outcomes[1].error,
            Some(AttrError::AttributeNotFound("color".into()))
        );
        assert!(outcomes[2].is_ok());
        assert_eq!(outcomes[3].output.as_deref(), Some("'yellow'"));
    }

    #[test]
    fn unknown_handles_stop_the_replay() {
        let mut rt = AttributeResolver::new();
        let mut transcript = Transcript::new();
        let steps = Transcript::parse(r#"[{"seq":1,"op":"get","target":"ghost","name":"x"}]"#).unwrap();
        assert_eq!(
            transcript.replay(&mut rt, &steps).unwrap_err(),
            TranscriptError::UnknownHandle("ghost".into())
        );
    }
}
