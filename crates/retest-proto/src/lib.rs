//! Wire protocol between the orchestrator and the test worker.
//!
//! Each run sends the worker exactly one JSON request on stdin, terminated by
//! a newline, then closes the pipe. The worker answers with its exit status;
//! there is no response message.
//!
//! `testsToRun` is either the literal `false` (run the whole suite) or an
//! array of module ids from the pass the selection was made against.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Bumped whenever the request shape changes incompatibly.
pub const PROTOCOL_VERSION: u32 = 1;

/// Module identifier within one compilation pass.
pub type ModuleId = usize;

/// Which tests the worker should execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestSelection {
    /// Run the full suite.
    All,
    /// Run only the listed test modules.
    Subset(Vec<ModuleId>),
}

impl TestSelection {
    /// True for the full-suite selection.
    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl Serialize for TestSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_bool(false),
            Self::Subset(ids) => {
                let mut seq = serializer.serialize_seq(Some(ids.len()))?;
                for id in ids {
                    seq.serialize_element(id)?;
                }
                seq.end()
            }
        }
    }
}

struct SelectionVisitor;

impl<'de> Visitor<'de> for SelectionVisitor {
    type Value = TestSelection;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("`false` or an array of module ids")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
        if value {
            Err(E::invalid_value(de::Unexpected::Bool(true), &self))
        } else {
            Ok(TestSelection::All)
        }
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut ids = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(id) = seq.next_element()? {
            ids.push(id);
        }
        Ok(TestSelection::Subset(ids))
    }
}

impl<'de> Deserialize<'de> for TestSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SelectionVisitor)
    }
}

/// One run request, written to the worker's stdin as a single line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest {
    /// Tests to execute this run.
    pub tests_to_run: TestSelection,
    /// Launch parameters from the compile pass, plus project `execArgv`.
    pub launch_args: Vec<String>,
}

impl WorkerRequest {
    /// Encode the request as one newline-terminated JSON line.
    pub fn encode_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
