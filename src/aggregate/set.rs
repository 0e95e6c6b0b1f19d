use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum MergeError {
    #[snafu(display("Invalid encoded set state: {}", source))]
    InvalidState { source: serde_json::Error },
}

#[derive(Debug, Snafu)]
pub enum EncodeError {
    #[snafu(display("Failed to encode set state: {}", source))]
    Encode { source: serde_json::Error },
}

/// The wire shape of a set's state, exchanged between agents.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EncodedSet {
    values: BTreeSet<String>,
}

#[derive(Serialize)]
struct EncodedSetRef<'a> {
    values: &'a BTreeSet<String>,
}

/// The distinct tokens observed for one identity.
#[derive(Clone, Debug, PartialEq)]
pub struct Set {
    name: String,
    tags: Vec<String>,
    values: BTreeSet<String>,
}

impl Set {
    pub fn new(name: &str, tags: &[String]) -> Self {
        Self {
            name: name.to_owned(),
            tags: tags.to_vec(),
            values: BTreeSet::new(),
        }
    }

    pub fn sample(&mut self, token: &str, _sample_rate: f64) {
        if !self.values.contains(token) {
            self.values.insert(token.to_owned());
        }
    }

    /// Merges another agent's encoded state into this set.
    ///
    /// The state is fully decoded before anything is inserted, so a failed
    /// merge leaves the set as it was.
    pub fn combine(&mut self, encoded: &[u8]) -> Result<(), MergeError> {
        let other: EncodedSet = serde_json::from_slice(encoded).context(InvalidStateSnafu)?;
        self.values.extend(other.values);
        Ok(())
    }

    /// Serializes this set's state in the form accepted by [`Set::combine`].
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        serde_json::to_vec(&EncodedSetRef {
            values: &self.values,
        })
        .context(EncodeSnafu)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn values(&self) -> &BTreeSet<String> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
