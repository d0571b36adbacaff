//! Core identity types shared by the graph and the kernel.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Identity of a workflow step (a notebook "cell").
///
/// Steps are named either by a number or by a string. Two numeric ids compare
/// numerically and two names compare lexicographically. Numeric ids sort
/// before names so the ordering stays total.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepId {
    /// Numeric identity
    Index(i64),
    /// Named identity
    Name(String),
}

impl StepId {
    /// Creates a named StepId.
    pub fn new(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Returns the numeric value when this id is an index.
    pub fn as_index(&self) -> Option<i64> {
        match self {
            StepId::Index(i) => Some(*i),
            StepId::Name(_) => None,
        }
    }

    /// Returns the name when this id is a string.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            StepId::Index(_) => None,
            StepId::Name(name) => Some(name),
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepId::Index(i) => write!(f, "{}", i),
            StepId::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        StepId::Name(s.to_string())
    }
}

impl From<String> for StepId {
    fn from(s: String) -> Self {
        StepId::Name(s)
    }
}

impl From<&String> for StepId {
    fn from(s: &String) -> Self {
        StepId::Name(s.clone())
    }
}

impl From<i64> for StepId {
    fn from(i: i64) -> Self {
        StepId::Index(i)
    }
}

impl From<i32> for StepId {
    fn from(i: i32) -> Self {
        StepId::Index(i64::from(i))
    }
}

impl From<u32> for StepId {
    fn from(i: u32) -> Self {
        StepId::Index(i64::from(i))
    }
}

/// Tie-break comparator for arbitrary node identities.
///
/// Identities whose string form is numeric compare numerically and sort
/// before non-numeric ones; everything else compares by string form.
pub fn compare_identities<A, B>(a: &A, b: &B) -> Ordering
where
    A: fmt::Display + ?Sized,
    B: fmt::Display + ?Sized,
{
    let a = a.to_string();
    let b = b.to_string();
    match (numeric(&a), numeric(&b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(&b),
    }
}

fn numeric(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}
