//! pending values.
//!
//! An [`Output`] is a value that the provisioning engine may or may not have resolved yet,
//! together with the resource attributes it was derived from. Resources take outputs as
//! inputs, which is how the dependency graph between declarations gets recorded.

use std::collections::BTreeSet;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// key used when an unknown value is written into a state document.
pub const UNKNOWN_KEY: &str = "$unknown";

/// points at one attribute of a declared resource, eg: `siteBucket.arn`
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributeRef {
    pub urn: String,
    pub resource: String,
    pub attribute: String,
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.attribute)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Output<T> {
    value: Option<T>,
    sources: BTreeSet<AttributeRef>,
}

impl<T> Output<T> {
    /// a plain value that doesn't depend on any resource.
    pub fn known(value: T) -> Self {
        Self {
            value: Some(value),
            sources: BTreeSet::new(),
        }
    }

    pub(crate) fn from_attribute(source: AttributeRef, value: Option<T>) -> Self {
        let mut sources = BTreeSet::new();
        sources.insert(source);
        Self { value, sources }
    }

    pub fn is_known(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<T> {
        self.value
    }

    pub fn sources(&self) -> impl Iterator<Item = &AttributeRef> {
        self.sources.iter()
    }

    /// URNs of every resource this value was derived from.
    pub fn depends_on(&self) -> BTreeSet<String> {
        self.sources.iter().map(|s| s.urn.clone()).collect()
    }

    /// runs `f` once the value is resolved. If it never resolves, `f` is never called
    /// and the result stays unknown.
    pub fn apply<U, F>(self, f: F) -> Output<U>
    where
        F: FnOnce(T) -> U,
    {
        Output {
            value: self.value.map(f),
            sources: self.sources,
        }
    }

    pub fn try_apply<U, E, F>(self, f: F) -> Result<Output<U>, E>
    where
        F: FnOnce(T) -> Result<U, E>,
    {
        let value = match self.value {
            Some(v) => Some(f(v)?),
            None => None,
        };
        Ok(Output {
            value,
            sources: self.sources,
        })
    }
}

impl<T> From<T> for Output<T> {
    fn from(value: T) -> Self {
        Output::known(value)
    }
}

impl From<&str> for Output<String> {
    fn from(value: &str) -> Self {
        Output::known(value.to_string())
    }
}

impl<T: Serialize> Serialize for Output<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.value {
            Some(v) => v.serialize(serializer),
            None => {
                let sources: Vec<String> = self.sources.iter().map(|s| s.to_string()).collect();
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(UNKNOWN_KEY, &sources)?;
                map.end()
            }
        }
    }
}

/// a group of outputs that can be waited on together.
pub trait Join {
    type Value;
    fn join(self) -> Output<Self::Value>;
}

macro_rules! impl_join_tuple {
    ($($name:ident),+) => {
        impl<$($name),+> Join for ($(Output<$name>,)+) {
            type Value = ($($name,)+);

            #[allow(non_snake_case)]
            fn join(self) -> Output<Self::Value> {
                let ($($name,)+) = self;
                let mut sources = BTreeSet::new();
                $( sources.extend($name.sources); )+
                let value = match ($($name.value,)+) {
                    ($(Some($name),)+) => Some(($($name,)+)),
                    _ => None,
                };
                Output { value, sources }
            }
        }
    };
}

impl_join_tuple!(A, B);
impl_join_tuple!(A, B, C);
impl_join_tuple!(A, B, C, D);

impl<T> Join for Vec<Output<T>> {
    type Value = Vec<T>;

    fn join(self) -> Output<Vec<T>> {
        let mut sources = BTreeSet::new();
        let mut values = Some(Vec::with_capacity(self.len()));
        for output in self {
            sources.extend(output.sources);
            values = match (values, output.value) {
                (Some(mut acc), Some(v)) => {
                    acc.push(v);
                    Some(acc)
                }
                _ => None,
            };
        }
        Output {
            value: values,
            sources,
        }
    }
}

/// waits for every output in `outputs` to resolve, eg:
/// `all((bucket_name, oai_arn)).apply(|(bucket, arn)| ...)`
pub fn all<J: Join>(outputs: J) -> Output<J::Value> {
    outputs.join()
}
