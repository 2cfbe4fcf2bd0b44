//! Named, fixed-length call arguments for a periodic task.
//!
//! An [`ArgumentSet`] behaves like a mutable named tuple: the set of names is fixed when it is
//! built, values may change at any time (and may start out unbound), and iteration always
//! follows declaration order so the values can be handed to a function positionally.

use std::collections::HashMap;

use crate::error::ProgressError;

/// Argument names may not start with this marker.
pub const RESERVED_PREFIX: &str = "__";

/// Names exposed by the runner itself; arguments may not shadow them.
pub const RESERVED_NAMES: &[&str] = &[
    "args",
    "interval",
    "is_started",
    "is_stopped",
    "join",
    "lock",
    "name",
    "start",
    "state",
    "stop",
    "task",
];

/// Which end of the name list initial values are bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillFrom {
    /// Bind from the first name; stops at the shorter of names and values.
    Head,
    /// Bind from the last name backwards, leaving the left-most names unbound.
    Tail,
}

pub fn is_reserved_name(name: &str) -> bool {
    name.is_empty() || name.starts_with(RESERVED_PREFIX) || RESERVED_NAMES.contains(&name)
}

#[derive(Clone, Debug)]
pub struct ArgumentSet<V> {
    names: Vec<String>,
    values: Vec<Option<V>>,
    index: HashMap<String, usize>,
}

impl<V> ArgumentSet<V> {
    pub fn new<I, S>(names: I, values: Option<Vec<V>>, fill: FillFrom) -> Result<Self, ProgressError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            if is_reserved_name(name) {
                return Err(ProgressError::InvalidArgumentName {
                    name: name.clone(),
                    function: None,
                });
            }
            if index.insert(name.clone(), position).is_some() {
                return Err(ProgressError::DuplicateArgument(name.clone()));
            }
        }

        let mut slots: Vec<Option<V>> = names.iter().map(|_| None).collect();
        if let Some(values) = values {
            match fill {
                FillFrom::Head => {
                    for (slot, value) in slots.iter_mut().zip(values) {
                        *slot = Some(value);
                    }
                }
                FillFrom::Tail => {
                    for (slot, value) in slots.iter_mut().rev().zip(values.into_iter().rev()) {
                        *slot = Some(value);
                    }
                }
            }
        }

        Ok(Self {
            names,
            values: slots,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Result<usize, ProgressError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ProgressError::UnknownArgument(name.to_string()))
    }

    /// Positional access; `Ok(None)` means the argument exists but has no value yet.
    pub fn get(&self, index: usize) -> Result<Option<&V>, ProgressError> {
        match self.values.get(index) {
            Some(value) => Ok(value.as_ref()),
            None => Err(ProgressError::IndexOutOfRange {
                index,
                len: self.len(),
            }),
        }
    }

    pub fn get_by_name(&self, name: &str) -> Result<Option<&V>, ProgressError> {
        let index = self.index_of(name)?;
        Ok(self.values[index].as_ref())
    }

    pub fn set_by_name(&mut self, name: &str, value: V) -> Result<(), ProgressError> {
        let index = self.index_of(name)?;
        self.values[index] = Some(value);
        Ok(())
    }

    pub fn is_bound(&self, name: &str) -> Result<bool, ProgressError> {
        Ok(self.get_by_name(name)?.is_some())
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            inner: self.values.iter(),
        }
    }

    /// Name/value pairs in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&V>)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Option::as_ref))
    }
}

impl<V: Clone> ArgumentSet<V> {
    /// Clones every value in declaration order, failing on the first unbound argument.
    pub fn bound_values(&self) -> Result<Vec<V>, ProgressError> {
        self.entries()
            .map(|(name, value)| {
                value
                    .cloned()
                    .ok_or_else(|| ProgressError::UnboundArgument(name.to_string()))
            })
            .collect()
    }

    pub fn snapshot(&self) -> Vec<Option<V>> {
        self.values.clone()
    }
}

pub struct Iter<'a, V> {
    inner: std::slice::Iter<'a, Option<V>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = Option<&'a V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(Option::as_ref)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<'a, V> IntoIterator for &'a ArgumentSet<V> {
    type Item = Option<&'a V>;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
