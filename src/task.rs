use std::error::Error;
use std::fmt;

use crate::args::{ArgumentSet, FillFrom};
use crate::error::ProgressError;

/// What a task body may fail with. Any error type boxes into it, as does a `String`.
pub type TaskError = Box<dyn Error + Send + Sync>;

pub(crate) type Body<V> = Box<dyn FnMut(&[V]) -> Result<(), TaskError> + Send>;

/// A trailing catch-all parameter. Tasks declaring one cannot be run periodically: the runner
/// only knows how to pass a fixed list of named positional arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RestParam {
    /// `*name`
    Positional(String),
    /// `**name`
    Keyword(String),
}

impl fmt::Display for RestParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positional(name) => write!(f, "*{}", name),
            Self::Keyword(name) => write!(f, "**{}", name),
        }
    }
}

/// A named function with a declared parameter list.
///
/// Defaults bind to the trailing parameters, so `Task::new("f", ["a", "b", "c"], body)
/// .with_defaults(vec![2, 3])` leaves `a` unbound until the owner sets it.
pub struct Task<V> {
    name: String,
    params: Vec<String>,
    defaults: Vec<V>,
    rest: Vec<RestParam>,
    body: Body<V>,
}

impl<V> Task<V> {
    pub fn new<I, S, F>(name: impl Into<String>, params: I, body: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnMut(&[V]) -> Result<(), TaskError> + Send + 'static,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            defaults: Vec::new(),
            rest: Vec::new(),
            body: Box::new(body),
        }
    }

    pub fn with_defaults(mut self, defaults: Vec<V>) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_rest(mut self, rest: RestParam) -> Self {
        self.rest.push(rest);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn rest(&self) -> &[RestParam] {
        &self.rest
    }

    /// Checks the declared shape and builds the argument set the task will be called with.
    pub(crate) fn into_parts(self) -> Result<(String, ArgumentSet<V>, Body<V>), ProgressError> {
        if !self.rest.is_empty() {
            let declared: Vec<String> = self.rest.iter().map(ToString::to_string).collect();
            return Err(ProgressError::InvalidFunction {
                function: self.name,
                reason: format!(
                    "only functions with a fixed number of arguments are accepted (declares {})",
                    declared.join(", ")
                ),
            });
        }
        if self.defaults.len() > self.params.len() {
            return Err(ProgressError::InvalidFunction {
                reason: format!(
                    "{} defaults declared for {} parameters",
                    self.defaults.len(),
                    self.params.len()
                ),
                function: self.name,
            });
        }
        let args = ArgumentSet::new(self.params, Some(self.defaults), FillFrom::Tail)
            .map_err(|err| err.with_function(&self.name))?;
        Ok((self.name, args, self.body))
    }
}

impl<V> fmt::Debug for Task<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("defaults", &self.defaults.len())
            .field("rest", &self.rest)
            .finish_non_exhaustive()
    }
}
