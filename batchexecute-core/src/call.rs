//! A single remote call.

use crate::value::Value;

/// One remote call: an endpoint id, its positional arguments and an optional
/// context used to derive the request's `source-path`.
///
/// # Example
///
/// ```
/// use batchexecute_core::Call;
///
/// let call = Call::new("rLM1Ne").arg("nb-123").context("nb-123");
/// assert_eq!(call.id(), "rLM1Ne");
/// assert_eq!(call.source_path(), "/notebook/nb-123");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    id: String,
    args: Vec<Value>,
    context: Option<String>,
}

impl Call {
    /// Create a call with no arguments.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            args: Vec::new(),
            context: None,
        }
    }

    /// Append one argument.
    pub fn arg<V: Into<Value>>(mut self, value: V) -> Self {
        self.args.push(value.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    /// Set the context (a notebook id) the call applies to.
    pub fn context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    /// The endpoint id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The positional arguments.
    pub fn arguments(&self) -> &[Value] {
        &self.args
    }

    /// The context, if any.
    pub fn context_id(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// The `source-path` query parameter for this call.
    pub fn source_path(&self) -> String {
        match self.context.as_deref() {
            Some(context) if !context.is_empty() => format!("/notebook/{context}"),
            _ => "/".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_path_without_context() {
        assert_eq!(Call::new("wXbhsf").source_path(), "/");
        assert_eq!(Call::new("wXbhsf").context("").source_path(), "/");
    }

    #[test]
    fn test_args_accumulate_in_order() {
        let call = Call::new("CCqFvf")
            .arg("title")
            .args(vec![Value::Null, Value::from(1)]);
        assert_eq!(
            call.arguments(),
            &[Value::from("title"), Value::Null, Value::from(1)]
        );
    }
}
