//! Captured path parameters.

use smallvec::SmallVec;

/// Parameters stored inline before spilling to the heap.
const INLINE_PARAMS: usize = 4;

/// Values captured by a route's `{name}` placeholders, in path order.
///
/// Actions receive them positionally; the placeholder names are kept for
/// logging and for callers that prefer lookup by name.
///
/// # Example
///
/// ```rust
/// use portico_router::Params;
///
/// let mut params = Params::new();
/// params.push("org", "acme");
/// params.push("id", "42");
///
/// assert_eq!(params.get(1), Some("42"));
/// assert_eq!(params.named("org"), Some("acme"));
/// assert_eq!(params.values().collect::<Vec<_>>(), vec!["acme", "42"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty parameter list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a captured value.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// The value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.inner.get(index).map(|(_, v)| v.as_str())
    }

    /// The value captured by placeholder `name`.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of captured values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Captured values in order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(|(_, v)| v.as_str())
    }

    /// `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// The captured values as an owned list.
    #[must_use]
    pub fn into_values(self) -> Vec<String> {
        self.inner.into_iter().map(|(_, v)| v).collect()
    }
}

impl From<Vec<String>> for Params {
    /// Builds unnamed positional parameters (`0`, `1`, ...).
    fn from(values: Vec<String>) -> Self {
        Self {
            inner: values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
        }
    }
}
