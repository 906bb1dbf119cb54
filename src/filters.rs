//! Filter registry trait for `:name` blocks.
//!
//! Filters transform the raw text of a block at compile time (markdown,
//! stylus, ...). The compiler only knows their names; implementations of
//! [`FilterRegistry`] supply the transformation.

use fxhash::FxHashMap;
use indexmap::IndexMap;

/// Options passed to a filter: the block's attributes in source order,
/// plus `filename` when the compile has one.
pub type FilterOptions = IndexMap<String, String>;

/// Result type for filter application.
pub type FilterResult<T> = Result<T, FilterError>;

/// Error type for filter application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// No filter registered under this name.
    Unknown(String),
    /// The filter ran and rejected its input.
    Failed(String),
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::Unknown(name) => write!(f, "unknown filter \":{}\"", name),
            FilterError::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FilterError {}

/// Source of filter implementations.
pub trait FilterRegistry {
    /// Transform `text` with the filter called `name`.
    fn apply(&self, name: &str, text: &str, options: &FilterOptions) -> FilterResult<String>;

    /// Whether a filter called `name` exists.
    fn contains(&self, name: &str) -> bool;
}

/// A registry with no filters. Every filter block is an error.
pub struct NoFilters;

impl FilterRegistry for NoFilters {
    fn apply(&self, name: &str, _text: &str, _options: &FilterOptions) -> FilterResult<String> {
        Err(FilterError::Unknown(name.to_string()))
    }

    fn contains(&self, _name: &str) -> bool {
        false
    }
}

type FilterFn = Box<dyn Fn(&str, &FilterOptions) -> FilterResult<String> + Send + Sync>;

/// Filters registered as closures.
#[derive(Default)]
pub struct FilterSet {
    filters: FxHashMap<String, FilterFn>,
}

impl FilterSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, filter: F)
    where
        F: Fn(&str, &FilterOptions) -> FilterResult<String> + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Box::new(filter));
    }

    /// Builder form of [`FilterSet::register`].
    pub fn with<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&str, &FilterOptions) -> FilterResult<String> + Send + Sync + 'static,
    {
        self.register(name, filter);
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl std::fmt::Debug for FilterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.filters.keys().collect();
        names.sort();
        f.debug_struct("FilterSet").field("filters", &names).finish()
    }
}

impl FilterRegistry for FilterSet {
    fn apply(&self, name: &str, text: &str, options: &FilterOptions) -> FilterResult<String> {
        let filter = self
            .filters
            .get(name)
            .ok_or_else(|| FilterError::Unknown(name.to_string()))?;
        filter(text, options)
    }

    fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filters_rejects_everything() {
        let err = NoFilters
            .apply("markdown", "# hi", &FilterOptions::new())
            .unwrap_err();
        assert_eq!(err, FilterError::Unknown("markdown".to_string()));
        assert_eq!(err.to_string(), "unknown filter \":markdown\"");
    }

    #[test]
    fn test_filter_set_dispatch() {
        let filters = FilterSet::new()
            .with("upper", |text, _| Ok(text.to_uppercase()))
            .with("fail", |_, _| Err(FilterError::Failed("nope".to_string())));
        assert!(filters.contains("upper"));
        assert_eq!(filters.len(), 2);
        assert_eq!(
            filters.apply("upper", "abc", &FilterOptions::new()).unwrap(),
            "ABC"
        );
        assert!(filters.apply("fail", "", &FilterOptions::new()).is_err());
        assert!(filters.apply("missing", "", &FilterOptions::new()).is_err());
    }

    #[test]
    fn test_options_reach_the_filter() {
        let filters = FilterSet::new().with("wrap", |text, options| {
            let tag = options.get("tag").map(String::as_str).unwrap_or("p");
            Ok(format!("<{0}>{1}</{0}>", tag, text))
        });
        let mut options = FilterOptions::new();
        options.insert("tag".to_string(), "em".to_string());
        assert_eq!(filters.apply("wrap", "x", &options).unwrap(), "<em>x</em>");
    }
}
