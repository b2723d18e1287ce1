//! Composable filters over stored documents.
//!
//! A [`Predicate`] is a boolean tree of [`Clause`] leaves. Each leaf addresses a
//! dotted document path (`location.city`) and carries its own evaluation rule,
//! so a backend either evaluates the tree directly ([`Predicate::matches`]) or
//! compiles it into its native query language.

use std::cmp::Ordering;

use bson::{Bson, Document};

/// A single filter condition against one document path.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Value at `path` equals `value`. An unset path never matches.
    Eq { path: &'static str, value: Bson },
    /// Value at `path` is greater than or equal to `value`.
    Gte { path: &'static str, value: Bson },
    /// Value at `path` is less than or equal to `value`.
    Lte { path: &'static str, value: Bson },
    /// String at `path` contains `needle`, ignoring case.
    Contains { path: &'static str, needle: String },
    /// Value at `path` (or any element, when it is an array) is one of `values`.
    AnyOf { path: &'static str, values: Vec<Bson> },
    /// `path` is absent or null.
    Missing { path: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr<B> {
    And(Box<Expr<B>>, Box<Expr<B>>),
    Or(Box<Expr<B>>, Box<Expr<B>>),
    Literal(B),
}

pub type Predicate = Expr<Clause>;

impl<B> Expr<B> {
    pub fn and(a: Self, b: Self) -> Self {
        Expr::And(Box::new(a), Box::new(b))
    }

    pub fn or(a: Self, b: Self) -> Self {
        Expr::Or(Box::new(a), Box::new(b))
    }

    pub fn val(v: B) -> Self {
        Expr::Literal(v)
    }

    /// Folds `nodes` into a left-leaning chain joined by `fold`; `None` when empty.
    pub fn fold_with(
        nodes: impl IntoIterator<Item = Self>,
        fold: impl Fn(Self, Self) -> Self,
    ) -> Option<Self> {
        nodes.into_iter().fold(None, |acc, node| {
            Some(match acc {
                Some(acc) => fold(acc, node),
                None => node,
            })
        })
    }
}

impl Predicate {
    pub fn equals(path: &'static str, value: impl Into<Bson>) -> Self {
        Expr::val(Clause::Eq {
            path,
            value: value.into(),
        })
    }

    pub fn gte(path: &'static str, value: impl Into<Bson>) -> Self {
        Expr::val(Clause::Gte {
            path,
            value: value.into(),
        })
    }

    pub fn lte(path: &'static str, value: impl Into<Bson>) -> Self {
        Expr::val(Clause::Lte {
            path,
            value: value.into(),
        })
    }

    pub fn contains(path: &'static str, needle: impl Into<String>) -> Self {
        Expr::val(Clause::Contains {
            path,
            needle: needle.into(),
        })
    }

    pub fn any_of<V: Into<Bson>>(path: &'static str, values: impl IntoIterator<Item = V>) -> Self {
        Expr::val(Clause::AnyOf {
            path,
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn missing(path: &'static str) -> Self {
        Expr::val(Clause::Missing { path })
    }

    /// The base clause of every public search.
    pub fn published() -> Self {
        Predicate::equals("published", true)
    }

    /// Conjunction of `base` with every clause in `clauses`.
    pub fn all_of(base: Predicate, clauses: Vec<Predicate>) -> Self {
        Expr::fold_with(std::iter::once(base).chain(clauses), Expr::and)
            .unwrap_or_else(Predicate::published)
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Expr::And(a, b) => a.matches(doc) && b.matches(doc),
            Expr::Or(a, b) => a.matches(doc) || b.matches(doc),
            Expr::Literal(clause) => clause.matches(doc),
        }
    }
}

impl Clause {
    pub fn path(&self) -> &'static str {
        match self {
            Clause::Eq { path, .. }
            | Clause::Gte { path, .. }
            | Clause::Lte { path, .. }
            | Clause::Contains { path, .. }
            | Clause::AnyOf { path, .. }
            | Clause::Missing { path } => *path,
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let found = lookup(doc, self.path());
        match self {
            Clause::Missing { .. } => found.is_none(),
            Clause::Eq { value, .. } => found.map_or(false, |f| same_value(f, value)),
            Clause::Gte { value, .. } => found
                .and_then(|f| compare(f, value))
                .map_or(false, |ord| ord != Ordering::Less),
            Clause::Lte { value, .. } => found
                .and_then(|f| compare(f, value))
                .map_or(false, |ord| ord != Ordering::Greater),
            Clause::Contains { needle, .. } => match found {
                Some(Bson::String(s)) => s.to_lowercase().contains(&needle.to_lowercase()),
                _ => false,
            },
            Clause::AnyOf { values, .. } => match found {
                Some(Bson::Array(items)) => items
                    .iter()
                    .any(|item| values.iter().any(|v| same_value(item, v))),
                Some(other) => values.iter().any(|v| same_value(other, v)),
                None => false,
            },
        }
    }
}

/// Resolves a dotted path; null is reported as absent.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            _ => return None,
        };
    }
    match current {
        Bson::Null => None,
        value => Some(value),
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn same_value(a: &Bson, b: &Bson) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Orders two values of the same kind; mixed kinds are incomparable.
pub fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        _ => as_number(a)?.partial_cmp(&as_number(b)?),
    }
}
