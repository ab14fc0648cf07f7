//! Union summarization shared by the normalizers
//!
//! Each source format spells a union differently (an Avro type array, a JSON
//! Schema `oneOf` or `type` array, an OpenMetadata `UNION` column). They all
//! reduce to a list of alternatives where one may denote null, so the
//! normalizers hand their alternatives and a per-alternative parser to
//! [`summarize_union`].

use std::collections::{HashMap, HashSet};

/// Separator between alternatives in a display string
pub const UNION_SEPARATOR: &str = " | ";

/// Data type tag for sites with two or more non-null alternatives
pub const UNION_TYPE: &str = "union";

/// Data type and display string for a site with no non-null alternative
pub const NULL_TYPE: &str = "null";

/// Resolved type of a field, property or column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// Coarse type tag
    pub data_type: String,
    /// Human-facing type string
    pub display: String,
    /// Whether a null alternative was present
    pub nullable: bool,
}

impl TypeInfo {
    pub fn new(data_type: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            display: display.into(),
            nullable: false,
        }
    }

    /// Same string for the tag and the display
    pub fn plain(data_type: impl Into<String>) -> Self {
        let data_type = data_type.into();
        Self::new(data_type.clone(), data_type)
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn is_union(&self) -> bool {
        self.data_type == UNION_TYPE
    }
}

/// Separate the null alternative from the rest, keeping declaration order
pub fn split_nullable<'a, T, N>(alternatives: &'a [T], is_null: N) -> (bool, Vec<&'a T>)
where
    N: Fn(&T) -> bool,
{
    let nullable = alternatives.iter().any(&is_null);
    let non_null = alternatives.iter().filter(|alt| !is_null(*alt)).collect();
    (nullable, non_null)
}

/// Summarize a list of union alternatives
///
/// - no non-null alternative: `null` / `null`
/// - one: whatever `parse` says about it (trivial unions unwrap transparently)
/// - two or more: `union`, displays joined in declaration order
///
/// The returned `nullable` flag is the union's own: it is set when any
/// alternative satisfies `is_null`, regardless of what `parse` reports.
pub fn summarize_union<T, N, P>(alternatives: &[T], is_null: N, parse: P) -> TypeInfo
where
    N: Fn(&T) -> bool,
    P: Fn(&T) -> TypeInfo,
{
    let (nullable, non_null) = split_nullable(alternatives, is_null);

    let info = match non_null.as_slice() {
        [] => TypeInfo::plain(NULL_TYPE),
        [single] => parse(*single),
        many => {
            let displays: Vec<String> = many.iter().map(|alt| parse(*alt).display).collect();
            TypeInfo::new(UNION_TYPE, join_alternatives(&displays))
        }
    };

    info.with_nullable(nullable)
}

/// Join alternative names exactly as declared
pub fn join_alternatives<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|name| name.as_ref())
        .collect::<Vec<_>>()
        .join(UNION_SEPARATOR)
}

/// Join alternative names, collapsing repeats and keeping first-occurrence order
pub fn join_distinct<S: AsRef<str>>(names: &[S]) -> String {
    let mut distinct: Vec<&str> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        if !distinct.contains(&name) {
            distinct.push(name);
        }
    }
    distinct.join(UNION_SEPARATOR)
}

/// Hands out branch labels that are unique among the siblings of one union site
///
/// The first occurrence of a label is kept as is; repeats become `label#2`,
/// `label#3`, ... skipping any suffix already handed out, including labels
/// declared that way.
#[derive(Debug, Default)]
pub struct BranchLabels {
    repeats: HashMap<String, usize>,
    issued: HashSet<String>,
}

impl BranchLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, label: String) -> String {
        if self.issued.insert(label.clone()) {
            return label;
        }
        let next = self.repeats.entry(label.clone()).or_insert(1);
        loop {
            *next += 1;
            let candidate = format!("{}#{}", label, next);
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}
