//! # Property Paths
//!
//! A small path language (`a.b[2].c`) compiled into a chain of accessors
//! over nested maps and arrays.
//!
//! Property shapes are resource-type-dependent and defined externally by
//! knowledge-base templates, so rule evaluation and id rewriting manipulate
//! them generically through this module: get / set / append /
//! remove-by-value, plus a depth-first walk over every scalar and reference
//! with per-node skip-subtree and stop signals.

use crate::types::{OpsError, PropertyBag, Value};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// PATH REPRESENTATION
// =============================================================================

/// One step of a compiled property path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PathSegment {
    /// Map key access: `a`.
    Field(String),
    /// Array index access: `[2]`.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{name}"),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// A compiled property path.
///
/// Grammar: dot-separated fields, each optionally followed by one or more
/// bracketed indices — `Environment.Variables[0].Name`. The first segment is
/// always a field (property bags are maps at the top level).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PropertyPath {
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    /// Compile a path from its text form.
    pub fn parse(raw: &str) -> Result<Self, OpsError> {
        let err = |msg: &str| OpsError::InvalidPropertyPath(raw.to_string(), msg.to_string());

        if raw.is_empty() {
            return Err(err("empty path"));
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            if part.is_empty() {
                return Err(err("empty segment"));
            }
            let mut rest = part;
            // Field portion runs until the first '['.
            let field_end = rest.find('[').unwrap_or(rest.len());
            let field = &rest[..field_end];
            if field.is_empty() {
                return Err(err("segment starts with an index"));
            }
            segments.push(PathSegment::Field(field.to_string()));
            rest = &rest[field_end..];

            while !rest.is_empty() {
                let Some(close) = rest.find(']') else {
                    return Err(err("unterminated index"));
                };
                if !rest.starts_with('[') {
                    return Err(err("malformed index"));
                }
                let digits = &rest[1..close];
                let index: usize = digits
                    .parse()
                    .map_err(|_| err("index is not a non-negative integer"))?;
                segments.push(PathSegment::Index(index));
                rest = &rest[close + 1..];
            }
        }

        Ok(Self { segments })
    }

    /// The compiled segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The first field name of the path.
    #[must_use]
    pub fn root_field(&self) -> &str {
        match self.segments.first() {
            Some(PathSegment::Field(name)) => name,
            _ => "",
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Read the value at this path, if present.
    #[must_use]
    pub fn get<'a>(&self, bag: &'a PropertyBag) -> Option<&'a Value> {
        let (first, rest) = self.split_first()?;
        let mut current = bag.get(first)?;
        for segment in rest {
            current = match (segment, current) {
                (PathSegment::Field(name), Value::Map(m)) => m.get(name)?,
                (PathSegment::Index(i), Value::Array(a)) => a.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Write `value` at this path, creating intermediate maps as needed.
    ///
    /// Descending a field into a non-map, or an index into a non-array or
    /// past its end, is a type error — arrays are never created implicitly.
    pub fn set(&self, bag: &mut PropertyBag, value: Value) -> Result<(), OpsError> {
        let slot = self.slot_mut(bag, true)?;
        *slot = value;
        Ok(())
    }

    /// Append `value` to the array at this path.
    ///
    /// A missing or null target becomes a fresh array; any other non-array
    /// target is a type error.
    pub fn append(&self, bag: &mut PropertyBag, value: Value) -> Result<(), OpsError> {
        let slot = self.slot_mut(bag, true)?;
        match slot {
            Value::Array(items) => {
                items.push(value);
                Ok(())
            }
            Value::Null => {
                *slot = Value::Array(vec![value]);
                Ok(())
            }
            other => Err(OpsError::PropertyType {
                path: self.to_string(),
                expected: "array",
                found: other.kind(),
            }),
        }
    }

    /// Remove at this path.
    ///
    /// - `value == None`: remove the addressed element itself — a map key is
    ///   deleted, an array index is removed with later indices shifting down.
    /// - `value == Some(v)`: the addressed element must be an array; every
    ///   occurrence of `v` is removed from it.
    pub fn remove(&self, bag: &mut PropertyBag, value: Option<&Value>) -> Result<(), OpsError> {
        if let Some(needle) = value {
            let slot = self.slot_mut(bag, false)?;
            return match slot {
                Value::Array(items) => {
                    items.retain(|item| item != needle);
                    Ok(())
                }
                other => Err(OpsError::PropertyType {
                    path: self.to_string(),
                    expected: "array",
                    found: other.kind(),
                }),
            };
        }

        // Removing the element itself: address the parent, then detach.
        let Some((last, parents)) = self.segments.split_last() else {
            return Err(OpsError::InvalidPropertyPath(
                self.to_string(),
                "empty path".to_string(),
            ));
        };
        let parent_path = Self {
            segments: parents.to_vec(),
        };

        if parents.is_empty() {
            // Top-level field removal straight off the bag.
            if let PathSegment::Field(name) = last {
                bag.remove(name);
                return Ok(());
            }
            return Err(OpsError::InvalidPropertyPath(
                self.to_string(),
                "path starts with an index".to_string(),
            ));
        }

        let parent = parent_path.slot_mut(bag, false)?;
        match (last, parent) {
            (PathSegment::Field(name), Value::Map(m)) => {
                m.remove(name);
                Ok(())
            }
            (PathSegment::Index(i), Value::Array(items)) => {
                if *i >= items.len() {
                    return Err(OpsError::IndexOutOfBounds {
                        path: self.to_string(),
                        index: *i,
                        len: items.len(),
                    });
                }
                items.remove(*i);
                Ok(())
            }
            (_, other) => Err(OpsError::PropertyType {
                path: parent_path.to_string(),
                expected: "map or array",
                found: other.kind(),
            }),
        }
    }

    fn split_first(&self) -> Option<(&str, &[PathSegment])> {
        match self.segments.split_first() {
            Some((PathSegment::Field(name), rest)) => Some((name, rest)),
            _ => None,
        }
    }

    /// Navigate to the slot this path addresses, optionally creating
    /// intermediate maps (and the leaf itself, as `Null`) along the way.
    fn slot_mut<'a>(
        &self,
        bag: &'a mut PropertyBag,
        create: bool,
    ) -> Result<&'a mut Value, OpsError> {
        let Some((first, rest)) = self.split_first() else {
            return Err(OpsError::InvalidPropertyPath(
                self.to_string(),
                "path starts with an index".to_string(),
            ));
        };

        if create {
            bag.entry(first.to_string()).or_insert(Value::Null);
        }
        let mut current = bag.get_mut(first).ok_or_else(|| OpsError::PropertyType {
            path: self.to_string(),
            expected: "present value",
            found: "null",
        })?;

        for segment in rest {
            match segment {
                PathSegment::Field(name) => {
                    if create && current.is_null() {
                        *current = Value::Map(PropertyBag::new());
                    }
                    match current {
                        Value::Map(m) => {
                            if create {
                                m.entry(name.clone()).or_insert(Value::Null);
                            }
                            current =
                                m.get_mut(name).ok_or_else(|| OpsError::PropertyType {
                                    path: self.to_string(),
                                    expected: "present value",
                                    found: "null",
                                })?;
                        }
                        other => {
                            return Err(OpsError::PropertyType {
                                path: self.to_string(),
                                expected: "map",
                                found: other.kind(),
                            });
                        }
                    }
                }
                PathSegment::Index(i) => match current {
                    Value::Array(items) => {
                        let len = items.len();
                        current = items.get_mut(*i).ok_or(OpsError::IndexOutOfBounds {
                            path: self.to_string(),
                            index: *i,
                            len,
                        })?;
                    }
                    other => {
                        return Err(OpsError::PropertyType {
                            path: self.to_string(),
                            expected: "array",
                            found: other.kind(),
                        });
                    }
                },
            }
        }
        Ok(current)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            match segment {
                PathSegment::Field(name) => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{name}")?;
                }
                PathSegment::Index(i) => write!(f, "[{i}]")?,
            }
            first = false;
        }
        Ok(())
    }
}

impl FromStr for PropertyPath {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// =============================================================================
// GENERIC PROPERTY WALK
// =============================================================================

/// Control signal returned by a walk visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Keep walking.
    Continue,
    /// Do not descend into this value's children.
    SkipSubtree,
    /// Abort the whole walk.
    Stop,
}

/// Depth-first walk over every value in a property bag, without knowing
/// resource-specific shapes.
///
/// The visitor receives each value's path text and the value itself —
/// containers before their children. Returns `false` when the visitor
/// stopped the walk early.
pub fn walk_properties<F>(bag: &PropertyBag, visit: &mut F) -> bool
where
    F: FnMut(&str, &Value) -> Walk,
{
    for (key, value) in bag {
        if !walk_value(key, value, visit) {
            return false;
        }
    }
    true
}

fn walk_value<F>(path: &str, value: &Value, visit: &mut F) -> bool
where
    F: FnMut(&str, &Value) -> Walk,
{
    match visit(path, value) {
        Walk::Stop => return false,
        Walk::SkipSubtree => return true,
        Walk::Continue => {}
    }
    match value {
        Value::Map(entries) => {
            for (key, child) in entries {
                if !walk_value(&format!("{path}.{key}"), child, visit) {
                    return false;
                }
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                if !walk_value(&format!("{path}[{i}]"), child, visit) {
                    return false;
                }
            }
        }
        _ => {}
    }
    true
}

/// Apply `transform` to every leaf value (scalars and references) in a bag.
///
/// Containers are traversed, not passed to the transform. Used by the
/// atomic id-rewrite operation.
pub fn map_leaves<F>(bag: &mut PropertyBag, transform: &mut F)
where
    F: FnMut(&mut Value),
{
    for value in bag.values_mut() {
        map_leaves_value(value, transform);
    }
}

fn map_leaves_value<F>(value: &mut Value, transform: &mut F)
where
    F: FnMut(&mut Value),
{
    match value {
        Value::Map(entries) => {
            for child in entries.values_mut() {
                map_leaves_value(child, transform);
            }
        }
        Value::Array(items) => {
            for child in items.iter_mut() {
                map_leaves_value(child, transform);
            }
        }
        leaf => transform(leaf),
    }
}

// =============================================================================
// TESTS
// =============================================================================
