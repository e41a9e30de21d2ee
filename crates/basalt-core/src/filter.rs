//! Server-evaluated scan filters.
//!
//! A `Filter` is a predicate tree shipped with a scan and evaluated by the
//! store against each candidate cell, never by the client.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;
use crate::types::{Bytes, Cell};

/// Comparison operator for filter leaves. All comparisons are byte-wise
/// lexicographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Less,
    LessOrEqual,
    Equal,
    NotEqual,
    GreaterOrEqual,
    Greater,
}

impl CompareOp {
    fn matches(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Less => ord == Ordering::Less,
            CompareOp::LessOrEqual => ord != Ordering::Greater,
            CompareOp::Equal => ord == Ordering::Equal,
            CompareOp::NotEqual => ord != Ordering::Equal,
            CompareOp::GreaterOrEqual => ord != Ordering::Less,
            CompareOp::Greater => ord == Ordering::Greater,
        }
    }
}

/// A filter predicate evaluated per cell during a scan.
///
/// Row-coordinate leaves (`RowPrefix`, `RowKey`) pass or fail every cell of
/// one row together; cell-coordinate leaves (`Qualifier`, `Value`) prune
/// individual cells. A row is returned when at least one of its cells
/// survives the whole tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    /// Row key starts with the given prefix.
    RowPrefix(Bytes),
    /// Row key compares against a literal.
    RowKey(CompareOp, Bytes),
    /// Cell qualifier compares against a literal.
    Qualifier(CompareOp, Bytes),
    /// Cell value compares against a literal.
    Value(CompareOp, Bytes),
    /// Every sub-filter must pass. An empty list passes.
    All(Vec<Filter>),
    /// At least one sub-filter must pass.
    Any(Vec<Filter>),
}

/// Maximum nesting depth for filter trees.
const MAX_FILTER_DEPTH: usize = 16;

impl Filter {
    /// Evaluate this filter against one cell of the row at `row_key`.
    ///
    /// Trees nested beyond a fixed depth limit are rejected rather than
    /// recursed into, bounding stack use on hostile input.
    pub fn eval(&self, row_key: &[u8], cell: &Cell) -> Result<bool, FilterError> {
        self.eval_inner(row_key, cell, 0)
    }

    fn eval_inner(&self, row_key: &[u8], cell: &Cell, depth: usize) -> Result<bool, FilterError> {
        if depth > MAX_FILTER_DEPTH {
            return Err(FilterError::TooDeep(MAX_FILTER_DEPTH));
        }

        match self {
            Filter::RowPrefix(prefix) => Ok(row_key.starts_with(prefix)),
            Filter::RowKey(op, key) => Ok(op.matches(row_key.cmp(key.as_slice()))),
            Filter::Qualifier(op, qualifier) => {
                Ok(op.matches(cell.qualifier.as_slice().cmp(qualifier.as_slice())))
            }
            Filter::Value(op, value) => {
                Ok(op.matches(cell.value.as_slice().cmp(value.as_slice())))
            }
            Filter::All(filters) => {
                for f in filters {
                    if !f.eval_inner(row_key, cell, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Filter::Any(filters) => {
                for f in filters {
                    if f.eval_inner(row_key, cell, depth + 1)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    // -- Convenience constructors --

    /// `row_key starts_with prefix`
    pub fn row_prefix(prefix: impl Into<Bytes>) -> Self {
        Filter::RowPrefix(prefix.into())
    }

    /// `row_key <op> key`
    pub fn row_key(op: CompareOp, key: impl Into<Bytes>) -> Self {
        Filter::RowKey(op, key.into())
    }

    /// `qualifier <op> literal`
    pub fn qualifier(op: CompareOp, qualifier: impl Into<Bytes>) -> Self {
        Filter::Qualifier(op, qualifier.into())
    }

    /// `value <op> literal`
    pub fn value(op: CompareOp, value: impl Into<Bytes>) -> Self {
        Filter::Value(op, value.into())
    }

    /// `f1 AND f2 AND ...`
    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::All(filters.into_iter().collect())
    }

    /// `f1 OR f2 OR ...`
    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Any(filters.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(family: &str, qualifier: &[u8], value: &[u8]) -> Cell {
        Cell {
            family: family.to_string(),
            qualifier: qualifier.to_vec(),
            value: value.to_vec(),
            timestamp: 1,
        }
    }

    fn login_cell() -> Cell {
        cell("personal_data", b"login", b"user1")
    }

    // -----------------------------------------------------------------------
    // Compare operators
    // -----------------------------------------------------------------------

    #[test]
    fn test_compare_op_matches() {
        use Ordering::{Equal, Greater, Less};

        assert!(CompareOp::Less.matches(Less));
        assert!(!CompareOp::Less.matches(Equal));

        assert!(CompareOp::LessOrEqual.matches(Less));
        assert!(CompareOp::LessOrEqual.matches(Equal));
        assert!(!CompareOp::LessOrEqual.matches(Greater));

        assert!(CompareOp::Equal.matches(Equal));
        assert!(!CompareOp::Equal.matches(Less));

        assert!(CompareOp::NotEqual.matches(Less));
        assert!(!CompareOp::NotEqual.matches(Equal));

        assert!(CompareOp::GreaterOrEqual.matches(Equal));
        assert!(CompareOp::GreaterOrEqual.matches(Greater));
        assert!(!CompareOp::GreaterOrEqual.matches(Less));

        assert!(CompareOp::Greater.matches(Greater));
        assert!(!CompareOp::Greater.matches(Equal));
    }

    // -----------------------------------------------------------------------
    // Row-coordinate leaves
    // -----------------------------------------------------------------------

    #[test]
    fn test_filter_row_prefix() {
        let c = login_cell();
        assert!(Filter::row_prefix("u1").eval(b"u1", &c).unwrap());
        assert!(Filter::row_prefix("u").eval(b"u1", &c).unwrap());
        assert!(Filter::row_prefix("").eval(b"u1", &c).unwrap());
        assert!(!Filter::row_prefix("u2").eval(b"u1", &c).unwrap());
        assert!(!Filter::row_prefix("u10").eval(b"u1", &c).unwrap());
    }

    #[test]
    fn test_filter_row_key_bounds() {
        let c = login_cell();
        let ge_u2 = Filter::row_key(CompareOp::GreaterOrEqual, "u2");
        assert!(!ge_u2.eval(b"u1", &c).unwrap());
        assert!(ge_u2.eval(b"u2", &c).unwrap());
        assert!(ge_u2.eval(b"u3", &c).unwrap());

        let ne_u1 = Filter::row_key(CompareOp::NotEqual, "u1");
        assert!(!ne_u1.eval(b"u1", &c).unwrap());
        assert!(ne_u1.eval(b"u2", &c).unwrap());
    }

    // -----------------------------------------------------------------------
    // Cell-coordinate leaves
    // -----------------------------------------------------------------------

    #[test]
    fn test_filter_qualifier() {
        let ge_login = Filter::qualifier(CompareOp::GreaterOrEqual, "login");
        assert!(ge_login.eval(b"u1", &login_cell()).unwrap());
        assert!(
            ge_login
                .eval(b"u1", &cell("personal_data", b"password", b"x"))
                .unwrap()
        );
        // "email" sorts before "login".
        assert!(
            !ge_login
                .eval(b"u1", &cell("personal_data", b"email", b"x"))
                .unwrap()
        );
    }

    #[test]
    fn test_filter_value() {
        let eq = Filter::value(CompareOp::Equal, "user1");
        assert!(eq.eval(b"u1", &login_cell()).unwrap());
        assert!(
            !eq.eval(b"u1", &cell("personal_data", b"login", b"user2"))
                .unwrap()
        );

        let lt = Filter::value(CompareOp::Less, "user2");
        assert!(lt.eval(b"u1", &login_cell()).unwrap());
    }

    // -----------------------------------------------------------------------
    // Combinators
    // -----------------------------------------------------------------------

    #[test]
    fn test_filter_all() {
        let c = login_cell();
        let f = Filter::all([
            Filter::row_prefix("u1"),
            Filter::qualifier(CompareOp::GreaterOrEqual, "login"),
        ]);
        assert!(f.eval(b"u1", &c).unwrap());
        assert!(!f.eval(b"u2", &c).unwrap());

        let f = Filter::all([
            Filter::row_prefix("u1"),
            Filter::qualifier(CompareOp::Greater, "login"),
        ]);
        assert!(!f.eval(b"u1", &c).unwrap());
    }

    #[test]
    fn test_filter_all_empty_passes() {
        assert!(Filter::all([]).eval(b"u1", &login_cell()).unwrap());
    }

    #[test]
    fn test_filter_any() {
        let c = login_cell();
        let f = Filter::any([
            Filter::row_prefix("u9"),
            Filter::value(CompareOp::Equal, "user1"),
        ]);
        assert!(f.eval(b"u1", &c).unwrap());

        let f = Filter::any([
            Filter::row_prefix("u9"),
            Filter::value(CompareOp::Equal, "nope"),
        ]);
        assert!(!f.eval(b"u1", &c).unwrap());

        assert!(!Filter::any([]).eval(b"u1", &c).unwrap());
    }

    #[test]
    fn test_filter_nested_combinators() {
        let f = Filter::all([
            Filter::any([Filter::row_prefix("u1"), Filter::row_prefix("u2")]),
            Filter::qualifier(CompareOp::NotEqual, "password"),
        ]);
        assert!(f.eval(b"u2", &login_cell()).unwrap());
        assert!(!f.eval(b"u3", &login_cell()).unwrap());
        assert!(
            !f.eval(b"u1", &cell("personal_data", b"password", b"x"))
                .unwrap()
        );
    }

    // -----------------------------------------------------------------------
    // Depth limit
    // -----------------------------------------------------------------------

    #[test]
    fn test_filter_depth_limit() {
        let mut f = Filter::row_prefix("u1");
        for _ in 0..=MAX_FILTER_DEPTH {
            f = Filter::all([f]);
        }
        assert!(matches!(
            f.eval(b"u1", &login_cell()),
            Err(FilterError::TooDeep(_))
        ));

        // One level inside the limit still evaluates.
        let mut f = Filter::row_prefix("u1");
        for _ in 0..MAX_FILTER_DEPTH {
            f = Filter::all([f]);
        }
        assert!(f.eval(b"u1", &login_cell()).unwrap());
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    #[test]
    fn test_filter_serde_round_trip() {
        let f = Filter::all([
            Filter::row_prefix("u1"),
            Filter::qualifier(CompareOp::GreaterOrEqual, "login"),
        ]);
        let json = serde_json::to_string(&f).unwrap();
        let back: Filter = serde_json::from_str(&json).unwrap();
        assert_eq!(f, back);
    }
}
