// expr.rs — Tensor expression fragments
//
// Minimal symbolic IR describing how a flat kernel buffer maps onto the
// structured index space of the surrounding expression tree. The argument
// layer builds these fragments; the downstream compiler consumes them when
// emitting output-accumulation statements. Four node kinds are enough:
// named variables, contiguous views, reshapes, and indexed access.
//
// Constructor preconditions are asserted — a violation is a defect in the
// caller's shape data and aborts the enclosing kernel-generation request.

use std::fmt;
use std::ops::Range;

// ── Indices ─────────────────────────────────────────────────────────────────

/// One index position: a literal entry or a named loop index with its extent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Index {
    Fixed(usize),
    Free { name: String, extent: usize },
}

impl Index {
    /// Named loop index over `0..extent`.
    pub fn free(name: impl Into<String>, extent: usize) -> Self {
        Index::Free {
            name: name.into(),
            extent,
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::Fixed(i) => write!(f, "{}", i),
            Index::Free { name, .. } => write!(f, "{}", name),
        }
    }
}

/// A tuple of indices addressing one entry of a structured element value.
pub type MultiIndex = Vec<Index>;

// ── Expressions ─────────────────────────────────────────────────────────────

/// A symbolic tensor expression over named flat buffers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// A named buffer with a known shape.
    Variable { name: String, shape: Vec<usize> },
    /// A contiguous per-axis slice of the base expression.
    View {
        base: Box<Expr>,
        slices: Vec<Range<usize>>,
    },
    /// The base expression reinterpreted with a new shape of equal size.
    Reshape { base: Box<Expr>, shape: Vec<usize> },
    /// Scalar entry of the base expression at a multiindex.
    Indexed { base: Box<Expr>, indices: Vec<Index> },
}

impl Expr {
    pub fn variable(name: impl Into<String>, shape: Vec<usize>) -> Self {
        Expr::Variable {
            name: name.into(),
            shape,
        }
    }

    /// Shape of the value this expression denotes. Indexed access is scalar
    /// and has the empty shape.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Expr::Variable { shape, .. } => shape.clone(),
            Expr::View { slices, .. } => slices.iter().map(|s| s.end - s.start).collect(),
            Expr::Reshape { shape, .. } => shape.clone(),
            Expr::Indexed { .. } => Vec::new(),
        }
    }
}

/// Contiguous per-axis view. One slice per axis, each within bounds.
pub fn view(base: Expr, slices: Vec<Range<usize>>) -> Expr {
    let shape = base.shape();
    assert_eq!(
        slices.len(),
        shape.len(),
        "view: {} slices for rank-{} expression",
        slices.len(),
        shape.len()
    );
    for (slice, dim) in slices.iter().zip(&shape) {
        assert!(
            slice.start <= slice.end && slice.end <= *dim,
            "view: slice {}..{} out of bounds for axis of extent {}",
            slice.start,
            slice.end,
            dim
        );
    }
    Expr::View {
        base: Box::new(base),
        slices,
    }
}

/// Reinterpret `base` with a new shape of the same total size.
pub fn reshape(base: Expr, shape: Vec<usize>) -> Expr {
    let old: usize = base.shape().iter().product();
    let new: usize = shape.iter().product();
    assert_eq!(
        old, new,
        "reshape: size {} cannot be viewed as size {}",
        old, new
    );
    Expr::Reshape {
        base: Box::new(base),
        shape,
    }
}

/// Scalar entry at `indices`. Index arity must match the expression rank;
/// fixed indices must be in range and free indices must span the full axis.
pub fn indexed(base: Expr, indices: Vec<Index>) -> Expr {
    let shape = base.shape();
    assert_eq!(
        indices.len(),
        shape.len(),
        "indexed: {} indices for rank-{} expression",
        indices.len(),
        shape.len()
    );
    for (index, dim) in indices.iter().zip(&shape) {
        match index {
            Index::Fixed(i) => assert!(
                i < dim,
                "indexed: fixed index {} out of range for axis of extent {}",
                i,
                dim
            ),
            Index::Free { name, extent } => assert_eq!(
                extent, dim,
                "indexed: free index '{}' has extent {} but axis has extent {}",
                name, extent, dim
            ),
        }
    }
    Expr::Indexed {
        base: Box::new(base),
        indices,
    }
}

// ── Simplification ──────────────────────────────────────────────────────────

/// Remove redundant view and reshape wrappers from each expression: a view
/// spanning every axis in full and a reshape onto an identical shape both
/// collapse to their base.
pub fn prune(exprs: Vec<Expr>) -> Vec<Expr> {
    exprs.into_iter().map(simplify).collect()
}

fn simplify(expr: Expr) -> Expr {
    match expr {
        Expr::Variable { .. } => expr,
        Expr::View { base, slices } => {
            let base = simplify(*base);
            let full = base
                .shape()
                .iter()
                .zip(&slices)
                .all(|(dim, s)| s.start == 0 && s.end == *dim);
            if full {
                base
            } else {
                Expr::View {
                    base: Box::new(base),
                    slices,
                }
            }
        }
        Expr::Reshape { base, shape } => {
            let base = simplify(*base);
            if base.shape() == shape {
                base
            } else {
                Expr::Reshape {
                    base: Box::new(base),
                    shape,
                }
            }
        }
        Expr::Indexed { base, indices } => Expr::Indexed {
            base: Box::new(simplify(*base)),
            indices,
        },
    }
}

// ── Display ─────────────────────────────────────────────────────────────────

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Variable { name, .. } => write!(f, "{}", name),
            Expr::View { base, slices } => {
                write!(f, "{}[", base)?;
                for (i, s) in slices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}:{}", s.start, s.end)?;
                }
                write!(f, "]")
            }
            Expr::Reshape { base, shape } => {
                write!(f, "reshape({}, {:?})", base, shape)
            }
            Expr::Indexed { base, indices } => {
                write!(f, "{}[", base)?;
                for (i, idx) in indices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", idx)?;
                }
                write!(f, "]")
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_propagates_through_wrappers() {
        let var = Expr::variable("A", vec![6]);
        let v = view(var, vec![0..3]);
        assert_eq!(v.shape(), vec![3]);
        let r = reshape(v, vec![3, 1]);
        assert_eq!(r.shape(), vec![3, 1]);
        let ix = indexed(r, vec![Index::Fixed(2), Index::Fixed(0)]);
        assert_eq!(ix.shape(), Vec::<usize>::new());
    }

    #[test]
    fn prune_collapses_full_range_view() {
        let var = Expr::variable("A", vec![4]);
        let v = view(var.clone(), vec![0..4]);
        assert_eq!(prune(vec![v]), vec![var]);
    }

    #[test]
    fn prune_keeps_half_slice() {
        let var = Expr::variable("A", vec![8]);
        let v = view(var, vec![4..8]);
        let pruned = prune(vec![v.clone()]);
        assert_eq!(pruned, vec![v]);
    }

    #[test]
    fn prune_collapses_identity_reshape() {
        let var = Expr::variable("A", vec![3, 2]);
        let r = reshape(var.clone(), vec![3, 2]);
        assert_eq!(prune(vec![r]), vec![var]);
    }

    #[test]
    fn prune_recurses_under_indexed() {
        let var = Expr::variable("A", vec![4]);
        let wrapped = indexed(
            reshape(view(var.clone(), vec![0..4]), vec![4]),
            vec![Index::Fixed(0)],
        );
        let expected = Expr::Indexed {
            base: Box::new(var),
            indices: vec![Index::Fixed(0)],
        };
        assert_eq!(prune(vec![wrapped]), vec![expected]);
    }

    #[test]
    fn prune_is_idempotent() {
        let var = Expr::variable("A", vec![12]);
        let e = indexed(
            reshape(view(var, vec![6..12]), vec![3, 2]),
            vec![Index::free("i", 3), Index::Fixed(1)],
        );
        let once = prune(vec![e]);
        let twice = prune(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn display_forms() {
        let var = Expr::variable("A", vec![8]);
        let e = indexed(
            reshape(view(var, vec![4..8]), vec![2, 2]),
            vec![Index::free("i", 2), Index::Fixed(0)],
        );
        assert_eq!(format!("{}", e), "reshape(A[4:8], [2, 2])[i, 0]");
    }

    #[test]
    #[should_panic(expected = "reshape: size 6 cannot be viewed as size 4")]
    fn reshape_size_mismatch_asserts() {
        reshape(Expr::variable("A", vec![6]), vec![2, 2]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn view_out_of_bounds_asserts() {
        view(Expr::variable("A", vec![3]), vec![0..4]);
    }

    #[test]
    #[should_panic(expected = "indexed: 2 indices for rank-1 expression")]
    fn indexed_arity_mismatch_asserts() {
        indexed(
            Expr::variable("A", vec![3]),
            vec![Index::Fixed(0), Index::Fixed(1)],
        );
    }
}
