// element.rs — Element shape adapter
//
// Normalizes plain and blocked (tensor-valued) element descriptions into the
// two quantities the argument layer needs: the per-node value shape and the
// scalar node count. Blocked elements append their value dimensions to the
// tail of the index shape, so the node count is the product of the leading
// dimensions only.
//
// Preconditions: `blocked` validates the block/index suffix relationship.
// Postconditions: all derived quantities are pure integer products.
// Side effects: none.

use std::fmt;

// ── Errors ──────────────────────────────────────────────────────────────────

/// Errors from constructing a blocked element description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementError {
    /// Block rank exceeds the index-shape rank.
    BlockRankExceedsIndexRank {
        index_shape: Vec<usize>,
        block_shape: Vec<usize>,
    },
    /// The block shape is not the trailing segment of the index shape.
    BlockShapeMismatch {
        index_shape: Vec<usize>,
        block_shape: Vec<usize>,
    },
}

impl fmt::Display for ElementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementError::BlockRankExceedsIndexRank {
                index_shape,
                block_shape,
            } => {
                write!(
                    f,
                    "block shape {:?} has higher rank than index shape {:?}",
                    block_shape, index_shape
                )
            }
            ElementError::BlockShapeMismatch {
                index_shape,
                block_shape,
            } => {
                write!(
                    f,
                    "block shape {:?} is not the trailing segment of index shape {:?}",
                    block_shape, index_shape
                )
            }
        }
    }
}

impl std::error::Error for ElementError {}

// ── Element shape ───────────────────────────────────────────────────────────

/// Shape description of one finite element, as seen by the argument layer.
///
/// `index_shape` is the ordered sequence of index dimensions a basis-function
/// table for this element is addressed with. For a blocked element the value
/// dimensions (`block_shape`) occupy the trailing positions of `index_shape`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementShape {
    index_shape: Vec<usize>,
    block_shape: Option<Vec<usize>>,
}

impl ElementShape {
    /// A plain scalar-valued element.
    pub fn scalar(index_shape: Vec<usize>) -> Self {
        Self {
            index_shape,
            block_shape: None,
        }
    }

    /// A blocked (vector/tensor-valued) element. The block shape must be the
    /// trailing segment of the index shape.
    pub fn blocked(index_shape: Vec<usize>, block_shape: Vec<usize>) -> Result<Self, ElementError> {
        if block_shape.len() > index_shape.len() {
            return Err(ElementError::BlockRankExceedsIndexRank {
                index_shape,
                block_shape,
            });
        }
        let tail = &index_shape[index_shape.len() - block_shape.len()..];
        if tail != block_shape.as_slice() {
            return Err(ElementError::BlockShapeMismatch {
                index_shape,
                block_shape,
            });
        }
        Ok(Self {
            index_shape,
            block_shape: Some(block_shape),
        })
    }

    pub fn index_shape(&self) -> &[usize] {
        &self.index_shape
    }

    pub fn is_blocked(&self) -> bool {
        self.block_shape.is_some()
    }

    /// Per-node value shape: the block shape for a blocked element, `[1]`
    /// otherwise.
    pub fn tensor_shape(&self) -> Vec<usize> {
        match &self.block_shape {
            Some(shape) => shape.clone(),
            None => vec![1],
        }
    }

    /// Node count: product of the index dimensions with the trailing value
    /// dimensions excluded for a blocked element. Empty shape counts as 1.
    pub fn node_count(&self) -> usize {
        let dims = match &self.block_shape {
            Some(block) => &self.index_shape[..self.index_shape.len() - block.len()],
            None => &self.index_shape[..],
        };
        dims.iter().product()
    }

    /// Product of the full index shape, before any restriction doubling.
    pub fn unrestricted_size(&self) -> usize {
        self.index_shape.iter().product()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
