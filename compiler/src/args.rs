// args.rs — Kernel argument descriptors
//
// One descriptor per category of data a generated integration kernel can
// take: geometry, coefficient and constant inputs, facet/orientation/size
// auxiliaries, and the output accumulator in its scalar, vector, and matrix
// forms. Each descriptor derives the flat-buffer signature record the
// codegen backend consumes; output descriptors additionally build the
// expression fragments mapping the flat buffer onto the structured index
// space (one fragment per cell-side restriction for interior facets).
//
// Interior-facet kernels see data from both adjacent cells concatenated
// into one buffer, cell 0 first: node counts double, per-node value shapes
// do not.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::dtype::ScalarType;
use crate::element::ElementShape;
use crate::expr::{self, Expr, Index, MultiIndex};

/// Name of the output accumulator in every kernel signature.
pub const OUTPUT_NAME: &str = "A";

// ── Intent ──────────────────────────────────────────────────────────────────

/// Whether the kernel reads or writes an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    In,
    Out,
}

// ── Flat-buffer signature record ────────────────────────────────────────────

/// One parameter of the generated kernel signature: buffer name, element
/// type, per-axis flat lengths, and whether the kernel writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KernelParam {
    pub name: String,
    pub dtype: ScalarType,
    pub shape: Vec<usize>,
    pub is_output: bool,
}

impl fmt::Display for KernelParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}[", self.name, self.dtype)?;
        for (i, dim) in self.shape.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dim)?;
        }
        write!(f, "]")?;
        if self.is_output {
            write!(f, " (out)")?;
        }
        Ok(())
    }
}

/// Flat length of one buffer axis: node count times per-node value size.
fn flat_len(node_shape: usize, shape: &[usize]) -> usize {
    node_shape * shape.iter().product::<usize>()
}

fn doubled(count: usize, interior_facet: bool) -> usize {
    if interior_facet {
        2 * count
    } else {
        count
    }
}

// ── Geometry and input arguments ────────────────────────────────────────────

/// Cell coordinate field, one value per coordinate-element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatesArg {
    element: ElementShape,
    dtype: ScalarType,
    interior_facet: bool,
}

impl CoordinatesArg {
    pub fn new(element: ElementShape, dtype: ScalarType, interior_facet: bool) -> Self {
        Self {
            element,
            dtype,
            interior_facet,
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        self.element.tensor_shape()
    }

    pub fn node_shape(&self) -> usize {
        doubled(self.element.node_count(), self.interior_facet)
    }

    fn param(&self) -> KernelParam {
        KernelParam {
            name: "coords".to_string(),
            dtype: self.dtype,
            shape: vec![flat_len(self.node_shape(), &self.shape())],
            is_output: false,
        }
    }
}

/// A named coefficient field over its own element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoefficientArg {
    name: String,
    element: ElementShape,
    dtype: ScalarType,
    interior_facet: bool,
}

impl CoefficientArg {
    pub fn new(
        name: impl Into<String>,
        element: ElementShape,
        dtype: ScalarType,
        interior_facet: bool,
    ) -> Self {
        Self {
            name: name.into(),
            element,
            dtype,
            interior_facet,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Vec<usize> {
        self.element.tensor_shape()
    }

    pub fn node_shape(&self) -> usize {
        doubled(self.element.node_count(), self.interior_facet)
    }

    fn param(&self) -> KernelParam {
        KernelParam {
            name: self.name.clone(),
            dtype: self.dtype,
            shape: vec![flat_len(self.node_shape(), &self.shape())],
            is_output: false,
        }
    }
}

/// A named constant with a caller-given shape. No node multiplicity and no
/// facet doubling: the same values serve both cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantArg {
    name: String,
    shape: Vec<usize>,
    dtype: ScalarType,
}

impl ConstantArg {
    pub fn new(name: impl Into<String>, shape: Vec<usize>, dtype: ScalarType) -> Self {
        Self {
            name: name.into(),
            shape,
            dtype,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn param(&self) -> KernelParam {
        KernelParam {
            name: self.name.clone(),
            dtype: self.dtype,
            shape: self.shape.clone(),
            is_output: false,
        }
    }
}

/// Per-cell orientation flags. The shape itself encodes the interior-facet
/// doubling: one flag per adjacent cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellOrientationsArg {
    interior_facet: bool,
}

impl CellOrientationsArg {
    pub fn new(interior_facet: bool) -> Self {
        Self { interior_facet }
    }

    pub fn shape(&self) -> Vec<usize> {
        if self.interior_facet {
            vec![2]
        } else {
            vec![1]
        }
    }

    pub fn node_shape(&self) -> usize {
        1
    }

    fn param(&self) -> KernelParam {
        KernelParam {
            name: "cell_orientations".to_string(),
            dtype: ScalarType::Int32,
            shape: vec![flat_len(self.node_shape(), &self.shape())],
            is_output: false,
        }
    }
}

/// Characteristic cell-size field over the coordinate element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellSizesArg {
    element: ElementShape,
    dtype: ScalarType,
    interior_facet: bool,
}

impl CellSizesArg {
    pub fn new(element: ElementShape, dtype: ScalarType, interior_facet: bool) -> Self {
        Self {
            element,
            dtype,
            interior_facet,
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        self.element.tensor_shape()
    }

    pub fn node_shape(&self) -> usize {
        doubled(self.element.node_count(), self.interior_facet)
    }

    fn param(&self) -> KernelParam {
        KernelParam {
            name: "cell_sizes".to_string(),
            dtype: self.dtype,
            shape: vec![flat_len(self.node_shape(), &self.shape())],
            is_output: false,
        }
    }
}

// ── Output arguments ────────────────────────────────────────────────────────

/// Scalar accumulator (functional integrals). A single-entry buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarOutputArg {
    dtype: ScalarType,
}

impl ScalarOutputArg {
    pub fn new(dtype: ScalarType) -> Self {
        Self { dtype }
    }

    pub fn shape(&self) -> Vec<usize> {
        vec![1]
    }

    fn param(&self) -> KernelParam {
        KernelParam {
            name: OUTPUT_NAME.to_string(),
            dtype: self.dtype,
            shape: vec![1],
            is_output: true,
        }
    }

    /// The single output expression: entry 0 of the one-element buffer.
    /// A scalar output takes no multiindices.
    pub fn make_exprs(&self, multiindices: &[MultiIndex]) -> Vec<Expr> {
        assert!(
            multiindices.is_empty(),
            "scalar output takes no multiindices, got {}",
            multiindices.len()
        );
        vec![expr::indexed(
            Expr::variable(OUTPUT_NAME, vec![1]),
            vec![Index::Fixed(0)],
        )]
    }
}

/// Vector accumulator (linear forms), or the diagonal of an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorOutputArg {
    element: ElementShape,
    dtype: ScalarType,
    interior_facet: bool,
    diagonal: bool,
}

impl VectorOutputArg {
    pub fn new(
        element: ElementShape,
        dtype: ScalarType,
        interior_facet: bool,
        diagonal: bool,
    ) -> Self {
        Self {
            element,
            dtype,
            interior_facet,
            diagonal,
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        self.element.tensor_shape()
    }

    pub fn node_shape(&self) -> usize {
        doubled(self.element.node_count(), self.interior_facet)
    }

    fn param(&self) -> KernelParam {
        KernelParam {
            name: OUTPUT_NAME.to_string(),
            dtype: self.dtype,
            shape: vec![flat_len(self.node_shape(), &self.shape())],
            is_output: true,
        }
    }

    /// One expression per restriction side ([side 0, side 1] for interior
    /// facets, a single unrestricted expression otherwise), each recovering
    /// the element's structured index space from the flat buffer.
    ///
    /// A diagonal output is addressed with the row multiindex only; any
    /// further multiindices are ignored.
    pub fn make_exprs(&self, multiindices: &[MultiIndex]) -> Vec<Expr> {
        let u = self.element.unrestricted_size();
        let c = doubled(u, self.interior_facet);

        let multiindices = if self.diagonal && multiindices.len() > 1 {
            &multiindices[..1]
        } else {
            multiindices
        };

        let slicez: Vec<Vec<Range<usize>>> = if self.interior_facet {
            (0..2).map(|side| vec![side * u..(side + 1) * u]).collect()
        } else {
            vec![vec![0..u]]
        };

        let var = Expr::variable(OUTPUT_NAME, vec![c]);
        let exprs = slicez
            .into_iter()
            .map(|slices| {
                restricted_expr(
                    expr::view(var.clone(), slices),
                    self.element.index_shape().to_vec(),
                    multiindices,
                )
            })
            .collect();
        expr::prune(exprs)
    }
}

/// Matrix accumulator (bilinear forms) over a row and a column element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixOutputArg {
    row_element: ElementShape,
    col_element: ElementShape,
    dtype: ScalarType,
    interior_facet: bool,
}

impl MatrixOutputArg {
    pub fn new(
        row_element: ElementShape,
        col_element: ElementShape,
        dtype: ScalarType,
        interior_facet: bool,
    ) -> Self {
        Self {
            row_element,
            col_element,
            dtype,
            interior_facet,
        }
    }

    pub fn rshape(&self) -> Vec<usize> {
        self.row_element.tensor_shape()
    }

    pub fn cshape(&self) -> Vec<usize> {
        self.col_element.tensor_shape()
    }

    pub fn rnode_shape(&self) -> usize {
        doubled(self.row_element.node_count(), self.interior_facet)
    }

    pub fn cnode_shape(&self) -> usize {
        doubled(self.col_element.node_count(), self.interior_facet)
    }

    fn param(&self) -> KernelParam {
        KernelParam {
            name: OUTPUT_NAME.to_string(),
            dtype: self.dtype,
            shape: vec![
                flat_len(self.rnode_shape(), &self.rshape()),
                flat_len(self.cnode_shape(), &self.cshape()),
            ],
            is_output: true,
        }
    }

    /// One expression per (row-side, col-side) restriction combination,
    /// enumerated lexicographically: (0,0), (0,1), (1,0), (1,1) for interior
    /// facets, a single unrestricted expression otherwise. The reshaped view
    /// concatenates the row index shape before the column index shape, and
    /// the multiindices are flattened in the same order.
    pub fn make_exprs(&self, multiindices: &[MultiIndex]) -> Vec<Expr> {
        let u = [
            self.row_element.unrestricted_size(),
            self.col_element.unrestricted_size(),
        ];
        let c: Vec<usize> = u
            .iter()
            .map(|&s| doubled(s, self.interior_facet))
            .collect();

        let slicez: Vec<Vec<Range<usize>>> = if self.interior_facet {
            let mut all = Vec::with_capacity(4);
            for row_side in 0..2 {
                for col_side in 0..2 {
                    all.push(vec![
                        row_side * u[0]..(row_side + 1) * u[0],
                        col_side * u[1]..(col_side + 1) * u[1],
                    ]);
                }
            }
            all
        } else {
            vec![vec![0..u[0], 0..u[1]]]
        };

        let target: Vec<usize> = self
            .row_element
            .index_shape()
            .iter()
            .chain(self.col_element.index_shape())
            .copied()
            .collect();

        let var = Expr::variable(OUTPUT_NAME, c);
        let exprs = slicez
            .into_iter()
            .map(|slices| {
                restricted_expr(expr::view(var.clone(), slices), target.clone(), multiindices)
            })
            .collect();
        expr::prune(exprs)
    }
}

/// Reshape a restriction-sliced view back to the structured index space and
/// address it with the caller's flattened multiindices.
fn restricted_expr(restricted: Expr, index_shape: Vec<usize>, multiindices: &[MultiIndex]) -> Expr {
    let indices: Vec<Index> = multiindices.iter().flatten().cloned().collect();
    expr::indexed(expr::reshape(restricted, index_shape), indices)
}

/// Vector accumulator for dual evaluation: the node axis is caller-given
/// and carries no per-node value shape or facet doubling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualVectorOutputArg {
    node_shape: usize,
    dtype: ScalarType,
}

impl DualVectorOutputArg {
    pub fn new(node_shape: usize, dtype: ScalarType) -> Self {
        Self { node_shape, dtype }
    }

    pub fn shape(&self) -> Vec<usize> {
        vec![1]
    }

    pub fn node_shape(&self) -> usize {
        self.node_shape
    }

    fn param(&self) -> KernelParam {
        KernelParam {
            name: OUTPUT_NAME.to_string(),
            dtype: self.dtype,
            shape: vec![self.node_shape],
            is_output: true,
        }
    }
}

/// Matrix accumulator for dual evaluation with caller-given node axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualMatrixOutputArg {
    rnode_shape: usize,
    cnode_shape: usize,
    dtype: ScalarType,
}

impl DualMatrixOutputArg {
    pub fn new(rnode_shape: usize, cnode_shape: usize, dtype: ScalarType) -> Self {
        Self {
            rnode_shape,
            cnode_shape,
            dtype,
        }
    }

    pub fn rshape(&self) -> Vec<usize> {
        vec![1]
    }

    pub fn cshape(&self) -> Vec<usize> {
        vec![1]
    }

    pub fn rnode_shape(&self) -> usize {
        self.rnode_shape
    }

    pub fn cnode_shape(&self) -> usize {
        self.cnode_shape
    }

    fn param(&self) -> KernelParam {
        KernelParam {
            name: OUTPUT_NAME.to_string(),
            dtype: self.dtype,
            shape: vec![self.rnode_shape, self.cnode_shape],
            is_output: true,
        }
    }
}

// ── Argument role dispatch ──────────────────────────────────────────────────

/// Closed set of kernel argument roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelArg {
    Coordinates(CoordinatesArg),
    Coefficient(CoefficientArg),
    Constant(ConstantArg),
    CellOrientations(CellOrientationsArg),
    CellSizes(CellSizesArg),
    /// Local index of the facet being integrated, exterior boundary.
    ExteriorFacet,
    /// Local facet indices for both adjacent cells.
    InteriorFacet,
    ScalarOutput(ScalarOutputArg),
    VectorOutput(VectorOutputArg),
    MatrixOutput(MatrixOutputArg),
    DualVectorOutput(DualVectorOutputArg),
    DualMatrixOutput(DualMatrixOutputArg),
}

impl KernelArg {
    /// Stable buffer name in the kernel signature.
    pub fn name(&self) -> &str {
        match self {
            KernelArg::Coordinates(_) => "coords",
            KernelArg::Coefficient(arg) => arg.name(),
            KernelArg::Constant(arg) => arg.name(),
            KernelArg::CellOrientations(_) => "cell_orientations",
            KernelArg::CellSizes(_) => "cell_sizes",
            KernelArg::ExteriorFacet | KernelArg::InteriorFacet => "facet",
            KernelArg::ScalarOutput(_)
            | KernelArg::VectorOutput(_)
            | KernelArg::MatrixOutput(_)
            | KernelArg::DualVectorOutput(_)
            | KernelArg::DualMatrixOutput(_) => OUTPUT_NAME,
        }
    }

    pub fn dtype(&self) -> ScalarType {
        match self {
            KernelArg::Coordinates(arg) => arg.dtype,
            KernelArg::Coefficient(arg) => arg.dtype,
            KernelArg::Constant(arg) => arg.dtype,
            KernelArg::CellOrientations(_) => ScalarType::Int32,
            KernelArg::CellSizes(arg) => arg.dtype,
            KernelArg::ExteriorFacet | KernelArg::InteriorFacet => ScalarType::UInt32,
            KernelArg::ScalarOutput(arg) => arg.dtype,
            KernelArg::VectorOutput(arg) => arg.dtype,
            KernelArg::MatrixOutput(arg) => arg.dtype,
            KernelArg::DualVectorOutput(arg) => arg.dtype,
            KernelArg::DualMatrixOutput(arg) => arg.dtype,
        }
    }

    pub fn intent(&self) -> Intent {
        match self {
            KernelArg::ScalarOutput(_)
            | KernelArg::VectorOutput(_)
            | KernelArg::MatrixOutput(_)
            | KernelArg::DualVectorOutput(_)
            | KernelArg::DualMatrixOutput(_) => Intent::Out,
            _ => Intent::In,
        }
    }

    pub fn is_output(&self) -> bool {
        self.intent() == Intent::Out
    }

    /// The flat-buffer signature record for the codegen backend.
    pub fn param(&self) -> KernelParam {
        match self {
            KernelArg::Coordinates(arg) => arg.param(),
            KernelArg::Coefficient(arg) => arg.param(),
            KernelArg::Constant(arg) => arg.param(),
            KernelArg::CellOrientations(arg) => arg.param(),
            KernelArg::CellSizes(arg) => arg.param(),
            KernelArg::ExteriorFacet => KernelParam {
                name: "facet".to_string(),
                dtype: ScalarType::UInt32,
                shape: vec![1],
                is_output: false,
            },
            KernelArg::InteriorFacet => KernelParam {
                name: "facet".to_string(),
                dtype: ScalarType::UInt32,
                shape: vec![2],
                is_output: false,
            },
            KernelArg::ScalarOutput(arg) => arg.param(),
            KernelArg::VectorOutput(arg) => arg.param(),
            KernelArg::MatrixOutput(arg) => arg.param(),
            KernelArg::DualVectorOutput(arg) => arg.param(),
            KernelArg::DualMatrixOutput(arg) => arg.param(),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
