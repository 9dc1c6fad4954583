// interface.rs — Kernel interface assembly and verification
//
// `InterfaceBuilder` collects the argument set of one integration kernel and
// emits a `KernelInterface`: the ordered argument list in the kernel calling
// convention (output, coordinates, cell orientations, cell sizes,
// coefficients, constants, facet index). The interface serializes to a
// canonical compact-JSON manifest, from which a SHA-256 fingerprint is
// derived for cache keys and reproducibility checks.
//
// `verify_interface` produces machine-checkable evidence (K1-K3) that the
// assembled interface satisfies the layout invariants.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::args::{
    CellOrientationsArg, CellSizesArg, CoefficientArg, ConstantArg, CoordinatesArg,
    DualMatrixOutputArg, DualVectorOutputArg, KernelArg, KernelParam, MatrixOutputArg,
    ScalarOutputArg, VectorOutputArg,
};
use crate::dtype::ScalarType;
use crate::element::ElementShape;

// ── Integral kind ───────────────────────────────────────────────────────────

/// Domain of integration a kernel is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegralKind {
    Cell,
    ExteriorFacet,
    InteriorFacet,
}

impl IntegralKind {
    /// Interior-facet kernels concatenate data from both adjacent cells.
    pub fn is_interior_facet(self) -> bool {
        self == IntegralKind::InteriorFacet
    }

    /// The facet-index argument this kernel takes, if any.
    fn facet_arg(self) -> Option<KernelArg> {
        match self {
            IntegralKind::Cell => None,
            IntegralKind::ExteriorFacet => Some(KernelArg::ExteriorFacet),
            IntegralKind::InteriorFacet => Some(KernelArg::InteriorFacet),
        }
    }
}

impl fmt::Display for IntegralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntegralKind::Cell => "cell",
            IntegralKind::ExteriorFacet => "exterior_facet",
            IntegralKind::InteriorFacet => "interior_facet",
        };
        write!(f, "{}", name)
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

/// Errors from assembling a kernel interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceError {
    MissingOutput,
    MissingCoordinates,
    DuplicateOutput,
    DuplicateCoefficient { name: String },
    DuplicateConstant { name: String },
}

impl fmt::Display for InterfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceError::MissingOutput => {
                write!(f, "kernel interface declares no output argument")
            }
            InterfaceError::MissingCoordinates => {
                write!(f, "kernel interface declares no coordinate element")
            }
            InterfaceError::DuplicateOutput => {
                write!(f, "kernel interface declares more than one output argument")
            }
            InterfaceError::DuplicateCoefficient { name } => {
                write!(f, "duplicate coefficient '{}'", name)
            }
            InterfaceError::DuplicateConstant { name } => {
                write!(f, "duplicate constant '{}'", name)
            }
        }
    }
}

impl std::error::Error for InterfaceError {}

// ── Kernel interface ────────────────────────────────────────────────────────

/// The complete, ordered argument set of one generated kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelInterface {
    name: String,
    kind: IntegralKind,
    args: Vec<KernelArg>,
}

/// Canonical manifest shape: what the fingerprint is computed over.
#[derive(Serialize)]
struct Manifest<'a> {
    name: &'a str,
    integral: IntegralKind,
    params: Vec<KernelParam>,
}

impl KernelInterface {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> IntegralKind {
        self.kind
    }

    pub fn args(&self) -> &[KernelArg] {
        &self.args
    }

    /// Ordered flat-buffer signature records for the codegen backend.
    pub fn params(&self) -> Vec<KernelParam> {
        self.args.iter().map(KernelArg::param).collect()
    }

    /// Compact canonical JSON of the kernel signature. Field order is fixed
    /// by the manifest struct, so equal interfaces serialize identically.
    pub fn canonical_json(&self) -> String {
        let manifest = Manifest {
            name: &self.name,
            integral: self.kind,
            params: self.params(),
        };
        serde_json::to_string(&manifest).expect("kernel manifest is serializable")
    }

    /// SHA-256 of the canonical JSON manifest.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_json().as_bytes());
        let result = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        hash
    }

    /// Hex string of the fingerprint (64 characters).
    pub fn fingerprint_hex(&self) -> String {
        let mut s = String::with_capacity(64);
        for b in self.fingerprint() {
            use std::fmt::Write;
            let _ = write!(s, "{:02x}", b);
        }
        s
    }
}

impl fmt::Display for KernelInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "kernel '{}' ({})", self.name, self.kind)?;
        for param in self.params() {
            writeln!(f, "  {}", param)?;
        }
        Ok(())
    }
}

// ── Builder ─────────────────────────────────────────────────────────────────

/// Collects the argument set for one kernel and assembles the interface in
/// the canonical calling convention.
#[derive(Debug)]
pub struct InterfaceBuilder {
    name: String,
    kind: IntegralKind,
    scalar_type: ScalarType,
    output: Option<KernelArg>,
    coordinates: Option<ElementShape>,
    needs_cell_orientations: bool,
    cell_sizes: Option<ElementShape>,
    coefficients: Vec<CoefficientArg>,
    constants: Vec<ConstantArg>,
}

impl InterfaceBuilder {
    pub fn new(name: impl Into<String>, kind: IntegralKind, scalar_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            kind,
            scalar_type,
            output: None,
            coordinates: None,
            needs_cell_orientations: false,
            cell_sizes: None,
            coefficients: Vec::new(),
            constants: Vec::new(),
        }
    }

    fn set_output(mut self, output: KernelArg) -> Result<Self, InterfaceError> {
        if self.output.is_some() {
            return Err(InterfaceError::DuplicateOutput);
        }
        self.output = Some(output);
        Ok(self)
    }

    pub fn scalar_output(self) -> Result<Self, InterfaceError> {
        let dtype = self.scalar_type;
        self.set_output(KernelArg::ScalarOutput(ScalarOutputArg::new(dtype)))
    }

    pub fn vector_output(self, element: ElementShape) -> Result<Self, InterfaceError> {
        let arg = VectorOutputArg::new(
            element,
            self.scalar_type,
            self.kind.is_interior_facet(),
            false,
        );
        self.set_output(KernelArg::VectorOutput(arg))
    }

    /// Diagonal of an operator, assembled as a vector.
    pub fn diagonal_output(self, element: ElementShape) -> Result<Self, InterfaceError> {
        let arg = VectorOutputArg::new(
            element,
            self.scalar_type,
            self.kind.is_interior_facet(),
            true,
        );
        self.set_output(KernelArg::VectorOutput(arg))
    }

    pub fn matrix_output(
        self,
        row_element: ElementShape,
        col_element: ElementShape,
    ) -> Result<Self, InterfaceError> {
        let arg = MatrixOutputArg::new(
            row_element,
            col_element,
            self.scalar_type,
            self.kind.is_interior_facet(),
        );
        self.set_output(KernelArg::MatrixOutput(arg))
    }

    pub fn dual_vector_output(self, node_shape: usize) -> Result<Self, InterfaceError> {
        let dtype = self.scalar_type;
        self.set_output(KernelArg::DualVectorOutput(DualVectorOutputArg::new(
            node_shape, dtype,
        )))
    }

    pub fn dual_matrix_output(
        self,
        rnode_shape: usize,
        cnode_shape: usize,
    ) -> Result<Self, InterfaceError> {
        let dtype = self.scalar_type;
        self.set_output(KernelArg::DualMatrixOutput(DualMatrixOutputArg::new(
            rnode_shape,
            cnode_shape,
            dtype,
        )))
    }

    /// Coordinate element of the mesh. Coordinates are always real-valued,
    /// also under a complex scalar type.
    pub fn coordinates(mut self, element: ElementShape) -> Self {
        self.coordinates = Some(element);
        self
    }

    pub fn cell_orientations(mut self) -> Self {
        self.needs_cell_orientations = true;
        self
    }

    pub fn cell_sizes(mut self, element: ElementShape) -> Self {
        self.cell_sizes = Some(element);
        self
    }

    pub fn coefficient(
        mut self,
        name: impl Into<String>,
        element: ElementShape,
    ) -> Result<Self, InterfaceError> {
        let name = name.into();
        if self.coefficients.iter().any(|c| c.name() == name) {
            return Err(InterfaceError::DuplicateCoefficient { name });
        }
        self.coefficients.push(CoefficientArg::new(
            name,
            element,
            self.scalar_type,
            self.kind.is_interior_facet(),
        ));
        Ok(self)
    }

    pub fn constant(
        mut self,
        name: impl Into<String>,
        shape: Vec<usize>,
    ) -> Result<Self, InterfaceError> {
        let name = name.into();
        if self.constants.iter().any(|c| c.name() == name) {
            return Err(InterfaceError::DuplicateConstant { name });
        }
        self.constants
            .push(ConstantArg::new(name, shape, self.scalar_type));
        Ok(self)
    }

    /// Assemble the interface in the canonical argument order: output,
    /// coordinates, cell orientations, cell sizes, coefficients (declaration
    /// order), constants (declaration order), facet index.
    pub fn build(self) -> Result<KernelInterface, InterfaceError> {
        let output = self.output.ok_or(InterfaceError::MissingOutput)?;
        let coords_element = self.coordinates.ok_or(InterfaceError::MissingCoordinates)?;
        let interior_facet = self.kind.is_interior_facet();
        let geometry_type = self.scalar_type.real_counterpart();

        let mut args = Vec::with_capacity(4 + self.coefficients.len() + self.constants.len());
        args.push(output);
        args.push(KernelArg::Coordinates(CoordinatesArg::new(
            coords_element,
            geometry_type,
            interior_facet,
        )));
        if self.needs_cell_orientations {
            args.push(KernelArg::CellOrientations(CellOrientationsArg::new(
                interior_facet,
            )));
        }
        if let Some(element) = self.cell_sizes {
            args.push(KernelArg::CellSizes(CellSizesArg::new(
                element,
                geometry_type,
                interior_facet,
            )));
        }
        args.extend(self.coefficients.into_iter().map(KernelArg::Coefficient));
        args.extend(self.constants.into_iter().map(KernelArg::Constant));
        if let Some(facet) = self.kind.facet_arg() {
            args.push(facet);
        }

        Ok(KernelInterface {
            name: self.name,
            kind: self.kind,
            args,
        })
    }
}

// ── Verification ────────────────────────────────────────────────────────────

/// Machine-checkable evidence for interface postconditions (K1-K3).
#[derive(Debug, Clone)]
pub struct InterfaceCert {
    /// K1: exactly one output argument, in first position.
    pub k1_single_output_first: bool,
    /// K2: every argument's flat length matches node_shape * product(shape).
    pub k2_flat_lengths_consistent: bool,
    /// K3: the facet argument present matches the integral kind.
    pub k3_facet_arg_matches_kind: bool,
}

impl InterfaceCert {
    pub fn all_pass(&self) -> bool {
        self.k1_single_output_first
            && self.k2_flat_lengths_consistent
            && self.k3_facet_arg_matches_kind
    }

    pub fn obligations(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("K1_single_output_first", self.k1_single_output_first),
            ("K2_flat_lengths_consistent", self.k2_flat_lengths_consistent),
            ("K3_facet_arg_matches_kind", self.k3_facet_arg_matches_kind),
        ]
    }
}

/// Verify interface postconditions.
pub fn verify_interface(iface: &KernelInterface) -> InterfaceCert {
    InterfaceCert {
        k1_single_output_first: verify_k1_single_output_first(iface),
        k2_flat_lengths_consistent: verify_k2_flat_lengths(iface),
        k3_facet_arg_matches_kind: verify_k3_facet_arg(iface),
    }
}

fn verify_k1_single_output_first(iface: &KernelInterface) -> bool {
    let outputs = iface.args().iter().filter(|a| a.is_output()).count();
    outputs == 1 && iface.args().first().is_some_and(KernelArg::is_output)
}

/// Recompute every flat length from the descriptor's shape accessors and
/// compare against the emitted signature record.
fn verify_k2_flat_lengths(iface: &KernelInterface) -> bool {
    iface.args().iter().all(|arg| {
        let param = arg.param();
        match arg {
            KernelArg::Coordinates(a) => {
                param.shape == vec![a.node_shape() * a.shape().iter().product::<usize>()]
            }
            KernelArg::Coefficient(a) => {
                param.shape == vec![a.node_shape() * a.shape().iter().product::<usize>()]
            }
            KernelArg::Constant(a) => param.shape == a.shape(),
            KernelArg::CellOrientations(a) => {
                param.shape == vec![a.node_shape() * a.shape().iter().product::<usize>()]
            }
            KernelArg::CellSizes(a) => {
                param.shape == vec![a.node_shape() * a.shape().iter().product::<usize>()]
            }
            KernelArg::ExteriorFacet => param.shape == vec![1],
            KernelArg::InteriorFacet => param.shape == vec![2],
            KernelArg::ScalarOutput(_) => param.shape == vec![1],
            KernelArg::VectorOutput(a) => {
                param.shape == vec![a.node_shape() * a.shape().iter().product::<usize>()]
            }
            KernelArg::MatrixOutput(a) => {
                param.shape
                    == vec![
                        a.rnode_shape() * a.rshape().iter().product::<usize>(),
                        a.cnode_shape() * a.cshape().iter().product::<usize>(),
                    ]
            }
            KernelArg::DualVectorOutput(a) => param.shape == vec![a.node_shape()],
            KernelArg::DualMatrixOutput(a) => {
                param.shape == vec![a.rnode_shape(), a.cnode_shape()]
            }
        }
    })
}

fn verify_k3_facet_arg(iface: &KernelInterface) -> bool {
    let exterior = iface
        .args()
        .iter()
        .filter(|a| matches!(a, KernelArg::ExteriorFacet))
        .count();
    let interior = iface
        .args()
        .iter()
        .filter(|a| matches!(a, KernelArg::InteriorFacet))
        .count();
    match iface.kind() {
        IntegralKind::Cell => exterior == 0 && interior == 0,
        IntegralKind::ExteriorFacet => exterior == 1 && interior == 0,
        IntegralKind::InteriorFacet => exterior == 0 && interior == 1,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn p1() -> ElementShape {
        ElementShape::scalar(vec![3])
    }

    fn vector_p1() -> ElementShape {
        ElementShape::blocked(vec![3, 2], vec![2]).unwrap()
    }

    fn mass_matrix_interface(kind: IntegralKind) -> KernelInterface {
        InterfaceBuilder::new("mass", kind, ScalarType::Float64)
            .matrix_output(p1(), p1())
            .unwrap()
            .coordinates(vector_p1())
            .coefficient("w", p1())
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn canonical_argument_order() {
        let iface = InterfaceBuilder::new("f", IntegralKind::ExteriorFacet, ScalarType::Float64)
            .scalar_output()
            .unwrap()
            .coordinates(vector_p1())
            .cell_orientations()
            .cell_sizes(vector_p1())
            .coefficient("w", p1())
            .unwrap()
            .constant("nu", vec![1])
            .unwrap()
            .build()
            .unwrap();
        let names: Vec<&str> = iface.args().iter().map(KernelArg::name).collect();
        assert_eq!(
            names,
            vec!["A", "coords", "cell_orientations", "cell_sizes", "w", "nu", "facet"]
        );
    }

    #[test]
    fn missing_output_rejected() {
        let err = InterfaceBuilder::new("f", IntegralKind::Cell, ScalarType::Float64)
            .coordinates(p1())
            .build()
            .unwrap_err();
        assert_eq!(err, InterfaceError::MissingOutput);
    }

    #[test]
    fn missing_coordinates_rejected() {
        let err = InterfaceBuilder::new("f", IntegralKind::Cell, ScalarType::Float64)
            .scalar_output()
            .unwrap()
            .build()
            .unwrap_err();
        assert_eq!(err, InterfaceError::MissingCoordinates);
    }

    #[test]
    fn duplicate_output_rejected() {
        let err = InterfaceBuilder::new("f", IntegralKind::Cell, ScalarType::Float64)
            .scalar_output()
            .unwrap()
            .vector_output(p1())
            .unwrap_err();
        assert_eq!(err, InterfaceError::DuplicateOutput);
    }

    #[test]
    fn duplicate_coefficient_rejected() {
        let err = InterfaceBuilder::new("f", IntegralKind::Cell, ScalarType::Float64)
            .coefficient("w", p1())
            .unwrap()
            .coefficient("w", p1())
            .unwrap_err();
        assert_eq!(
            err,
            InterfaceError::DuplicateCoefficient {
                name: "w".to_string()
            }
        );
    }

    #[test]
    fn complex_scalar_keeps_real_geometry() {
        let iface = InterfaceBuilder::new("h", IntegralKind::Cell, ScalarType::Complex128)
            .scalar_output()
            .unwrap()
            .coordinates(vector_p1())
            .build()
            .unwrap();
        let params = iface.params();
        assert_eq!(params[0].dtype, ScalarType::Complex128);
        assert_eq!(params[1].dtype, ScalarType::Float64);
    }

    #[test]
    fn verify_passes_on_built_interfaces() {
        for kind in [
            IntegralKind::Cell,
            IntegralKind::ExteriorFacet,
            IntegralKind::InteriorFacet,
        ] {
            let cert = verify_interface(&mass_matrix_interface(kind));
            assert!(cert.all_pass(), "obligations: {:?}", cert.obligations());
        }
    }

    #[test]
    fn verify_k3_detects_missing_facet_arg() {
        let mut iface = mass_matrix_interface(IntegralKind::InteriorFacet);
        iface.args.retain(|a| !matches!(a, KernelArg::InteriorFacet));
        let cert = verify_interface(&iface);
        assert!(!cert.k3_facet_arg_matches_kind);
        assert!(!cert.all_pass());
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = mass_matrix_interface(IntegralKind::Cell);
        let b = mass_matrix_interface(IntegralKind::Cell);
        assert_eq!(a.fingerprint_hex(), b.fingerprint_hex());
        assert_eq!(a.fingerprint_hex().len(), 64);
    }

    #[test]
    fn fingerprint_differs_across_integral_kinds() {
        let cell = mass_matrix_interface(IntegralKind::Cell);
        let facet = mass_matrix_interface(IntegralKind::InteriorFacet);
        assert_ne!(cell.fingerprint_hex(), facet.fingerprint_hex());
    }

    #[test]
    fn canonical_json_mentions_every_param() {
        let iface = mass_matrix_interface(IntegralKind::Cell);
        let json = iface.canonical_json();
        for param in iface.params() {
            assert!(json.contains(&format!("\"{}\"", param.name)));
        }
        assert!(json.contains("\"integral\":\"cell\""));
    }
}
