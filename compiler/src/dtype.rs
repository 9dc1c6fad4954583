// dtype.rs — Scalar wire types for kernel arguments
//
// Every kernel argument carries one of these element types. The backend
// consumes the C spelling via `c_name` when it emits the kernel signature.

use std::fmt;

use serde::Serialize;

/// Element type of a kernel argument buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Float32,
    Float64,
    Complex64,
    Complex128,
    Int32,
    UInt32,
}

impl ScalarType {
    /// The C type the backend emits for this scalar.
    pub fn c_name(self) -> &'static str {
        match self {
            ScalarType::Float32 => "float",
            ScalarType::Float64 => "double",
            ScalarType::Complex64 => "float _Complex",
            ScalarType::Complex128 => "double _Complex",
            ScalarType::Int32 => "int32_t",
            ScalarType::UInt32 => "uint32_t",
        }
    }

    /// Size of one element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            ScalarType::Float32 => 4,
            ScalarType::Float64 => 8,
            ScalarType::Complex64 => 8,
            ScalarType::Complex128 => 16,
            ScalarType::Int32 => 4,
            ScalarType::UInt32 => 4,
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(self, ScalarType::Int32 | ScalarType::UInt32)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, ScalarType::Complex64 | ScalarType::Complex128)
    }

    /// The real scalar underlying a complex type; identity otherwise.
    /// Geometry data (coordinates, cell sizes) stays real under a complex
    /// scalar type.
    pub fn real_counterpart(self) -> ScalarType {
        match self {
            ScalarType::Complex64 => ScalarType::Float32,
            ScalarType::Complex128 => ScalarType::Float64,
            other => other,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
            ScalarType::Complex64 => "complex64",
            ScalarType::Complex128 => "complex128",
            ScalarType::Int32 => "int32",
            ScalarType::UInt32 => "uint32",
        };
        write!(f, "{}", name)
    }
}
