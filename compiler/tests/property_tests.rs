// Property-based tests for argument-layout invariants.
//
// Three categories:
// 1. Element adapter: node counts exclude exactly the trailing block dims
// 2. Facet doubling: interior-facet kernels double node counts, never value shapes
// 3. Output expressions: restriction enumeration counts and prune idempotence
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use proptest::prelude::*;

use fkc::args::{CoefficientArg, KernelArg, MatrixOutputArg, VectorOutputArg};
use fkc::dtype::ScalarType;
use fkc::element::ElementShape;
use fkc::expr::{prune, Index, MultiIndex};

// ── Generators ──────────────────────────────────────────────────────────────

/// An element with up to two node dimensions and an optional trailing block.
fn arb_element() -> impl Strategy<Value = ElementShape> {
    let leading = prop::collection::vec(1usize..=4, 0..=2);
    let block = prop::option::of(prop::collection::vec(1usize..=3, 1..=2));
    (leading, block).prop_map(|(leading, block)| match block {
        Some(block) => {
            let mut index_shape = leading;
            index_shape.extend(block.iter().copied());
            ElementShape::blocked(index_shape, block).unwrap()
        }
        None => ElementShape::scalar(leading),
    })
}

/// A multiindex of free indices spanning the element's full index shape.
fn spanning_multiindex(element: &ElementShape, prefix: &str) -> MultiIndex {
    element
        .index_shape()
        .iter()
        .enumerate()
        .map(|(i, &extent)| Index::free(format!("{}{}", prefix, i), extent))
        .collect()
}

// ── 1. Element adapter ──────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    #[test]
    fn node_count_excludes_exactly_the_block_dims(element in arb_element()) {
        let block_rank = if element.is_blocked() {
            element.tensor_shape().len()
        } else {
            0
        };
        let expected: usize = element.index_shape()
            [..element.index_shape().len() - block_rank]
            .iter()
            .product();
        prop_assert_eq!(element.node_count(), expected);
    }

    #[test]
    fn unrestricted_size_is_full_index_product(element in arb_element()) {
        let expected: usize = element.index_shape().iter().product();
        prop_assert_eq!(element.unrestricted_size(), expected);
    }
}

// ── 2. Facet doubling and flat lengths ──────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    #[test]
    fn interior_facet_doubles_node_shape_only(element in arb_element()) {
        let cell = CoefficientArg::new("w", element.clone(), ScalarType::Float64, false);
        let facet = CoefficientArg::new("w", element, ScalarType::Float64, true);
        prop_assert_eq!(facet.node_shape(), 2 * cell.node_shape());
        prop_assert_eq!(facet.shape(), cell.shape());
    }

    #[test]
    fn flat_length_is_node_shape_times_value_size(
        element in arb_element(),
        interior_facet in any::<bool>(),
    ) {
        let arg = CoefficientArg::new("w", element, ScalarType::Float64, interior_facet);
        let expected = arg.node_shape() * arg.shape().iter().product::<usize>();
        let param = KernelArg::Coefficient(arg).param();
        prop_assert_eq!(param.shape, vec![expected]);
    }

    #[test]
    fn matrix_flat_lengths_are_per_axis(
        relem in arb_element(),
        celem in arb_element(),
        interior_facet in any::<bool>(),
    ) {
        let out = MatrixOutputArg::new(relem, celem, ScalarType::Float64, interior_facet);
        let expected = vec![
            out.rnode_shape() * out.rshape().iter().product::<usize>(),
            out.cnode_shape() * out.cshape().iter().product::<usize>(),
        ];
        let param = KernelArg::MatrixOutput(out).param();
        prop_assert_eq!(param.shape, expected);
    }
}

// ── 3. Output expressions ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    #[test]
    fn vector_restriction_count(element in arb_element(), interior_facet in any::<bool>()) {
        let mi = vec![spanning_multiindex(&element, "i")];
        let out = VectorOutputArg::new(element, ScalarType::Float64, interior_facet, false);
        let exprs = out.make_exprs(&mi);
        prop_assert_eq!(exprs.len(), if interior_facet { 2 } else { 1 });
    }

    #[test]
    fn matrix_restriction_count(
        relem in arb_element(),
        celem in arb_element(),
        interior_facet in any::<bool>(),
    ) {
        let mi = vec![
            spanning_multiindex(&relem, "i"),
            spanning_multiindex(&celem, "j"),
        ];
        let out = MatrixOutputArg::new(relem, celem, ScalarType::Float64, interior_facet);
        let exprs = out.make_exprs(&mi);
        prop_assert_eq!(exprs.len(), if interior_facet { 4 } else { 1 });
    }

    #[test]
    fn built_expressions_are_already_pruned(
        element in arb_element(),
        interior_facet in any::<bool>(),
    ) {
        let mi = vec![spanning_multiindex(&element, "i")];
        let out = VectorOutputArg::new(element, ScalarType::Float64, interior_facet, false);
        let exprs = out.make_exprs(&mi);
        let repruned = prune(exprs.clone());
        prop_assert_eq!(exprs, repruned);
    }
}

// ── Exhaustive scalar-type checks ───────────────────────────────────────────

const ALL_SCALARS: [ScalarType; 6] = [
    ScalarType::Float32,
    ScalarType::Float64,
    ScalarType::Complex64,
    ScalarType::Complex128,
    ScalarType::Int32,
    ScalarType::UInt32,
];

#[test]
fn real_counterpart_is_idempotent_for_all_types() {
    for t in ALL_SCALARS {
        let real = t.real_counterpart();
        assert_eq!(real.real_counterpart(), real);
        assert!(!real.is_complex());
    }
}

#[test]
fn complex_types_shrink_to_matching_width() {
    for t in ALL_SCALARS {
        if t.is_complex() {
            assert_eq!(t.real_counterpart().size_bytes() * 2, t.size_bytes());
        }
    }
}
