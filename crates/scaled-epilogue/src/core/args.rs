//! Argument construction shared by every epilogue composition.
//!
//! [`args_from_operand`] and [`args_from_optional_operand`] turn a caller's
//! operand into [`LoadArgs`] for one leaf. The resulting [`NodeArgs`] tree
//! mirrors the expression tree node for node.

use super::broadcast::{Axis, BroadcastDescriptor, BroadcastMode, LoadArgs, OperandRole};
use crate::error::{EpilogueError, Result};
use crate::operand::Operand;
use crate::variants::EpilogueVariant;
use tracing::debug;

/// Build load arguments from a required operand.
///
/// A one-element operand selects scalar mode for scalar-or-vector loads;
/// any other count binds the data as a vector. Vector-only loads always bind
/// as a vector.
pub fn args_from_operand<'a>(
    desc: &BroadcastDescriptor,
    operand: Operand<'a>,
) -> Result<LoadArgs<'a>> {
    if operand.element_type() != desc.element {
        return Err(EpilogueError::ElementTypeMismatch {
            operand: desc.role.name(),
            expected: desc.element,
            actual: operand.element_type(),
        });
    }
    if operand.is_empty() {
        if desc.optional {
            return Ok(LoadArgs::absent(desc));
        }
        return Err(EpilogueError::MissingOperand(desc.role.name()));
    }

    let mode = if desc.kind.allows_scalar() && operand.len() == 1 {
        BroadcastMode::Scalar
    } else {
        BroadcastMode::Vector
    };
    debug!(
        operand = desc.role.name(),
        len = operand.len(),
        mode = ?mode,
        "resolved broadcast operand"
    );
    Ok(LoadArgs::bound(desc, mode, operand))
}

/// Build load arguments from an operand that may be absent.
///
/// Only loads declared optional accept `None`.
pub fn args_from_optional_operand<'a>(
    desc: &BroadcastDescriptor,
    operand: Option<Operand<'a>>,
) -> Result<LoadArgs<'a>> {
    match operand {
        Some(op) => args_from_operand(desc, op),
        None if desc.optional => Ok(LoadArgs::absent(desc)),
        None => Err(EpilogueError::MissingOperand(desc.role.name())),
    }
}

/// Operands supplied for one launch, keyed by role.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpilogueOperands<'a> {
    pub scale_a: Option<Operand<'a>>,
    pub scale_b: Option<Operand<'a>>,
    pub bias: Option<Operand<'a>>,
    pub multiplier: Option<Operand<'a>>,
}

impl<'a> EpilogueOperands<'a> {
    pub fn new(scale_a: impl Into<Operand<'a>>, scale_b: impl Into<Operand<'a>>) -> Self {
        Self {
            scale_a: Some(scale_a.into()),
            scale_b: Some(scale_b.into()),
            bias: None,
            multiplier: None,
        }
    }

    pub fn with_bias(mut self, bias: impl Into<Operand<'a>>) -> Self {
        self.bias = Some(bias.into());
        self
    }

    pub fn with_multiplier(mut self, multiplier: impl Into<Operand<'a>>) -> Self {
        self.multiplier = Some(multiplier.into());
        self
    }

    /// Operand bound to `role`; empty slices count as absent.
    pub fn get(&self, role: OperandRole) -> Option<Operand<'a>> {
        let op = match role {
            OperandRole::ScaleA => self.scale_a,
            OperandRole::ScaleB => self.scale_b,
            OperandRole::Bias => self.bias,
            OperandRole::Multiplier => self.multiplier,
        };
        op.filter(|o| !o.is_empty())
    }

    /// Operand bound to `role`, or [`EpilogueError::MissingOperand`].
    pub fn require(&self, role: OperandRole) -> Result<Operand<'a>> {
        self.get(role)
            .ok_or(EpilogueError::MissingOperand(role.name()))
    }
}

/// Arguments for one node of an expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeArgs<'a> {
    Accumulator,
    Load(LoadArgs<'a>),
    /// Child arguments in the node's child order.
    Compute(Vec<NodeArgs<'a>>),
}

impl<'a> NodeArgs<'a> {
    pub(crate) fn compute(children: impl Into<Vec<NodeArgs<'a>>>) -> Self {
        NodeArgs::Compute(children.into())
    }

    fn visit_loads<'s>(&'s self, f: &mut impl FnMut(&'s LoadArgs<'a>)) {
        match self {
            NodeArgs::Accumulator => {}
            NodeArgs::Load(load) => f(load),
            NodeArgs::Compute(children) => {
                for child in children {
                    child.visit_loads(&mut *f);
                }
            }
        }
    }
}

/// Fully populated launch arguments, shaped like the epilogue's tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentBlock<'a> {
    variant: Option<EpilogueVariant>,
    root: NodeArgs<'a>,
}

impl<'a> ArgumentBlock<'a> {
    pub fn new(variant: Option<EpilogueVariant>, root: NodeArgs<'a>) -> Self {
        Self { variant, root }
    }

    /// Variant that built this block; `None` for custom trees.
    pub fn variant(&self) -> Option<EpilogueVariant> {
        self.variant
    }

    pub fn root(&self) -> &NodeArgs<'a> {
        &self.root
    }

    /// All leaf loads, in tree order.
    pub fn loads(&self) -> Vec<&LoadArgs<'a>> {
        let mut out = Vec::new();
        self.root.visit_loads(&mut |l| out.push(l));
        out
    }

    /// Load arguments bound to `role`, if the tree reads it.
    pub fn load_args(&self, role: OperandRole) -> Option<&LoadArgs<'a>> {
        self.loads().into_iter().find(|l| l.role() == role)
    }

    /// Check every vector operand covers the global extent of a tile whose
    /// origin is `(row_offset, col_offset)` and size is `rows x cols`.
    pub fn check_extent(
        &self,
        row_offset: usize,
        col_offset: usize,
        rows: usize,
        cols: usize,
    ) -> Result<()> {
        let overflow = |axis: &str, offset: usize, extent: usize| {
            EpilogueError::ShapeMismatch(format!(
                "tile {} {}+{} overflow the address space",
                axis, offset, extent
            ))
        };
        let row_end = row_offset
            .checked_add(rows)
            .ok_or_else(|| overflow("rows", row_offset, rows))?;
        let col_end = col_offset
            .checked_add(cols)
            .ok_or_else(|| overflow("columns", col_offset, cols))?;

        for load in self.loads() {
            let (Some(op), BroadcastMode::Vector) = (load.operand(), load.mode()) else {
                continue;
            };
            let (axis_name, end, extent) = match load.kind().axis() {
                Axis::Row => ("rows", row_end, rows),
                Axis::Col => ("columns", col_end, cols),
            };
            if extent == 0 || op.len() >= end {
                continue;
            }
            if op.len() == 1 && !load.kind().allows_scalar() {
                return Err(EpilogueError::ScalarNotAllowed(load.role().name(), end));
            }
            return Err(EpilogueError::ShapeMismatch(format!(
                "{}: {} elements do not cover {} {}..{}",
                load.role().name(),
                op.len(),
                axis_name,
                end - extent,
                end
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::broadcast::LoadKind;
    use crate::types::ElementType;

    fn scale_a() -> BroadcastDescriptor {
        BroadcastDescriptor::new(LoadKind::ScalarOrRow, OperandRole::ScaleA, ElementType::F32)
    }

    fn bias() -> BroadcastDescriptor {
        BroadcastDescriptor::new(LoadKind::Col, OperandRole::Bias, ElementType::F32)
    }

    #[test]
    fn test_single_element_selects_scalar() {
        let data = [3.0f32];
        let args = args_from_operand(&scale_a(), Operand::F32(&data)).unwrap();
        assert_eq!(args.mode(), BroadcastMode::Scalar);
    }

    #[test]
    fn test_many_elements_select_vector() {
        let data = [3.0f32, 4.0];
        let args = args_from_operand(&scale_a(), Operand::F32(&data)).unwrap();
        assert_eq!(args.mode(), BroadcastMode::Vector);
        assert_eq!(args.operand().unwrap().as_ptr(), data.as_ptr().cast());
    }

    #[test]
    fn test_vector_only_load_never_scalar() {
        let data = [3.0f32];
        let args = args_from_operand(&bias(), Operand::F32(&data)).unwrap();
        assert_eq!(args.mode(), BroadcastMode::Vector);
    }

    #[test]
    fn test_empty_required_operand_is_missing() {
        let err = args_from_operand(&bias(), Operand::F32(&[])).unwrap_err();
        assert_eq!(err, EpilogueError::MissingOperand("bias"));
    }

    #[test]
    fn test_optional_operand_absent() {
        let args = args_from_optional_operand(&bias().optional(), None).unwrap();
        assert_eq!(args.mode(), BroadcastMode::Absent);
        let args = args_from_operand(&bias().optional(), Operand::F32(&[])).unwrap();
        assert_eq!(args.mode(), BroadcastMode::Absent);
    }

    #[test]
    fn test_none_for_required_load_rejected() {
        let err = args_from_optional_operand(&bias(), None).unwrap_err();
        assert_eq!(err, EpilogueError::MissingOperand("bias"));
    }

    #[test]
    fn test_element_type_checked() {
        let data = [half::f16::ONE; 2];
        let err = args_from_operand(&scale_a(), Operand::F16(&data)).unwrap_err();
        assert!(matches!(err, EpilogueError::ElementTypeMismatch { operand: "scale_a", .. }));
    }

    #[test]
    fn test_operands_get_filters_empty() {
        let a = [1.0f32];
        let b: [f32; 0] = [];
        let ops = EpilogueOperands::new(&a[..], &b[..]);
        assert!(ops.get(OperandRole::ScaleA).is_some());
        assert!(ops.get(OperandRole::ScaleB).is_none());
        assert_eq!(ops.require(OperandRole::Bias), Err(EpilogueError::MissingOperand("bias")));
    }

    #[test]
    fn test_check_extent() {
        let a = [1.0f32, 2.0];
        let b = [5.0f32];
        let bias_data = [1.0f32];
        let block = ArgumentBlock::new(
            None,
            NodeArgs::compute(vec![
                NodeArgs::Load(args_from_operand(&scale_a(), Operand::F32(&a)).unwrap()),
                NodeArgs::Accumulator,
                NodeArgs::Load(args_from_operand(&bias(), Operand::F32(&bias_data)).unwrap()),
            ]),
        );
        // scale_a covers rows 0..2; a scalar bias covers a single column.
        assert!(block.check_extent(0, 0, 2, 1).is_ok());
        assert_eq!(
            block.check_extent(0, 0, 2, 4),
            Err(EpilogueError::ScalarNotAllowed("bias", 4))
        );
        assert!(matches!(
            block.check_extent(1, 0, 2, 1),
            Err(EpilogueError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_check_extent_offset_overflow() {
        let a = [1.0f32];
        let block = ArgumentBlock::new(
            None,
            NodeArgs::compute(vec![
                NodeArgs::Load(args_from_operand(&scale_a(), Operand::F32(&a)).unwrap()),
                NodeArgs::Accumulator,
            ]),
        );
        // Scalar loads ignore coordinates, but the tile itself must be addressable.
        assert!(matches!(
            block.check_extent(usize::MAX, 0, 2, 1),
            Err(EpilogueError::ShapeMismatch(_))
        ));
        assert!(matches!(
            block.check_extent(0, usize::MAX - 1, 1, 2),
            Err(EpilogueError::ShapeMismatch(_))
        ));
        assert!(block.check_extent(usize::MAX - 2, 0, 2, 1).is_ok());
    }
}
