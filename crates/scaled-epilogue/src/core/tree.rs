//! Epilogue expression trees.
//!
//! A tree is composed once at configuration time and validated then; a
//! launch supplies only the matching [`ArgumentBlock`].

use super::args::{ArgumentBlock, NodeArgs};
use super::broadcast::{Axis, BroadcastDescriptor, OperandRole};
use super::compute::ComputeNode;
use crate::error::{EpilogueError, Result};
use crate::types::{ElementType, RoundStyle};
use tracing::instrument;

/// Widest operator arity.
const MAX_ARITY: usize = 3;

/// One node of an epilogue expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EpilogueNode {
    /// The accumulator value at the current coordinate.
    Accumulator,
    /// A broadcast operand read at the current coordinate.
    Load(BroadcastDescriptor),
    /// An operator over the values of its children, in order.
    Compute {
        node: ComputeNode,
        children: Vec<EpilogueNode>,
    },
}

impl EpilogueNode {
    pub fn load(desc: BroadcastDescriptor) -> Self {
        EpilogueNode::Load(desc)
    }

    pub fn compute(node: ComputeNode, children: impl Into<Vec<EpilogueNode>>) -> Self {
        EpilogueNode::Compute {
            node,
            children: children.into(),
        }
    }

    fn collect_loads<'s>(&'s self, out: &mut Vec<&'s BroadcastDescriptor>) {
        match self {
            EpilogueNode::Accumulator => {}
            EpilogueNode::Load(desc) => out.push(desc),
            EpilogueNode::Compute { children, .. } => {
                for child in children {
                    child.collect_loads(out);
                }
            }
        }
    }

    fn count_accumulators(&self) -> usize {
        match self {
            EpilogueNode::Accumulator => 1,
            EpilogueNode::Load(_) => 0,
            EpilogueNode::Compute { children, .. } => {
                children.iter().map(|c| c.count_accumulators()).sum()
            }
        }
    }
}

/// A validated expression tree producing one output value per coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EpilogueTree {
    root: EpilogueNode,
    accumulator: ElementType,
    output: ElementType,
}

impl EpilogueTree {
    /// Validate and freeze a tree whose accumulator leaves hold `accumulator`
    /// values.
    ///
    /// Rejects trees that could only run with wrong semantics: operator arity
    /// mismatches, non-float compute outputs, a missing accumulator leaf,
    /// scales bound to the wrong axis, scalar-capable bias or multiplier
    /// loads, optional scale loads and duplicated operand roles.
    #[instrument(level = "debug", skip(root), err)]
    pub fn new(root: EpilogueNode, accumulator: ElementType) -> Result<Self> {
        let output = match &root {
            EpilogueNode::Compute { node, .. } => node.output,
            _ => return Err(invalid("the root of an epilogue must be a compute node")),
        };
        validate_node(&root)?;

        if root.count_accumulators() == 0 {
            return Err(invalid("the tree never reads the accumulator"));
        }

        let mut loads = Vec::new();
        root.collect_loads(&mut loads);
        for (i, desc) in loads.iter().enumerate() {
            if loads[..i].iter().any(|d| d.role == desc.role) {
                return Err(invalid(format!(
                    "operand {} is bound to more than one load",
                    desc.role.name()
                )));
            }
            validate_load(desc, output)?;
        }

        Ok(Self {
            root,
            accumulator,
            output,
        })
    }

    pub fn root(&self) -> &EpilogueNode {
        &self.root
    }

    pub fn accumulator_type(&self) -> ElementType {
        self.accumulator
    }

    pub fn output_type(&self) -> ElementType {
        self.output
    }

    /// Rounding applied by the root node.
    pub fn output_round(&self) -> RoundStyle {
        match &self.root {
            EpilogueNode::Compute { node, .. } => node.round,
            _ => RoundStyle::default(),
        }
    }

    /// Leaf loads in tree order.
    pub fn loads(&self) -> Vec<&BroadcastDescriptor> {
        let mut out = Vec::new();
        self.root.collect_loads(&mut out);
        out
    }

    /// Roles read by this tree.
    pub fn roles(&self) -> Vec<OperandRole> {
        self.loads().iter().map(|d| d.role).collect()
    }

    /// Check that `args` mirrors this tree node for node.
    pub fn check_args(&self, args: &ArgumentBlock<'_>) -> Result<()> {
        check_node(&self.root, args.root(), "root")
    }

    /// Evaluate the tree at one coordinate.
    ///
    /// `args` must have passed [`EpilogueTree::check_args`]; mismatched nodes
    /// evaluate to NaN.
    #[inline]
    pub fn evaluate_at(&self, args: &NodeArgs<'_>, acc: f32, row: usize, col: usize) -> f32 {
        eval_node(&self.root, args, acc, row, col)
    }
}

fn invalid(msg: impl Into<String>) -> EpilogueError {
    EpilogueError::InvalidConfiguration(msg.into())
}

fn validate_node(node: &EpilogueNode) -> Result<()> {
    let EpilogueNode::Compute { node, children } = node else {
        return Ok(());
    };
    if children.len() != node.op.arity() {
        return Err(invalid(format!(
            "{} takes {} inputs, got {}",
            node.op.name(),
            node.op.arity(),
            children.len()
        )));
    }
    if !node.output.is_float() {
        return Err(invalid(format!(
            "compute nodes must produce a floating type, got {}",
            node.output
        )));
    }
    children.iter().try_for_each(validate_node)
}

fn validate_load(desc: &BroadcastDescriptor, output: ElementType) -> Result<()> {
    let role = desc.role.name();
    match desc.role {
        OperandRole::ScaleA | OperandRole::ScaleB => {
            let axis = if desc.role == OperandRole::ScaleA {
                Axis::Row
            } else {
                Axis::Col
            };
            if desc.kind.axis() != axis {
                return Err(invalid(format!("{} must broadcast along {:?}", role, axis)));
            }
            if desc.element != ElementType::F32 {
                return Err(invalid(format!("{} must be f32, got {}", role, desc.element)));
            }
            if desc.optional && desc.kind.allows_scalar() {
                return Err(invalid(format!(
                    "scalar-or-vector load for {} cannot be optional",
                    role
                )));
            }
        }
        OperandRole::Bias | OperandRole::Multiplier => {
            if desc.kind.allows_scalar() {
                return Err(invalid(format!(
                    "{} must be a per-channel vector load, not scalar-or-vector",
                    role
                )));
            }
            if desc.kind.axis() != Axis::Col {
                return Err(invalid(format!("{} must broadcast along output columns", role)));
            }
            // An absent load reads as zero, which is only neutral for an addend.
            if desc.optional && desc.role == OperandRole::Multiplier {
                return Err(invalid(format!("{} cannot be optional", role)));
            }
            if desc.element != output {
                return Err(invalid(format!(
                    "{} must match the output type {}, got {}",
                    role, output, desc.element
                )));
            }
        }
    }
    Ok(())
}

fn check_node(node: &EpilogueNode, args: &NodeArgs<'_>, path: &str) -> Result<()> {
    match (node, args) {
        (EpilogueNode::Accumulator, NodeArgs::Accumulator) => Ok(()),
        (EpilogueNode::Load(desc), NodeArgs::Load(load)) => {
            if load.kind() != desc.kind || load.role() != desc.role {
                return Err(EpilogueError::ArgumentShape(format!(
                    "{}: expected {:?} load of {}, got {:?} load of {}",
                    path,
                    desc.kind,
                    desc.role.name(),
                    load.kind(),
                    load.role().name()
                )));
            }
            if let Some(op) = load.operand() {
                if op.element_type() != desc.element {
                    return Err(EpilogueError::ElementTypeMismatch {
                        operand: desc.role.name(),
                        expected: desc.element,
                        actual: op.element_type(),
                    });
                }
            } else if !desc.optional {
                return Err(EpilogueError::MissingOperand(desc.role.name()));
            }
            Ok(())
        }
        (EpilogueNode::Compute { children, .. }, NodeArgs::Compute(child_args)) => {
            if children.len() != child_args.len() {
                return Err(EpilogueError::ArgumentShape(format!(
                    "{}: expected {} child arguments, got {}",
                    path,
                    children.len(),
                    child_args.len()
                )));
            }
            for (i, (child, child_args)) in children.iter().zip(child_args).enumerate() {
                check_node(child, child_args, &format!("{}.{}", path, i))?;
            }
            Ok(())
        }
        _ => Err(EpilogueError::ArgumentShape(format!(
            "{}: node kind does not match its arguments",
            path
        ))),
    }
}

fn eval_node(node: &EpilogueNode, args: &NodeArgs<'_>, acc: f32, row: usize, col: usize) -> f32 {
    match (node, args) {
        (EpilogueNode::Accumulator, NodeArgs::Accumulator) => acc,
        (EpilogueNode::Load(_), NodeArgs::Load(load)) => load.load(row, col),
        (EpilogueNode::Compute { node, children }, NodeArgs::Compute(child_args)) => {
            let mut values = [0.0f32; MAX_ARITY];
            let inputs = children.iter().zip(child_args);
            for (slot, (child, child_args)) in values.iter_mut().zip(inputs) {
                *slot = eval_node(child, child_args, acc, row, col);
            }
            node.apply(&values[..children.len()])
        }
        _ => f32::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::args::args_from_operand;
    use crate::core::broadcast::LoadKind;
    use crate::operand::Operand;

    fn scale_a() -> BroadcastDescriptor {
        BroadcastDescriptor::new(LoadKind::ScalarOrRow, OperandRole::ScaleA, ElementType::F32)
    }

    fn scale_b() -> BroadcastDescriptor {
        BroadcastDescriptor::new(LoadKind::ScalarOrCol, OperandRole::ScaleB, ElementType::F32)
    }

    fn scaled_root() -> EpilogueNode {
        EpilogueNode::compute(
            ComputeNode::multiply(ElementType::F32),
            vec![
                EpilogueNode::load(scale_a()),
                EpilogueNode::compute(
                    ComputeNode::multiply(ElementType::F32),
                    vec![EpilogueNode::load(scale_b()), EpilogueNode::Accumulator],
                ),
            ],
        )
    }

    #[test]
    fn test_valid_tree() {
        let tree = EpilogueTree::new(scaled_root(), ElementType::I32).unwrap();
        assert_eq!(tree.output_type(), ElementType::F32);
        assert_eq!(tree.accumulator_type(), ElementType::I32);
        assert_eq!(tree.roles(), vec![OperandRole::ScaleA, OperandRole::ScaleB]);
    }

    #[test]
    fn test_root_must_be_compute() {
        let err = EpilogueTree::new(EpilogueNode::Accumulator, ElementType::F32).unwrap_err();
        assert!(matches!(err, EpilogueError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_arity_mismatch_rejected() {
        let root = EpilogueNode::compute(
            ComputeNode::multiply_add(ElementType::F32),
            vec![EpilogueNode::load(scale_a()), EpilogueNode::Accumulator],
        );
        assert!(EpilogueTree::new(root, ElementType::F32).is_err());
    }

    #[test]
    fn test_tree_without_accumulator_rejected() {
        let root = EpilogueNode::compute(
            ComputeNode::multiply(ElementType::F32),
            vec![EpilogueNode::load(scale_a()), EpilogueNode::load(scale_b())],
        );
        assert!(EpilogueTree::new(root, ElementType::F32).is_err());
    }

    #[test]
    fn test_scalar_capable_bias_rejected() {
        let bias =
            BroadcastDescriptor::new(LoadKind::ScalarOrCol, OperandRole::Bias, ElementType::F32);
        let root = EpilogueNode::compute(
            ComputeNode::multiply_add(ElementType::F32),
            vec![
                EpilogueNode::load(scale_a()),
                EpilogueNode::Accumulator,
                EpilogueNode::load(bias),
            ],
        );
        let err = EpilogueTree::new(root, ElementType::F32).unwrap_err();
        assert!(err.to_string().contains("per-channel vector"));
    }

    #[test]
    fn test_swapped_scale_axis_rejected() {
        let wrong =
            BroadcastDescriptor::new(LoadKind::ScalarOrCol, OperandRole::ScaleA, ElementType::F32);
        let root = EpilogueNode::compute(
            ComputeNode::multiply(ElementType::F32),
            vec![EpilogueNode::load(wrong), EpilogueNode::Accumulator],
        );
        assert!(EpilogueTree::new(root, ElementType::F32).is_err());
    }

    #[test]
    fn test_optional_scale_rejected() {
        let root = EpilogueNode::compute(
            ComputeNode::multiply(ElementType::F32),
            vec![EpilogueNode::load(scale_a().optional()), EpilogueNode::Accumulator],
        );
        assert!(EpilogueTree::new(root, ElementType::F32).is_err());
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let root = EpilogueNode::compute(
            ComputeNode::multiply_add(ElementType::F32),
            vec![
                EpilogueNode::load(scale_a()),
                EpilogueNode::Accumulator,
                EpilogueNode::load(scale_a()),
            ],
        );
        assert!(EpilogueTree::new(root, ElementType::F32).is_err());
    }

    #[test]
    fn test_integer_output_rejected() {
        let root = EpilogueNode::compute(
            ComputeNode::multiply(ElementType::I32),
            vec![EpilogueNode::load(scale_a()), EpilogueNode::Accumulator],
        );
        assert!(EpilogueTree::new(root, ElementType::I32).is_err());
    }

    #[test]
    fn test_bias_type_must_match_output() {
        let bias = BroadcastDescriptor::new(LoadKind::Col, OperandRole::Bias, ElementType::F32);
        let root = EpilogueNode::compute(
            ComputeNode::multiply_add(ElementType::F16),
            vec![
                EpilogueNode::load(scale_a()),
                EpilogueNode::Accumulator,
                EpilogueNode::load(bias),
            ],
        );
        assert!(EpilogueTree::new(root, ElementType::F32).is_err());
    }

    #[test]
    fn test_optional_multiplier_rejected() {
        let ls = BroadcastDescriptor::new(LoadKind::Col, OperandRole::Multiplier, ElementType::F32);
        let root = EpilogueNode::compute(
            ComputeNode::multiply(ElementType::F32),
            vec![EpilogueNode::load(ls.optional()), scaled_root()],
        );
        let err = EpilogueTree::new(root, ElementType::F32).unwrap_err();
        assert!(err.to_string().contains("multiplier cannot be optional"));

        let root = EpilogueNode::compute(
            ComputeNode::multiply(ElementType::F32),
            vec![EpilogueNode::load(ls), scaled_root()],
        );
        assert!(EpilogueTree::new(root, ElementType::F32).is_ok());
    }

    #[test]
    fn test_optional_bias_accepted() {
        let bias = BroadcastDescriptor::new(LoadKind::Col, OperandRole::Bias, ElementType::F32);
        let root = EpilogueNode::compute(
            ComputeNode::multiply_add(ElementType::F32),
            vec![
                EpilogueNode::load(scale_a()),
                EpilogueNode::Accumulator,
                EpilogueNode::load(bias.optional()),
            ],
        );
        assert!(EpilogueTree::new(root, ElementType::F32).is_ok());
    }

    #[test]
    fn test_check_args_and_evaluate() {
        let tree = EpilogueTree::new(scaled_root(), ElementType::F32).unwrap();
        let a = [2.0f32, 3.0];
        let b = [10.0f32, 100.0];
        let args = ArgumentBlock::new(
            None,
            NodeArgs::compute(vec![
                NodeArgs::Load(args_from_operand(&scale_a(), Operand::F32(&a)).unwrap()),
                NodeArgs::compute(vec![
                    NodeArgs::Load(args_from_operand(&scale_b(), Operand::F32(&b)).unwrap()),
                    NodeArgs::Accumulator,
                ]),
            ]),
        );
        tree.check_args(&args).unwrap();
        assert_eq!(tree.evaluate_at(args.root(), 4.0, 1, 1), 1200.0);
        assert_eq!(tree.evaluate_at(args.root(), 2.0, 0, 1), 400.0);
    }

    #[test]
    fn test_check_args_rejects_wrong_shape() {
        let tree = EpilogueTree::new(scaled_root(), ElementType::F32).unwrap();
        let a = [2.0f32];
        let args = ArgumentBlock::new(
            None,
            NodeArgs::compute(vec![
                NodeArgs::Load(args_from_operand(&scale_a(), Operand::F32(&a)).unwrap()),
                NodeArgs::Accumulator,
            ]),
        );
        let err = tree.check_args(&args).unwrap_err();
        assert!(matches!(err, EpilogueError::ArgumentShape(_)));
    }
}
