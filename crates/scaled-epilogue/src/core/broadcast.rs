//! Broadcast descriptors: how one scalar is read for an output coordinate.

use crate::operand::Operand;
use crate::types::ElementType;

/// Output axis a vector operand is indexed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// One value per output row, repeated across columns.
    Row,
    /// One value per output column, repeated across rows.
    Col,
}

/// Access pattern of a broadcast load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadKind {
    /// A single scalar, or one value per row.
    ScalarOrRow,
    /// A single scalar, or one value per column.
    ScalarOrCol,
    /// Always one value per row.
    Row,
    /// Always one value per column.
    Col,
}

impl LoadKind {
    pub fn axis(&self) -> Axis {
        match self {
            LoadKind::ScalarOrRow | LoadKind::Row => Axis::Row,
            LoadKind::ScalarOrCol | LoadKind::Col => Axis::Col,
        }
    }

    /// Whether a one-element operand is read as a scalar.
    pub fn allows_scalar(&self) -> bool {
        matches!(self, LoadKind::ScalarOrRow | LoadKind::ScalarOrCol)
    }
}

/// Which epilogue operand a load reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandRole {
    /// Activation (A) scales: per-tensor or per-row.
    ScaleA,
    /// Weight (B) scales: per-tensor or per-column.
    ScaleB,
    /// Per-output-channel bias.
    Bias,
    /// Per-output-channel multiplier.
    Multiplier,
}

impl OperandRole {
    pub fn name(&self) -> &'static str {
        match self {
            OperandRole::ScaleA => "scale_a",
            OperandRole::ScaleB => "scale_b",
            OperandRole::Bias => "bias",
            OperandRole::Multiplier => "multiplier",
        }
    }
}

/// Configuration-time description of one leaf load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BroadcastDescriptor {
    pub kind: LoadKind,
    pub role: OperandRole,
    pub element: ElementType,
    /// Accept an absent operand and read it as zero.
    pub optional: bool,
}

impl BroadcastDescriptor {
    pub fn new(kind: LoadKind, role: OperandRole, element: ElementType) -> Self {
        Self {
            kind,
            role,
            element,
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Resolved read mode of a broadcast operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastMode {
    /// One value for every coordinate.
    Scalar,
    /// Indexed along the load's axis.
    Vector,
    /// No operand bound; reads as zero.
    Absent,
}

/// Per-launch arguments of one leaf load.
///
/// Binds the caller's data without copying; the mode is resolved once when
/// the arguments are built, so loading a value is a single branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadArgs<'a> {
    kind: LoadKind,
    role: OperandRole,
    mode: BroadcastMode,
    data: Option<Operand<'a>>,
}

impl<'a> LoadArgs<'a> {
    pub(crate) fn bound(
        desc: &BroadcastDescriptor,
        mode: BroadcastMode,
        data: Operand<'a>,
    ) -> Self {
        Self {
            kind: desc.kind,
            role: desc.role,
            mode,
            data: Some(data),
        }
    }

    pub(crate) fn absent(desc: &BroadcastDescriptor) -> Self {
        Self {
            kind: desc.kind,
            role: desc.role,
            mode: BroadcastMode::Absent,
            data: None,
        }
    }

    pub fn kind(&self) -> LoadKind {
        self.kind
    }

    pub fn role(&self) -> OperandRole {
        self.role
    }

    pub fn mode(&self) -> BroadcastMode {
        self.mode
    }

    pub fn operand(&self) -> Option<Operand<'a>> {
        self.data
    }

    /// Value at global output coordinate `(row, col)`.
    #[inline]
    pub fn load(&self, row: usize, col: usize) -> f32 {
        match (self.mode, self.data) {
            (BroadcastMode::Scalar, Some(op)) => op.get_f32(0),
            (BroadcastMode::Vector, Some(op)) => match self.kind.axis() {
                Axis::Row => op.get_f32(row),
                Axis::Col => op.get_f32(col),
            },
            _ => 0.0,
        }
    }
}
