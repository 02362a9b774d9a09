//! Launch configuration shared by all epilogue variants.

use crate::error::{EpilogueError, Result};
use crate::tile::TileShape;
use crate::types::ElementType;

/// Element types and evaluation blocking for a configured epilogue.
///
/// # Example
///
/// ```
/// use scaled_epilogue::{ElementType, EpilogueConfig, TileShape};
///
/// let config = EpilogueConfig::new()
///     .accumulator(ElementType::I32)
///     .output(ElementType::BF16)
///     .tile(TileShape::new(32, 128));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EpilogueConfig {
    accumulator: ElementType,
    output: ElementType,
    tile: TileShape,
}

impl EpilogueConfig {
    /// `f32 -> f32` with 64x64 evaluation tiles.
    pub fn new() -> Self {
        Self {
            accumulator: ElementType::F32,
            output: ElementType::F32,
            tile: TileShape::default(),
        }
    }

    /// Element type of the GEMM accumulator.
    pub fn accumulator(mut self, ty: ElementType) -> Self {
        self.accumulator = ty;
        self
    }

    /// Element type written to the output tile.
    pub fn output(mut self, ty: ElementType) -> Self {
        self.output = ty;
        self
    }

    pub fn tile(mut self, tile: TileShape) -> Self {
        self.tile = tile;
        self
    }

    pub fn accumulator_type(&self) -> ElementType {
        self.accumulator
    }

    pub fn output_type(&self) -> ElementType {
        self.output
    }

    pub fn tile_shape(&self) -> TileShape {
        self.tile
    }

    /// Check the pieces the expression tree cannot: the tile shape and the
    /// output type. Operand typing is checked when the tree is built.
    pub fn validate(&self) -> Result<()> {
        if self.tile.rows == 0 || self.tile.cols == 0 {
            return Err(EpilogueError::InvalidConfiguration(format!(
                "tile shape must be non-empty, got {}x{}",
                self.tile.rows, self.tile.cols
            )));
        }
        if !self.output.is_float() {
            return Err(EpilogueError::InvalidConfiguration(format!(
                "output element type must be floating point, got {}",
                self.output
            )));
        }
        Ok(())
    }
}

impl Default for EpilogueConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EpilogueConfig::default();
        assert_eq!(config.accumulator_type(), ElementType::F32);
        assert_eq!(config.output_type(), ElementType::F32);
        assert_eq!(config.tile_shape(), TileShape::new(64, 64));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = EpilogueConfig::new()
            .accumulator(ElementType::I32)
            .output(ElementType::F16)
            .tile(TileShape::new(8, 16));
        assert_eq!(config.accumulator_type(), ElementType::I32);
        assert_eq!(config.output_type(), ElementType::F16);
        assert_eq!(config.tile_shape(), TileShape::new(8, 16));
    }

    #[test]
    fn test_rejects_empty_tile() {
        let config = EpilogueConfig::new().tile(TileShape::new(16, 0));
        assert!(matches!(config.validate(), Err(EpilogueError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_integer_output() {
        let config = EpilogueConfig::new().output(ElementType::I32);
        assert!(matches!(config.validate(), Err(EpilogueError::InvalidConfiguration(_))));
    }
}
