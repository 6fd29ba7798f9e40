//! PointerDriver trait — synthetic pointer movement and clicks.

use super::ProviderError;
use crate::geometry::Point;

/// Moves the pointer and clicks at absolute global coordinates.
pub trait PointerDriver: Send + Sync {
    fn move_to(&self, point: Point) -> Result<(), ProviderError>;
    fn primary_click(&self, point: Point) -> Result<(), ProviderError>;
    fn secondary_click(&self, point: Point) -> Result<(), ProviderError>;
    fn double_primary_click(&self, point: Point) -> Result<(), ProviderError>;
}

/// Pointer driver that only logs what it would do.
pub struct DryRunPointer;

impl PointerDriver for DryRunPointer {
    fn move_to(&self, point: Point) -> Result<(), ProviderError> {
        tracing::info!(x = point.x, y = point.y, "dry run: move pointer");
        Ok(())
    }

    fn primary_click(&self, point: Point) -> Result<(), ProviderError> {
        tracing::info!(x = point.x, y = point.y, "dry run: primary click");
        Ok(())
    }

    fn secondary_click(&self, point: Point) -> Result<(), ProviderError> {
        tracing::info!(x = point.x, y = point.y, "dry run: secondary click");
        Ok(())
    }

    fn double_primary_click(&self, point: Point) -> Result<(), ProviderError> {
        tracing::info!(x = point.x, y = point.y, "dry run: double click");
        Ok(())
    }
}
