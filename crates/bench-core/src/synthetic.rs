//! Synthetic input generation

use crate::{BenchError, TensorShape};
use rand::Rng;
use tracing::debug;

/// Default cap on generated elements (1 GiB of f32)
pub const DEFAULT_MAX_ELEMENTS: u64 = 1 << 28;

/// Dense f32 buffer laid out row-major for one tensor
#[derive(Debug, Clone, PartialEq)]
pub struct InputBuffer {
    shape: TensorShape,
    data: Vec<f32>,
}

impl InputBuffer {
    /// Tensor shape of the buffer
    pub fn shape(&self) -> &TensorShape {
        &self.shape
    }

    /// Element values
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Split into shape and values, for backends that take ownership
    pub fn into_parts(self) -> (TensorShape, Vec<f32>) {
        (self.shape, self.data)
    }
}

/// Fills tensors with values drawn uniformly from `[0.0, 1.0)`
#[derive(Debug, Clone)]
pub struct SyntheticInputGenerator {
    max_elements: u64,
}

impl Default for SyntheticInputGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ELEMENTS)
    }
}

impl SyntheticInputGenerator {
    /// Create a generator refusing shapes above `max_elements`
    pub fn new(max_elements: u64) -> Self {
        Self { max_elements }
    }

    /// Generate a buffer using the thread-local RNG
    pub fn generate(&self, shape: &TensorShape) -> Result<InputBuffer, BenchError> {
        self.generate_with(shape, &mut rand::thread_rng())
    }

    /// Generate a buffer from a caller-supplied RNG
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        shape: &TensorShape,
        rng: &mut R,
    ) -> Result<InputBuffer, BenchError> {
        let count = shape.element_count().ok_or_else(|| {
            BenchError::InputAllocation(format!("element count of {} overflows", shape))
        })?;

        if count > self.max_elements {
            return Err(BenchError::InputAllocation(format!(
                "{} needs {} elements, limit is {}",
                shape, count, self.max_elements
            )));
        }

        let len = usize::try_from(count).map_err(|_| {
            BenchError::InputAllocation(format!("{} elements do not fit in memory", count))
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| BenchError::InputAllocation(format!("{}: {}", shape, e)))?;
        data.extend((0..len).map(|_| rng.gen::<f32>()));

        debug!("Generated random input {} ({} elements)", shape, len);

        Ok(InputBuffer {
            shape: shape.clone(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn shape(dims: &[usize]) -> TensorShape {
        TensorShape::new(dims.to_vec()).unwrap()
    }

    #[test]
    fn test_generates_product_of_shape() {
        let buffer = SyntheticInputGenerator::default()
            .generate(&shape(&[1, 3, 4, 4]))
            .unwrap();

        assert_eq!(buffer.len(), 48);
        assert_eq!(buffer.shape(), &shape(&[1, 3, 4, 4]));
    }

    #[test]
    fn test_large_buffer() {
        let buffer = SyntheticInputGenerator::default()
            .generate(&shape(&[10, 1000, 1000]))
            .unwrap();

        assert_eq!(buffer.len(), 10_000_000);
    }

    #[test]
    fn test_rejects_oversized_shape() {
        let generator = SyntheticInputGenerator::new(100);
        let err = generator.generate(&shape(&[1, 3, 224, 224])).unwrap_err();

        assert_eq!(err.kind(), "input_allocation");
    }

    #[test]
    fn test_rejects_overflowing_shape() {
        let generator = SyntheticInputGenerator::new(u64::MAX);
        let err = generator.generate(&shape(&[usize::MAX, 2, 2])).unwrap_err();

        assert!(matches!(err, BenchError::InputAllocation(_)));
    }

    #[test]
    fn test_values_are_not_constant() {
        let mut rng = StdRng::seed_from_u64(7);
        let buffer = SyntheticInputGenerator::default()
            .generate_with(&shape(&[256]), &mut rng)
            .unwrap();

        let first = buffer.data()[0];
        assert!(buffer.data().iter().any(|&v| v != first));
    }

    proptest! {
        #[test]
        fn prop_buffer_matches_shape_and_range(
            dims in proptest::collection::vec(1usize..16, 1..5),
            seed in any::<u64>(),
        ) {
            let shape = TensorShape::new(dims).unwrap();
            let expected = shape.element_count().unwrap() as usize;
            let mut rng = StdRng::seed_from_u64(seed);

            let buffer = SyntheticInputGenerator::default()
                .generate_with(&shape, &mut rng)
                .unwrap();

            prop_assert_eq!(buffer.len(), expected);
            prop_assert!(buffer.data().iter().all(|&v| (0.0..1.0).contains(&v)));
        }
    }
}
