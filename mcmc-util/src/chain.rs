/// Ordered, fixed-capacity buffer of scalar samples collected over
/// one run of consecutive chain steps.
#[derive(Debug, Clone)]
pub struct SampleBlock {
    samples: Vec<f64>,
    capacity: usize,
}

impl SampleBlock {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample. Returns `false` and drops the value when the
    /// block is already full.
    pub fn push(&mut self, value: f64) -> bool {
        if self.is_full() {
            return false;
        }
        self.samples.push(value);
        true
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.samples
    }

    pub fn last(&self) -> Option<f64> {
        self.samples.last().copied()
    }

    /// Sample mean; `None` for an empty block.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    /// Unbiased sample variance; `None` with fewer than two samples.
    pub fn variance(&self) -> Option<f64> {
        let n = self.samples.len();
        if n < 2 {
            return None;
        }
        let mean = self.mean()?;
        let ss: f64 = self.samples.iter().map(|x| (x - mean) * (x - mean)).sum();
        Some(ss / (n - 1) as f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.samples.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.samples.iter().copied().reduce(f64::max)
    }
}
