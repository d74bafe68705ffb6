//! Circular delay buffer with fractional reads

/// Values below this are flushed to zero before they enter the buffer
const DENORMAL_THRESHOLD: f32 = 1e-20;

/// Fixed-capacity delay line. The buffer is sized once for the maximum
/// delay and never reallocated.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    pub fn new(max_delay_secs: f32, sample_rate: f32) -> Self {
        let len = (max_delay_secs as f64 * sample_rate as f64).ceil() as usize + 2;
        Self {
            buffer: vec![0.0; len.max(4)],
            write_pos: 0,
        }
    }

    /// Longest delay this line can produce, in samples
    pub fn max_delay_samples(&self) -> f32 {
        (self.buffer.len() - 2) as f32
    }

    /// Read `delay_samples` behind the write head, interpolating linearly
    /// between neighbours. Clamped to `[1, max_delay_samples]`.
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        let delay = delay_samples.clamp(1.0, self.max_delay_samples());
        let whole = delay.floor();
        let frac = delay - whole;
        let len = self.buffer.len();

        let idx_a = (self.write_pos + len - whole as usize) % len;
        let idx_b = (idx_a + len - 1) % len;
        let a = self.buffer[idx_a];
        let b = self.buffer[idx_b];
        a + (b - a) * frac
    }

    /// Push one sample and move the write head
    #[inline]
    pub fn write(&mut self, sample: f32) {
        let sample = if sample.abs() < DENORMAL_THRESHOLD { 0.0 } else { sample };
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_delay() {
        let mut line = DelayLine::new(0.01, 1000.0);
        // read before write: the sample written n steps ago
        let mut out = Vec::new();
        for i in 0..8 {
            out.push(line.read(3.0));
            line.write(if i == 0 { 1.0 } else { 0.0 });
        }
        assert_eq!(out, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_fractional_delay_interpolates() {
        let mut line = DelayLine::new(0.01, 1000.0);
        line.write(0.0);
        line.write(1.0);
        // 1 sample back is 1.0, 2 samples back is 0.0
        assert_eq!(line.read(1.0), 1.0);
        assert_eq!(line.read(2.0), 0.0);
        assert!((line.read(1.25) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_read_clamps_to_capacity() {
        let mut line = DelayLine::new(0.005, 1000.0);
        for _ in 0..20 {
            line.write(0.5);
        }
        assert_eq!(line.max_delay_samples(), 5.0);
        assert_eq!(line.read(1000.0), 0.5);
        assert_eq!(line.read(0.0), 0.5);
    }

    #[test]
    fn test_denormals_flushed() {
        let mut line = DelayLine::new(0.01, 1000.0);
        line.write(1e-30);
        assert_eq!(line.read(1.0), 0.0);
    }
}
