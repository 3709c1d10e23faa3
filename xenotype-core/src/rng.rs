use rand::Rng;

/// Source of the uniform draws used by generation. Every `rand::Rng` is one;
/// tests plug in scripted sources to pin exact paths.
pub trait RandomSource {
    /// Uniform integer in `[0, upper)`. `upper` must be non-zero.
    fn below(&mut self, upper: usize) -> usize;

    /// Uniform integer in `[low, high]`.
    fn inclusive(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            return low;
        }
        low + self.below(high - low + 1)
    }
}

impl<R: Rng> RandomSource for R {
    fn below(&mut self, upper: usize) -> usize {
        self.gen_range(0..upper)
    }
}

/// Replays a fixed list of draws, each clamped into the requested range.
/// Once the script runs out every draw returns zero.
#[cfg(test)]
pub(crate) struct ScriptedSource {
    draws: std::collections::VecDeque<usize>,
}

#[cfg(test)]
impl ScriptedSource {
    pub(crate) fn new(draws: &[usize]) -> Self {
        Self {
            draws: draws.iter().copied().collect(),
        }
    }

    /// Always draws zero: every gene is included and trims remove the minimum.
    pub(crate) fn zeros() -> Self {
        Self::new(&[])
    }
}

#[cfg(test)]
impl RandomSource for ScriptedSource {
    fn below(&mut self, upper: usize) -> usize {
        let next = self.draws.pop_front().unwrap_or(0);
        next.min(upper.saturating_sub(1))
    }
}

/// Logs the bound of every draw and always answers zero.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSource {
    pub(crate) bounds: Vec<usize>,
}

#[cfg(test)]
impl RandomSource for RecordingSource {
    fn below(&mut self, upper: usize) -> usize {
        self.bounds.push(upper);
        0
    }
}
