use super::Animation;

/// A pulse that travels around the pad ring, one pad per frame. Pads near
/// the cursor take their intensity from a falloff table indexed by distance.
pub struct TravelingPulse {
    pads: usize,
    falloff: Vec<u8>,
    cursor: usize,
}

impl TravelingPulse {
    pub fn new(pads: usize, falloff: Vec<u8>) -> Self {
        Self {
            pads,
            falloff,
            cursor: 0,
        }
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Intensity at `distance` pads from the cursor; zero past the table.
    pub fn intensity(&self, distance: usize) -> u8 {
        self.falloff.get(distance).copied().unwrap_or(0)
    }

    fn distance(&self, pad: usize) -> usize {
        let d = pad.abs_diff(self.cursor);
        d.min(self.pads - d)
    }
}

impl Animation for TravelingPulse {
    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn next_frame(&mut self, frame: &mut [u8]) {
        if self.pads == 0 {
            return;
        }

        for (pad, value) in frame.iter_mut().enumerate().take(self.pads) {
            *value = self.intensity(self.distance(pad));
        }

        self.cursor = (self.cursor + 1) % self.pads;
    }
}
