use super::Animation;

/// Sweeps one physical row at a time, lighting each pad for `hold` frames
/// before moving on, and switches rows after every full sweep. The shared
/// intensity bounces between `min` and `max` by `step` per pad.
pub struct RowPulse {
    rows: Vec<Vec<usize>>,
    hold: u32,
    min: u8,
    max: u8,
    step: u8,
    row: usize,
    pos: usize,
    held: u32,
    intensity: u8,
    rising: bool,
}

impl RowPulse {
    pub fn new(rows: Vec<Vec<usize>>, hold: u32, min: u8, max: u8, step: u8) -> Self {
        let rows = rows.into_iter().filter(|r| !r.is_empty()).collect();

        Self {
            rows,
            hold: hold.max(1),
            min,
            max: max.max(min),
            step: step.max(1),
            row: 0,
            pos: 0,
            held: 0,
            intensity: min,
            rising: true,
        }
    }

    #[cfg(test)]
    pub fn row(&self) -> usize {
        self.row
    }

    #[cfg(test)]
    pub fn intensity(&self) -> u8 {
        self.intensity
    }

    fn bounce(&mut self) {
        if self.rising {
            self.intensity = self.intensity.saturating_add(self.step).min(self.max);
            if self.intensity == self.max {
                self.rising = false;
            }
        } else {
            self.intensity = self.intensity.saturating_sub(self.step).max(self.min);
            if self.intensity == self.min {
                self.rising = true;
            }
        }
    }
}

impl Animation for RowPulse {
    fn reset(&mut self) {
        self.row = 0;
        self.pos = 0;
        self.held = 0;
        self.intensity = self.min;
        self.rising = true;
    }

    fn next_frame(&mut self, frame: &mut [u8]) {
        frame.fill(0);

        let Some(row) = self.rows.get(self.row) else {
            return;
        };
        let row_len = row.len();

        if let Some(value) = frame.get_mut(row[self.pos]) {
            *value = self.intensity;
        }

        self.held += 1;
        if self.held < self.hold {
            return;
        }

        self.held = 0;
        self.pos += 1;
        self.bounce();

        if self.pos == row_len {
            self.pos = 0;
            self.row = (self.row + 1) % self.rows.len();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn lit(frame: &[u8]) -> Vec<(usize, u8)> {
        frame
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0)
            .map(|(i, v)| (i, *v))
            .collect()
    }

    #[test]
    fn sweeps_rows_alternately() {
        let mut pulse = RowPulse::new(vec![vec![4, 5, 6], vec![0, 1, 2]], 1, 10, 100, 5);
        let mut frame = [0u8; 8];
        let mut order = vec![];

        for _ in 0..9 {
            pulse.next_frame(&mut frame);
            let on = lit(&frame);
            assert_eq!(on.len(), 1);
            order.push(on[0].0);
        }

        assert_eq!(order, vec![4, 5, 6, 0, 1, 2, 4, 5, 6]);
    }

    #[test]
    fn holds_each_pad() {
        let mut pulse = RowPulse::new(vec![vec![0, 1]], 3, 10, 100, 5);
        let mut frame = [0u8; 2];
        let mut order = vec![];

        for _ in 0..6 {
            pulse.next_frame(&mut frame);
            order.push(lit(&frame)[0].0);
        }

        assert_eq!(order, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn intensity_bounces_between_bounds() {
        let mut pulse = RowPulse::new(vec![vec![0, 1, 2, 3]], 1, 10, 30, 8);
        let mut frame = [0u8; 4];
        let mut seen = vec![];

        for _ in 0..10 {
            pulse.next_frame(&mut frame);
            seen.push(lit(&frame)[0].1);
        }

        assert_eq!(seen, vec![10, 18, 26, 30, 22, 14, 10, 18, 26, 30]);
    }

    #[test]
    fn reset_restarts_from_first_row() {
        let mut pulse = RowPulse::new(vec![vec![0], vec![1]], 1, 10, 30, 8);
        let mut frame = [0u8; 2];

        pulse.next_frame(&mut frame);
        assert_eq!(pulse.row(), 1);

        pulse.reset();
        assert_eq!(pulse.row(), 0);
        assert_eq!(pulse.intensity(), 10);

        pulse.next_frame(&mut frame);
        assert_eq!(lit(&frame), vec![(0, 10)]);
    }
}
