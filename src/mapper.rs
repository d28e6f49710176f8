use std::sync::Arc;

use tracing::debug;

use crate::{driver::PadCommand, topology::PadTopology};

/// Maps loudness onto a bar of lit pads, emitting only the pads that flip.
pub struct PadMapper {
    topology: Arc<PadTopology>,
    hysteresis: usize,
    last_count: usize,
    lit: Vec<bool>,
}

impl PadMapper {
    pub fn new(topology: Arc<PadTopology>, hysteresis: usize) -> Self {
        let lit = vec![false; topology.len()];

        Self {
            topology,
            hysteresis: hysteresis.max(1),
            last_count: 0,
            lit,
        }
    }

    /// Number of pads that should be lit for `loudness`.
    pub fn target_count(&self, loudness: f32) -> usize {
        let total = self.topology.len();
        ((loudness.clamp(0.0, 1.0) * total as f32).floor() as usize).min(total)
    }

    #[cfg(test)]
    pub fn last_count(&self) -> usize {
        self.last_count
    }

    #[cfg(test)]
    pub fn lit(&self) -> &[bool] {
        &self.lit
    }

    /// Applies a new loudness sample. Returns `false` when the change in
    /// pad count is below the hysteresis step and nothing was emitted.
    pub fn update(&mut self, loudness: f32, mut emit: impl FnMut(PadCommand)) -> bool {
        let target = self.target_count(loudness);

        if target.abs_diff(self.last_count) < self.hysteresis {
            return false;
        }

        debug!("accepting pad count {target} (was {})", self.last_count);
        self.last_count = target;

        for (pad, lit) in self.lit.iter_mut().enumerate() {
            let should_be_on = pad < target;
            if should_be_on == *lit {
                continue;
            }

            let note = self.topology.note(pad);
            emit(if should_be_on {
                PadCommand::on(note, self.topology.color(pad))
            } else {
                PadCommand::off(note)
            });
            *lit = should_be_on;
        }

        true
    }

    /// Turns off every pad this mapper has lit and rewinds to an empty bar.
    pub fn clear(&mut self, mut emit: impl FnMut(PadCommand)) {
        for (pad, lit) in self.lit.iter_mut().enumerate() {
            if *lit {
                emit(PadCommand::off(self.topology.note(pad)));
                *lit = false;
            }
        }
        self.last_count = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::topology::Zone;

    fn topology(pads: u8) -> Arc<PadTopology> {
        let zones = (0..pads)
            .collect::<Vec<_>>()
            .chunks(2)
            .enumerate()
            .map(|(i, pads)| Zone {
                name: format!("zone{}", i + 1),
                color: 40 + i as u8,
                pads: pads.iter().map(|p| 36 + p).collect(),
            })
            .collect();
        Arc::new(PadTopology::new(zones, None, None).unwrap())
    }

    fn run(mapper: &mut PadMapper, loudness: f32) -> Vec<PadCommand> {
        let mut out = vec![];
        mapper.update(loudness, |cmd| out.push(cmd));
        out
    }

    #[test]
    fn lights_bar_with_zone_colors() {
        let mut mapper = PadMapper::new(topology(16), 1);

        let cmds = run(&mut mapper, 0.5);
        assert_eq!(cmds.len(), 8);
        for (pad, cmd) in cmds.iter().enumerate() {
            assert_eq!(*cmd, PadCommand::on(36 + pad as u8, 40 + (pad / 2) as u8));
        }

        let cmds = run(&mut mapper, 0.25);
        assert_eq!(
            cmds,
            (4..8).map(|p| PadCommand::off(36 + p)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn emits_only_changed_pads() {
        let mut mapper = PadMapper::new(topology(16), 1);
        let mut state = vec![false; 16];

        for loudness in [0.1, 0.9, 0.9, 0.45, 1.0, 0.0, 0.33, 0.34, 0.7] {
            for cmd in run(&mut mapper, loudness) {
                let pad = (cmd.note - 36) as usize;
                assert_ne!(state[pad], cmd.lit, "redundant command {cmd:?}");
                state[pad] = cmd.lit;
            }
            assert_eq!(state, mapper.lit());
        }
    }

    #[test]
    fn suppresses_changes_below_hysteresis() {
        let mut mapper = PadMapper::new(topology(16), 3);

        assert_eq!(run(&mut mapper, 0.5).len(), 8);
        // 8 -> 9 and 8 -> 6 are both within two pads of the baseline
        assert!(run(&mut mapper, 0.57).is_empty());
        assert!(run(&mut mapper, 0.40).is_empty());
        assert_eq!(mapper.last_count(), 8);
        assert_eq!(run(&mut mapper, 0.70).len(), 3);
        assert_eq!(mapper.last_count(), 11);
    }

    #[test]
    fn target_count_is_monotonic() {
        let mapper = PadMapper::new(topology(16), 1);
        let mut last = 0;

        for step in 0..=1000 {
            let count = mapper.target_count(step as f32 / 1000.0);
            assert!(count >= last);
            last = count;
        }
        assert_eq!(last, 16);
    }

    #[test]
    fn clear_turns_off_lit_pads_only() {
        let mut mapper = PadMapper::new(topology(16), 1);
        run(&mut mapper, 0.25);

        let mut out = vec![];
        mapper.clear(|cmd| out.push(cmd));
        assert_eq!(out, (0..4).map(|p| PadCommand::off(36 + p)).collect::<Vec<_>>());
        assert_eq!(mapper.last_count(), 0);

        out.clear();
        mapper.clear(|cmd| out.push(cmd));
        assert!(out.is_empty());
    }
}
