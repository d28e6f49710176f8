//! Decides, per loudness sample, whether the volume bar or the silence
//! animation owns the pad grid.

use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::{
    animator::{Animator, AnimatorHandle},
    driver::PadGrid,
    mapper::PadMapper,
    topology::PadTopology,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Mapper,
    Animator,
}

pub struct Controller {
    mapper: PadMapper,
    animator: AnimatorHandle,
    grid: PadGrid,
    silence_threshold: f32,
    owner: Option<Owner>,
}

impl Controller {
    pub fn new(
        mapper: PadMapper,
        animator: AnimatorHandle,
        grid: PadGrid,
        silence_threshold: f32,
    ) -> Self {
        Self {
            mapper,
            animator,
            grid,
            silence_threshold,
            owner: None,
        }
    }

    #[cfg(test)]
    pub fn owner(&self) -> Option<Owner> {
        self.owner
    }

    /// Routes one loudness sample. Below the silence threshold the volume
    /// bar is cleared and the animation takes over; otherwise the animation
    /// is stopped (and its pads cleared) before the bar is updated.
    pub fn on_loudness(&mut self, loudness: f32) -> Owner {
        trace!("loudness {loudness:.3}");

        let owner = if loudness < self.silence_threshold {
            {
                let mut grid = self.grid.lock();
                self.mapper.clear(|cmd| grid.send(cmd));
            }
            self.animator.start();
            Owner::Animator
        } else {
            self.animator.stop();
            let mut grid = self.grid.lock();
            self.mapper.update(loudness, |cmd| grid.send(cmd));
            Owner::Mapper
        };

        if self.owner != Some(owner) {
            debug!("pad grid owner is now {owner:?}");
            self.owner = Some(owner);
        }

        owner
    }
}

/// Scoped cleanup for the pad grid. On `finish` (or drop) the animation is
/// stopped, every pad is turned off, and the grid is released so the output
/// thread can drain and close the device.
pub struct Shutdown {
    animator: Option<Animator>,
    grid: Option<PadGrid>,
    topology: Arc<PadTopology>,
}

impl Shutdown {
    pub fn new(animator: Animator, grid: PadGrid, topology: Arc<PadTopology>) -> Self {
        Self {
            animator: Some(animator),
            grid: Some(grid),
            topology,
        }
    }

    pub fn finish(&mut self) {
        if let Some(mut animator) = self.animator.take() {
            animator.shutdown();
        }

        if let Some(grid) = self.grid.take() {
            info!("clearing all pads");
            grid.lock().clear_all(self.topology.notes());
        }
    }
}

impl Drop for Shutdown {
    fn drop(&mut self) {
        self.finish();
    }
}
