//! Runtime system trait

use crate::clock::Clock;
use crate::scene::Scene;
use cinder_core::Result;

/// A system that can be ticked by the game loop
///
/// Systems are updated in registration order, once per frame, all on the
/// same thread.
pub trait RuntimeSystem {
    /// Called once when the system is first registered
    fn initialize(&mut self, scene: &mut dyn Scene) -> Result<()>;

    /// Called once per frame
    fn update(&mut self, clock: &dyn Clock, scene: &mut dyn Scene) -> Result<()>;

    /// Called when the system is being shut down
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    /// Human-readable name for this system
    fn name(&self) -> &str;
}
