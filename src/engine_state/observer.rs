//! # Observer
//!
//! The tracked entity whose position drives chunk streaming.
//!
//! The streamer only ever reads a position. Where it comes from (a camera, a
//! player entity, a scripted path) is up to the surrounding application,
//! which plugs it in through [`ObserverSource`]. A source that has nothing to
//! report yet returns `None` and streaming simply waits.

use cgmath::Point3;

use crate::core::MtResource;

/// Read-only access to the observer's world-space position.
pub trait ObserverSource: Send {
    fn position(&self) -> Option<Point3<f32>>;
}

/// An observer position shared between the engine and whoever moves it.
///
/// Clones share the same position; [`set`](Self::set) on one is seen by all.
#[derive(Debug, Clone, Default)]
pub struct TrackedObserver {
    position: MtResource<Option<Point3<f32>>>,
}

impl TrackedObserver {
    /// An observer that is not in the world yet.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(position: Point3<f32>) -> Self {
        TrackedObserver {
            position: MtResource::new(Some(position)),
        }
    }

    /// Moves the observer, returning where it was.
    pub fn set(&self, position: Point3<f32>) -> Option<Point3<f32>> {
        self.position.replace(Some(position))
    }

    /// Takes the observer out of the world.
    pub fn clear(&self) -> Option<Point3<f32>> {
        self.position.replace(None)
    }
}

impl ObserverSource for TrackedObserver {
    fn position(&self) -> Option<Point3<f32>> {
        *self.position.get()
    }
}

/// An observer that never moves.
impl ObserverSource for Point3<f32> {
    fn position(&self) -> Option<Point3<f32>> {
        Some(*self)
    }
}
