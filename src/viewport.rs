//! Container size observation.
//!
//! The host measures the view's container and reports it through
//! [`Viewport::resize`]. Views hold a [`ResizeSubscription`] for as long as
//! they are mounted; dropping the handle releases the subscription on every
//! exit path, including an unmount while a fetch is still in flight.

use tokio::sync::watch;
use tracing::debug;

use crate::layout::Dimensions;

/// Owner of the measured container size.
#[derive(Debug)]
pub struct Viewport {
    size: watch::Sender<Dimensions>,
}

impl Viewport {
    /// Create an unmeasured viewport (zero size until the first resize).
    pub fn new() -> Self {
        Self::with_dimensions(Dimensions::default())
    }

    /// Create a viewport with a known size.
    pub fn with_dimensions(dimensions: Dimensions) -> Self {
        let (size, _) = watch::channel(dimensions);
        Self { size }
    }

    /// Report a new container size.
    ///
    /// Returns whether the size actually changed; subscribers are only
    /// notified when it did. Non-finite values are recorded as 0 (unmeasured)
    /// so that repeated NaN reports compare equal.
    pub fn resize(&self, width: f64, height: f64) -> bool {
        let measured = |v: f64| if v.is_finite() { v } else { 0.0 };
        let next = Dimensions::new(measured(width), measured(height));
        self.size.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }

    /// Current size.
    pub fn dimensions(&self) -> Dimensions {
        *self.size.borrow()
    }

    /// Start observing resizes.
    pub fn observe(&self) -> ResizeSubscription {
        debug!(observers = self.observer_count() + 1, "resize subscription acquired");
        ResizeSubscription {
            size: self.size.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn observer_count(&self) -> usize {
        self.size.receiver_count()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped resize observation. Released on drop.
#[derive(Debug)]
pub struct ResizeSubscription {
    size: watch::Receiver<Dimensions>,
}

impl ResizeSubscription {
    /// Size as of the last observation.
    pub fn current(&self) -> Dimensions {
        *self.size.borrow()
    }

    /// Take a pending resize, if one happened since the last call.
    pub fn poll_resize(&mut self) -> Option<Dimensions> {
        match self.size.has_changed() {
            Ok(true) => Some(*self.size.borrow_and_update()),
            _ => None,
        }
    }

    /// Wait for the next resize. `None` once the viewport is gone.
    pub async fn changed(&mut self) -> Option<Dimensions> {
        self.size.changed().await.ok()?;
        Some(*self.size.borrow_and_update())
    }
}

impl Drop for ResizeSubscription {
    fn drop(&mut self) {
        debug!("resize subscription released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_released_on_drop() {
        let viewport = Viewport::new();
        let first = viewport.observe();
        let second = viewport.observe();
        assert_eq!(viewport.observer_count(), 2);

        drop(first);
        assert_eq!(viewport.observer_count(), 1);
        drop(second);
        assert_eq!(viewport.observer_count(), 0);
    }

    #[test]
    fn test_only_real_changes_notify() {
        let viewport = Viewport::with_dimensions(Dimensions::new(800.0, 600.0));
        let mut sub = viewport.observe();

        assert!(!viewport.resize(800.0, 600.0));
        assert_eq!(sub.poll_resize(), None);

        assert!(viewport.resize(1024.0, 768.0));
        assert_eq!(sub.poll_resize(), Some(Dimensions::new(1024.0, 768.0)));
        assert_eq!(sub.poll_resize(), None);
    }

    #[test]
    fn test_non_finite_sizes_are_unmeasured() {
        let viewport = Viewport::with_dimensions(Dimensions::new(800.0, 600.0));
        let mut sub = viewport.observe();

        assert!(viewport.resize(f64::NAN, 600.0));
        assert_eq!(sub.poll_resize(), Some(Dimensions::new(0.0, 600.0)));

        // Repeating the same unmeasurable size is not a change
        assert!(!viewport.resize(f64::NAN, 600.0));
        assert!(!viewport.resize(f64::INFINITY, 600.0));
        assert_eq!(sub.poll_resize(), None);
    }

    #[tokio::test]
    async fn test_changed_ends_with_viewport() {
        let viewport = Viewport::new();
        let mut sub = viewport.observe();
        viewport.resize(500.0, 500.0);
        assert_eq!(sub.changed().await, Some(Dimensions::new(500.0, 500.0)));

        drop(viewport);
        assert_eq!(sub.changed().await, None);
    }
}
