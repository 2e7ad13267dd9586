use crate::GameInstant;

/// Source of local time for everything that samples, schedules or
/// extrapolates.
pub trait Clock: Send + Sync {
    fn now(&self) -> GameInstant;
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> GameInstant {
        (**self).now()
    }
}
