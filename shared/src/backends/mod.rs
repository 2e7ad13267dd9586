mod clock;
mod manual_clock;
mod native;
mod timer;

pub use clock::Clock;
pub use manual_clock::ManualClock;
pub use native::SystemClock;
pub use timer::Timer;

cfg_if! {
    if #[cfg(feature = "tokio_clock")] {
        mod tokio_clock;
        pub use tokio_clock::TokioClock;
    }
}
