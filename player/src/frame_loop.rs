use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use playback::{Driver, MapView};

/// Stands in for the display's refresh callback: ticks the driver at a fixed interval until it's
/// cancelled or stops on its own.
pub struct FrameLoop {
    interval: Duration,
    cancel: Arc<AtomicBool>,
    pub max_frames: Option<usize>,
    pub max_loops: Option<usize>,
}

impl FrameLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            cancel: Arc::new(AtomicBool::new(false)),
            max_frames: None,
            max_loops: None,
        }
    }

    /// Setting this stops the loop before its next frame
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Returns how many frames were delivered. The driver is always torn down afterwards.
    pub fn run<M: MapView>(&self, driver: &mut Driver<M>) -> usize {
        let clock = Instant::now();
        let mut frames = 0;
        driver.start();

        while driver.is_playing() && !self.cancel.load(Ordering::Relaxed) {
            if self.max_frames.map(|max| frames >= max).unwrap_or(false) {
                break;
            }
            if self
                .max_loops
                .map(|max| driver.loops_completed() >= max)
                .unwrap_or(false)
            {
                break;
            }

            let now = clock.elapsed().as_secs_f64() * 1000.0;
            driver.tick(now);
            frames += 1;

            let wait = match driver.next_timer() {
                // Nothing to draw until the photo is done
                Some(resume_at) => Duration::from_secs_f64((resume_at - now).max(0.0) / 1000.0),
                None => self.interval,
            };
            std::thread::sleep(wait);
        }

        driver.teardown();
        frames
    }
}
