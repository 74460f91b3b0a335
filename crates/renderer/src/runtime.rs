use std::time::Instant;

/// Snapshot of the time state supplied to the shader uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or frozen time in seconds.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.origin.elapsed().as_secs_f32(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports the same timestamp. Frames still count.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f32,
    frame: u64,
}

impl FixedTimeSource {
    pub fn new(time: f32) -> Self {
        Self { time, frame: 0 }
    }

    pub fn time(&self) -> f32 {
        self.time
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.time, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Builds the clock's time source: frozen when a timestamp is given,
/// wall-clock otherwise.
pub fn time_source(freeze_time: Option<f32>) -> BoxedTimeSource {
    match freeze_time {
        Some(time) => Box::new(FixedTimeSource::new(time)),
        None => Box::new(SystemTimeSource::new()),
    }
}

/// Seconds since the sandbox started, sampled once per frame.
pub struct FrameClock {
    source: BoxedTimeSource,
    last: TimeSample,
}

impl FrameClock {
    pub fn new(source: BoxedTimeSource) -> Self {
        Self {
            source,
            last: TimeSample::new(0.0, 0),
        }
    }

    /// Restarts the clock at zero. Called once when rendering begins.
    pub fn restart(&mut self) {
        self.source.reset();
        self.last = TimeSample::new(0.0, 0);
    }

    /// Advances to the next frame and returns its timestamp in seconds.
    pub fn elapsed_seconds(&mut self) -> f32 {
        self.last = self.source.sample();
        self.last.seconds
    }

    /// Sample produced by the most recent call to [`FrameClock::elapsed_seconds`].
    pub fn last_sample(&self) -> TimeSample {
        self.last
    }
}

impl std::fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameClock")
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

/// Last pointer position in viewport coordinates with a bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerTracker {
    viewport_height: f32,
    position: [f32; 2],
}

impl PointerTracker {
    pub fn new(viewport_height: u32) -> Self {
        Self {
            viewport_height: viewport_height as f32,
            position: [0.0, 0.0],
        }
    }

    /// Records a window-space position (top-left origin).
    pub fn record_pointer(&mut self, x: f64, y: f64) {
        self.position = [x as f32, self.viewport_height - y as f32];
    }

    pub fn position(&self) -> [f32; 2] {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_source_repeats_timestamp_and_counts_frames() {
        let mut source = FixedTimeSource::new(2.5);
        let first = source.sample();
        let second = source.sample();
        assert_eq!(first.seconds, 2.5);
        assert_eq!(second.seconds, 2.5);
        assert_eq!(second.frame_index, first.frame_index + 1);
        source.reset();
        assert_eq!(source.sample().frame_index, 0);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let mut clock = FrameClock::new(time_source(None));
        clock.restart();
        let first = clock.elapsed_seconds();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = clock.elapsed_seconds();
        assert!(first >= 0.0);
        assert!(second > first);
        assert_eq!(clock.last_sample().frame_index, 1);
    }

    #[test]
    fn frozen_clock_reports_requested_time() {
        let mut clock = FrameClock::new(time_source(Some(1.25)));
        assert_eq!(clock.elapsed_seconds(), 1.25);
        assert_eq!(clock.elapsed_seconds(), 1.25);
    }

    #[test]
    fn pointer_flips_vertical_axis() {
        let mut pointer = PointerTracker::new(600);
        assert_eq!(pointer.position(), [0.0, 0.0]);
        pointer.record_pointer(100.0, 50.0);
        assert_eq!(pointer.position(), [100.0, 550.0]);
        pointer.record_pointer(0.0, 600.0);
        assert_eq!(pointer.position(), [0.0, 0.0]);
    }
}
