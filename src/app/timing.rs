use std::collections::VecDeque;
use std::time::{Duration, Instant};
use winit::window::Window;

const REPORT_INTERVAL_SECS: f32 = 0.5;
const HISTORY_LEN: usize = 60;

/// Snapshot shown by the stats overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStats {
    pub fps: f32,
    pub frame_ms: f32,
    pub render_ms: f32,
    pub history: Vec<f32>,
}

pub struct FrameTiming {
    last_frame_time: Option<Instant>,
    last_report_time: Instant,
    frame_count: u32,
    pub frame_dt: f32,
    render_ms: f32,
    fps: f32,
    fps_history: VecDeque<f32>,
    base_title: String,
}

impl FrameTiming {
    pub fn new(base_title: String) -> Self {
        Self::starting_at(base_title, Instant::now())
    }

    fn starting_at(base_title: String, now: Instant) -> Self {
        Self {
            last_frame_time: None,
            last_report_time: now,
            frame_count: 0,
            frame_dt: 1.0 / 60.0,
            render_ms: 0.0,
            fps: 0.0,
            fps_history: VecDeque::with_capacity(HISTORY_LEN),
            base_title,
        }
    }

    pub fn set_render_ms(&mut self, render_ms: f32) {
        self.render_ms = render_ms;
    }

    /// Counts one presented frame. Every half second the fps average is
    /// refreshed, pushed onto the history and mirrored into the window title.
    pub fn update(&mut self, window: Option<&Window>, now: Instant) {
        let dt_duration = match self.last_frame_time {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::from_millis(16),
        };
        self.last_frame_time = Some(now);
        self.frame_dt = dt_duration.as_secs_f32().max(0.0);

        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.last_report_time);
        if elapsed.as_secs_f32() >= REPORT_INTERVAL_SECS {
            self.fps = self.frame_count as f32 / elapsed.as_secs_f32();
            if self.fps_history.len() == HISTORY_LEN {
                self.fps_history.pop_front();
            }
            self.fps_history.push_back(self.fps);
            if let Some(window) = window {
                window.set_title(&format!(
                    "{} - {:.1} fps (cadence {:.2} ms, render {:.2} ms)",
                    self.base_title,
                    self.fps,
                    self.frame_dt * 1000.0,
                    self.render_ms
                ));
            }
            self.frame_count = 0;
            self.last_report_time = now;
        }
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            fps: self.fps,
            frame_ms: self.frame_dt * 1000.0,
            render_ms: self.render_ms,
            history: self.fps_history.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_is_reported_after_half_a_second() {
        let start = Instant::now();
        let mut timing = FrameTiming::starting_at("test".to_string(), start);
        for frame in 1..=30 {
            timing.update(None, start + Duration::from_millis(frame * 10));
        }
        // 30 frames over 300 ms: not reported yet.
        assert_eq!(timing.stats().fps, 0.0);
        for frame in 31..=50 {
            timing.update(None, start + Duration::from_millis(frame * 10));
        }
        let stats = timing.stats();
        assert!((stats.fps - 100.0).abs() < 0.5);
        assert!((stats.frame_ms - 10.0).abs() < 0.01);
        assert_eq!(stats.history.len(), 1);
    }

    #[test]
    fn history_is_bounded() {
        let start = Instant::now();
        let mut timing = FrameTiming::starting_at("test".to_string(), start);
        for step in 1..=(HISTORY_LEN as u64 + 10) {
            timing.update(None, start + Duration::from_millis(step * 500));
        }
        assert_eq!(timing.stats().history.len(), HISTORY_LEN);
    }

    #[test]
    fn render_time_is_passed_through() {
        let mut timing = FrameTiming::new("test".to_string());
        timing.set_render_ms(3.5);
        assert_eq!(timing.stats().render_ms, 3.5);
    }
}
