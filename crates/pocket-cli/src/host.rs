use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use pocket_hal::display::{Display, FrameBuffer};
use pocket_hal::event::Event;
use pocket_hal::input::Button;

use crate::config::RenderMode;

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Free-running microsecond counter; wraps at 32 bits like the MCU tick.
    pub fn now_us(&self) -> u32 {
        self.start.elapsed().as_micros() as u32
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Framebuffer that dumps changed frames to stdout on `present`.
pub struct TerminalDisplay {
    fb: FrameBuffer,
    render: RenderMode,
    last_frame: String,
}

impl TerminalDisplay {
    pub fn new(width: u32, height: u32, render: RenderMode) -> Self {
        Self { fb: FrameBuffer::new(width, height), render, last_frame: String::new() }
    }

    /// Frame to print, if it differs from the last one printed.
    fn changed_frame(&mut self) -> Option<String> {
        if self.render == RenderMode::None || !self.fb.powered() {
            return None;
        }
        let frame = self.fb.to_ascii();
        if frame == self.last_frame {
            return None;
        }
        self.last_frame = frame.clone();
        Some(frame)
    }
}

impl Display for TerminalDisplay {
    fn width(&self) -> u32 { self.fb.width() }
    fn height(&self) -> u32 { self.fb.height() }
    fn clear(&mut self) { self.fb.clear() }
    fn draw_text(&mut self, x: i32, y: i32, text: &str) { self.fb.draw_text(x, y, text) }
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) { self.fb.draw_line(x0, y0, x1, y1) }
    fn draw_pixel(&mut self, x: i32, y: i32) { self.fb.draw_pixel(x, y) }

    fn present(&mut self) {
        self.fb.present();
        if let Some(frame) = self.changed_frame() {
            let rule = "-".repeat(self.fb.width() as usize);
            println!("{}\n{}{}", rule, frame, rule);
        }
    }

    fn set_contrast(&mut self, level: u8) { self.fb.set_contrast(level) }
    fn set_inverted(&mut self, inverted: bool) { self.fb.set_inverted(inverted) }

    fn power_on(&mut self) {
        self.fb.power_on();
        self.last_frame.clear();
    }

    fn power_off(&mut self) {
        self.fb.power_off();
        if self.render == RenderMode::Ascii {
            println!("[display off]");
        }
    }
}

/// GNSS poll cadence. The interval is passed in on every check, so a power
/// state change applies at once instead of after the old deadline.
#[derive(Debug, Default)]
pub struct PollSchedule {
    last_ms: Option<u64>,
}

impl PollSchedule {
    pub fn due(&self, now_ms: u64, interval_ms: u64) -> bool {
        self.last_ms.map_or(true, |last| now_ms.saturating_sub(last) >= interval_ms)
    }

    pub fn mark(&mut self, now_ms: u64) {
        self.last_ms = Some(now_ms);
    }
}

pub fn parse_button(s: &str) -> Option<Button> {
    match s.trim() {
        "c" | "confirm" => Some(Button::Confirm),
        "m" | "mode" => Some(Button::ModeNext),
        "n" | "nav" | "navigate" => Some(Button::Navigate),
        "p" | "power" => Some(Button::DisplayPowerToggle),
        _ => None,
    }
}

/// One button edge per stdin line.
pub async fn stdin_buttons(tx: mpsc::Sender<Event>, clock: Clock) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => {
                let Some(button) = parse_button(&line) else {
                    warn!("unknown button {:?} (use c, m, n, p)", line.trim());
                    continue;
                };
                if tx.send(Event::Button { button, at_ms: clock.now_ms() }).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!("stdin closed");
                break;
            }
            Err(e) => {
                warn!("stdin read failed: {}", e);
                break;
            }
        }
    }
}

/// Rising edge once a second from the host clock.
pub async fn simulated_pps(tx: mpsc::Sender<Event>, clock: Clock) {
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    loop {
        tick.tick().await;
        if tx.send(Event::PpsEdge { at_us: clock.now_us() }).await.is_err() {
            break;
        }
    }
}
