//! Interactive replay control: pause and speed shared between the keyboard
//! reader and the scheduler. Two atomic fields with no compound invariant,
//! so no lock.

use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const MIN_SPEED: u64 = 1;
pub const MAX_SPEED: u64 = 10;

#[derive(Debug)]
pub struct Handle {
    pause: AtomicBool,
    speed: AtomicU64,
}

impl Handle {
    pub fn new() -> Self {
        Self { pause: AtomicBool::new(false), speed: AtomicU64::new(MIN_SPEED) }
    }

    pub fn speed(&self) -> u64 {
        self.speed.load(Ordering::Relaxed)
    }

    pub fn speed_up(&self) -> u64 {
        self.speed
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| {
                (s < MAX_SPEED).then_some(s + 1)
            })
            .map(|s| s + 1)
            .unwrap_or(MAX_SPEED)
    }

    pub fn speed_down(&self) -> u64 {
        self.speed
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| {
                (s > MIN_SPEED).then_some(s - 1)
            })
            .map(|s| s - 1)
            .unwrap_or(MIN_SPEED)
    }

    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::Relaxed)
    }

    pub fn pause(&self) {
        self.pause.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.pause.store(false, Ordering::Relaxed);
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

/// Read keys from the terminal on a blocking thread: Space pauses, Enter
/// continues, `u`/`d` change speed, ctrl-c cancels the run.
pub fn attach_keyboard(handle: Arc<Handle>, ctx: CancellationToken) {
    info!("Press `Space` to pause, `Enter` to continue");
    info!("Press `u` to speed up, `d` to speed down");
    std::thread::spawn(move || input_loop(handle, ctx));
}

fn input_loop(handle: Arc<Handle>, ctx: CancellationToken) {
    struct RawGuard;
    impl Drop for RawGuard {
        fn drop(&mut self) {
            let _ = crossterm::terminal::disable_raw_mode();
        }
    }

    if let Err(err) = crossterm::terminal::enable_raw_mode() {
        warn!(error = %err, "cannot enter raw mode; replay keys disabled");
        return;
    }
    let _guard = RawGuard;

    while !ctx.is_cancelled() {
        match crossterm::event::poll(Duration::from_millis(200)) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(err) => {
                warn!(error = %err, "keyboard poll failed; replay keys disabled");
                return;
            }
        }
        let event = match crossterm::event::read() {
            Ok(ev) => ev,
            Err(err) => {
                warn!(error = %err, "keyboard read failed; replay keys disabled");
                return;
            }
        };
        let Event::Key(key) = event else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                ctx.cancel();
                return;
            }
            KeyCode::Char(' ') => {
                if handle.is_paused() {
                    info!("Already paused, press `Enter` to continue");
                } else {
                    handle.pause();
                    info!("Paused, press `Enter` to continue");
                }
            }
            KeyCode::Enter => {
                if handle.is_paused() {
                    handle.resume();
                    info!("Continuing, press `Space` to pause");
                } else {
                    info!("Already running, press `Space` to pause");
                }
            }
            KeyCode::Char('u') | KeyCode::Char('U') => {
                info!(rate = handle.speed_up(), "speed up");
            }
            KeyCode::Char('d') | KeyCode::Char('D') => {
                info!(rate = handle.speed_down(), "speed down");
            }
            _ => {}
        }
    }
}
