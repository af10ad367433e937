//! Linux 摇杆设备读取（`/dev/input/jsN`）
//!
//! 内核的 joystick 接口以 8 字节事件流的形式输出：
//!
//! ```text
//! | time: u32 | value: i16 | type: u8 | number: u8 |
//! ```
//!
//! 后台线程持续读取事件，把最新的轴/按键状态通过 `ArcSwap` 发布；
//! 调用方随时 `state()` 拿到一份无锁快照。

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

pub const JS_EVENT_BUTTON: u8 = 0x01;
pub const JS_EVENT_AXIS: u8 = 0x02;
/// 打开设备时内核补发的初始状态事件
pub const JS_EVENT_INIT: u8 = 0x80;

const JS_EVENT_SIZE: usize = 8;

/// 轴的满量程
pub const AXIS_FULL_SCALE: f32 = 32767.0;

/// 单个内核事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsEvent {
    pub time_ms: u32,
    pub value: i16,
    pub kind: u8,
    pub number: u8,
}

impl JsEvent {
    pub fn parse(buf: &[u8; JS_EVENT_SIZE]) -> Self {
        Self {
            time_ms: u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]),
            value: i16::from_ne_bytes([buf[4], buf[5]]),
            kind: buf[6],
            number: buf[7],
        }
    }

    fn base_kind(&self) -> u8 {
        self.kind & !JS_EVENT_INIT
    }
}

/// 手柄状态快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoystickState {
    /// 原始轴值
    pub axes: Vec<i16>,
    /// 按键位图（最多 32 个）
    pub buttons: u32,
}

impl JoystickState {
    fn apply(&mut self, event: JsEvent) {
        let index = usize::from(event.number);
        match event.base_kind() {
            JS_EVENT_AXIS => {
                if self.axes.len() <= index {
                    self.axes.resize(index + 1, 0);
                }
                self.axes[index] = event.value;
            },
            JS_EVENT_BUTTON if index < 32 => {
                if event.value != 0 {
                    self.buttons |= 1 << index;
                } else {
                    self.buttons &= !(1 << index);
                }
            },
            _ => {},
        }
    }

    /// 归一化后的轴值（约 `[-1, 1]`），不存在的轴为 0
    pub fn axis(&self, index: usize) -> f32 {
        self.axes
            .get(index)
            .map_or(0.0, |&raw| f32::from(raw) / AXIS_FULL_SCALE)
    }
}

/// 打开的手柄设备
pub struct Joystick {
    path: String,
    state: Arc<ArcSwap<JoystickState>>,
    alive: Arc<AtomicBool>,
}

impl Joystick {
    /// 打开 `/dev/input/js<id>` 并启动读取线程
    #[cfg(target_os = "linux")]
    pub fn open(id: u32) -> Result<Self> {
        let path = format!("/dev/input/js{}", id);
        let file =
            std::fs::File::open(&path).with_context(|| format!("failed to open {}", path))?;
        Self::spawn(path, file)
    }

    #[cfg(not(target_os = "linux"))]
    pub fn open(id: u32) -> Result<Self> {
        anyhow::bail!("joystick js{} unavailable: /dev/input is Linux-only", id)
    }

    /// 从任意字节流读取事件（读取线程在流结束或出错时退出）
    pub fn spawn<R: Read + Send + 'static>(path: String, reader: R) -> Result<Self> {
        let state = Arc::new(ArcSwap::from_pointee(JoystickState::default()));
        let alive = Arc::new(AtomicBool::new(true));

        let name = path.clone();
        let thread_state = state.clone();
        let thread_alive = alive.clone();
        // 阻塞读取无法中断，线程随进程退出
        std::thread::Builder::new()
            .name("joystick-reader".to_string())
            .spawn(move || read_events(reader, &name, &thread_state, &thread_alive))
            .context("failed to spawn joystick reader")?;

        Ok(Self { path, state, alive })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> Arc<JoystickState> {
        self.state.load_full()
    }

    /// 读取线程是否仍在运行
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

fn read_events<R: Read>(
    mut reader: R,
    path: &str,
    state: &ArcSwap<JoystickState>,
    alive: &AtomicBool,
) {
    let mut buf = [0u8; JS_EVENT_SIZE];
    loop {
        match reader.read_exact(&mut buf) {
            Ok(()) => {
                let event = JsEvent::parse(&buf);
                debug!("{}: {:?}", path, event);
                let mut next = JoystickState::clone(&state.load());
                next.apply(event);
                state.store(Arc::new(next));
            },
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                warn!("{}: device closed", path);
                break;
            },
            Err(e) => {
                warn!("{}: read error: {}", path, e);
                break;
            },
        }
    }
    alive.store(false, Ordering::Release);
}
