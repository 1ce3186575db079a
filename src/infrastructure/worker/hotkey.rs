//! Hotkey Source - 全局按键触发
//!
//! `rdev::listen` 阻塞调用线程且不会返回，因此运行在独立线程上，
//! 进程退出时随之结束

use rdev::{listen, Event, EventType, Key};
use tokio::sync::mpsc;

use super::ListenerEvent;

/// 解析按键名（大小写不敏感），例如 "BackQuote"、"Escape"、"F9"、"KeyQ"、"q"
pub fn parse_key(name: &str) -> Option<Key> {
    let name = name.trim().to_lowercase();
    let key = match name.as_str() {
        "backquote" | "`" | "grave" => Key::BackQuote,
        "escape" | "esc" => Key::Escape,
        "space" => Key::Space,
        "tab" => Key::Tab,
        "return" | "enter" => Key::Return,
        "pause" => Key::Pause,
        "printscreen" => Key::PrintScreen,
        "scrolllock" => Key::ScrollLock,
        "insert" => Key::Insert,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" => Key::PageUp,
        "pagedown" => Key::PageDown,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        other => {
            let letter = other.strip_prefix("key").unwrap_or(other);
            return letter_key(letter).or_else(|| digit_key(other.strip_prefix("num").unwrap_or(other)));
        }
    };
    Some(key)
}

fn letter_key(s: &str) -> Option<Key> {
    let key = match s {
        "a" => Key::KeyA,
        "b" => Key::KeyB,
        "c" => Key::KeyC,
        "d" => Key::KeyD,
        "e" => Key::KeyE,
        "f" => Key::KeyF,
        "g" => Key::KeyG,
        "h" => Key::KeyH,
        "i" => Key::KeyI,
        "j" => Key::KeyJ,
        "k" => Key::KeyK,
        "l" => Key::KeyL,
        "m" => Key::KeyM,
        "n" => Key::KeyN,
        "o" => Key::KeyO,
        "p" => Key::KeyP,
        "q" => Key::KeyQ,
        "r" => Key::KeyR,
        "s" => Key::KeyS,
        "t" => Key::KeyT,
        "u" => Key::KeyU,
        "v" => Key::KeyV,
        "w" => Key::KeyW,
        "x" => Key::KeyX,
        "y" => Key::KeyY,
        "z" => Key::KeyZ,
        _ => return None,
    };
    Some(key)
}

fn digit_key(s: &str) -> Option<Key> {
    let key = match s {
        "0" => Key::Num0,
        "1" => Key::Num1,
        "2" => Key::Num2,
        "3" => Key::Num3,
        "4" => Key::Num4,
        "5" => Key::Num5,
        "6" => Key::Num6,
        "7" => Key::Num7,
        "8" => Key::Num8,
        "9" => Key::Num9,
        _ => return None,
    };
    Some(key)
}

/// 按键到监听器事件的映射
#[derive(Debug, Clone, Copy)]
pub struct HotkeyBindings {
    pub trigger: Key,
    pub exit: Key,
}

impl HotkeyBindings {
    pub fn event_for(&self, key: Key) -> Option<ListenerEvent> {
        if key == self.exit {
            Some(ListenerEvent::Shutdown)
        } else if key == self.trigger {
            Some(ListenerEvent::Trigger)
        } else {
            None
        }
    }
}

/// 启动全局按键监听线程
pub fn spawn_hotkey_source(
    bindings: HotkeyBindings,
    events: mpsc::Sender<ListenerEvent>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    tracing::info!(
        trigger = ?bindings.trigger,
        exit = ?bindings.exit,
        "Starting hotkey listener"
    );

    std::thread::Builder::new()
        .name("hotkey-listener".to_string())
        .spawn(move || {
            let callback = move |event: Event| {
                let EventType::KeyPress(key) = event.event_type else {
                    return;
                };
                let Some(listener_event) = bindings.event_for(key) else {
                    return;
                };
                match listener_event {
                    // 关闭事件必须送达
                    ListenerEvent::Shutdown => {
                        if events.blocking_send(listener_event).is_err() {
                            tracing::debug!("Listener gone, ignoring exit key");
                        }
                    }
                    ListenerEvent::Trigger => {
                        if let Err(e) = events.try_send(listener_event) {
                            tracing::debug!(error = %e, "Trigger not queued");
                        }
                    }
                }
            };

            if let Err(e) = listen(callback) {
                tracing::error!(error = ?e, "Hotkey listener error");
            }
        })
}
