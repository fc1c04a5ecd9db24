use js_sys::Object;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Window;

use crate::error::EmbedError;
use crate::js::{js_function, set};

pub type Task = Box<dyn FnOnce()>;

pub trait Scheduler {
    fn schedule_idle(&self, task: Task, timeout_ms: u32) -> Result<ScheduledTask, EmbedError>;

    fn schedule_after(&self, delay_ms: u32, task: Task) -> Result<ScheduledTask, EmbedError>;
}

/// Handle to a pending task. Cancelling (or dropping) the handle guarantees
/// the task will not start afterwards; it is a no-op once the task has run.
pub struct ScheduledTask {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl ScheduledTask {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

pub struct BrowserScheduler {
    window: Window,
    fallback_delay_ms: u32,
}

impl BrowserScheduler {
    pub fn new(window: Window, fallback_delay_ms: u32) -> Self {
        Self {
            window,
            fallback_delay_ms,
        }
    }

    fn timeout(&self, delay_ms: u32, task: Task) -> Result<ScheduledTask, EmbedError> {
        let callback = once_closure(task);
        let id = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                delay_ms as i32,
            )
            .map_err(|err| EmbedError::dom(&err))?;

        let window = self.window.clone();
        Ok(ScheduledTask::new(move || {
            window.clear_timeout_with_handle(id);
            drop(callback);
        }))
    }
}

impl Scheduler for BrowserScheduler {
    fn schedule_idle(&self, task: Task, timeout_ms: u32) -> Result<ScheduledTask, EmbedError> {
        let win: &JsValue = &self.window;
        let Ok(request) = js_function(win, "requestIdleCallback") else {
            return self.timeout(self.fallback_delay_ms, task);
        };

        let callback = once_closure(task);
        let options = Object::new();
        set(&options, "timeout", timeout_ms).map_err(|err| EmbedError::dom(&err))?;
        let id = request
            .call2(win, callback.as_ref(), &options)
            .map_err(|err| EmbedError::dom(&err))?;

        let window = self.window.clone();
        Ok(ScheduledTask::new(move || {
            let win: &JsValue = &window;
            if let Ok(cancel) = js_function(win, "cancelIdleCallback") {
                let _ = cancel.call1(win, &id);
            }
            drop(callback);
        }))
    }

    fn schedule_after(&self, delay_ms: u32, task: Task) -> Result<ScheduledTask, EmbedError> {
        self.timeout(delay_ms, task)
    }
}

fn once_closure(task: Task) -> Closure<dyn FnMut()> {
    let slot = Rc::new(RefCell::new(Some(task)));
    Closure::wrap(Box::new(move || {
        let task = slot.borrow_mut().take();
        if let Some(task) = task {
            task();
        }
    }) as Box<dyn FnMut()>)
}
