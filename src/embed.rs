use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, Event, EventTarget, HtmlCanvasElement, ResizeObserver, WheelEvent, Window};

use crate::config::EmbedConfig;
use crate::error::EmbedError;
use crate::lifecycle::{Lifecycle, LoadPhase, LoadStatus};
use crate::loader::{InjectedScript, RuntimeLoader};
use crate::runtime::{RuntimeInstance, create_instance};
use crate::schedule::{ScheduledTask, Scheduler};
use crate::sizing::{CanvasSize, device_pixel_ratio, layout_size, resync};
use crate::status::{clear_status, reflect_status};

pub type StatusCallback = Rc<dyn Fn(&LoadStatus)>;

struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn attach(
        target: &EventTarget,
        kind: &'static str,
        callback: Closure<dyn FnMut(Event)>,
    ) -> Result<Self, EmbedError> {
        target
            .add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())
            .map_err(|err| EmbedError::dom(&err))?;
        Ok(Self {
            target: target.clone(),
            kind,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref());
    }
}

struct LayoutObserver {
    observer: ResizeObserver,
    _callback: Closure<dyn FnMut(JsValue)>,
}

impl Drop for LayoutObserver {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

struct Mount {
    window: Window,
    canvas: HtmlCanvasElement,
    container: Option<Element>,
    config: EmbedConfig,
    base: String,
    loader: Rc<dyn RuntimeLoader>,
    scheduler: Rc<dyn Scheduler>,
    lifecycle: Lifecycle<RuntimeInstance>,
    scheduled: Option<ScheduledTask>,
    settle: Option<ScheduledTask>,
    script: Option<InjectedScript>,
    listeners: Vec<Listener>,
    observer: Option<LayoutObserver>,
    on_change: Option<StatusCallback>,
    last_size: Option<CanvasSize>,
    disposed: bool,
}

type Shared = Rc<RefCell<Mount>>;

/// Dropping the value (or calling [`RuntimeEmbed::unmount`]) removes every
/// listener, the layout observer and the injected script, and cancels a load
/// that has not started yet. An instance that already exists keeps running.
pub struct RuntimeEmbed {
    inner: Shared,
}

impl RuntimeEmbed {
    pub fn mount(
        window: Window,
        canvas: HtmlCanvasElement,
        config: EmbedConfig,
        base: String,
        loader: Rc<dyn RuntimeLoader>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Result<Self, EmbedError> {
        let container = canvas.parent_element();
        let embed = Self {
            inner: Rc::new(RefCell::new(Mount {
                window,
                canvas,
                container,
                config,
                base,
                loader,
                scheduler,
                lifecycle: Lifecycle::new(),
                scheduled: None,
                settle: None,
                script: None,
                listeners: Vec::new(),
                observer: None,
                on_change: None,
                last_size: None,
                disposed: false,
            })),
        };
        embed.start()?;
        Ok(embed)
    }

    // Only the first call on a mount schedules anything.
    pub fn start(&self) -> Result<(), EmbedError> {
        let (scheduler, timeout_ms) = {
            let mut st = self.inner.borrow_mut();
            if st.disposed || !st.lifecycle.schedule() {
                return Ok(());
            }

            let wheel = wheel_listener(&st.window, &st.canvas)?;
            st.listeners.push(wheel);
            (Rc::clone(&st.scheduler), st.config.idle_timeout_ms)
        };
        publish(&self.inner);

        let weak = Rc::downgrade(&self.inner);
        let handle = scheduler.schedule_idle(Box::new(move || run_load(&weak)), timeout_ms);
        match handle {
            Ok(handle) => {
                debug!("runtime load scheduled");
                self.inner.borrow_mut().scheduled = Some(handle);
            }
            Err(err) => fail(&self.inner, err),
        }
        Ok(())
    }

    pub fn status(&self) -> LoadStatus {
        self.inner.borrow().lifecycle.status()
    }

    pub fn phase(&self) -> LoadPhase {
        self.inner.borrow().lifecycle.phase()
    }

    pub fn instance(&self) -> Option<RuntimeInstance> {
        self.inner.borrow().lifecycle.instance().cloned()
    }

    pub fn last_size(&self) -> Option<CanvasSize> {
        self.inner.borrow().last_size
    }

    pub fn on_change(&self, callback: StatusCallback) {
        self.inner.borrow_mut().on_change = Some(callback);
    }

    pub fn unmount(self) {
        teardown(&self.inner);
    }
}

impl Drop for RuntimeEmbed {
    fn drop(&mut self) {
        teardown(&self.inner);
    }
}

fn wheel_listener(window: &Window, canvas: &HtmlCanvasElement) -> Result<Listener, EmbedError> {
    let window = window.clone();
    // The runtime canvas swallows wheel gestures; hand them back to the page.
    let on_wheel = Closure::wrap(Box::new(move |event: Event| {
        if let Some(wheel) = event.dyn_ref::<WheelEvent>() {
            window.scroll_by_with_x_and_y(0.0, wheel.delta_y());
        }
    }) as Box<dyn FnMut(Event)>);
    Listener::attach(canvas, "wheel", on_wheel)
}

fn run_load(weak: &Weak<RefCell<Mount>>) {
    let Some(inner) = weak.upgrade() else {
        return;
    };

    let (loader, url) = {
        let mut st = inner.borrow_mut();
        if st.disposed || !st.lifecycle.begin_script() {
            return;
        }
        let url = st.config.loader_url(&st.base);
        (Rc::clone(&st.loader), url)
    };
    publish(&inner);

    info!("injecting runtime loader {}", url);
    let weak_settled = weak.clone();
    let injected = loader.inject(
        &url,
        Box::new(move |result| on_script_settled(&weak_settled, result)),
    );

    match injected {
        Ok(script) => {
            let mut st = inner.borrow_mut();
            if !st.disposed {
                st.script = Some(script);
            }
            // A disposed mount drops `script` here, which detaches it.
        }
        Err(err) => fail(&inner, err),
    }
}

fn on_script_settled(weak: &Weak<RefCell<Mount>>, result: Result<(), EmbedError>) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    if inner.borrow().disposed {
        return;
    }

    if let Err(err) = result {
        fail(&inner, err);
        return;
    }

    let loader = Rc::clone(&inner.borrow().loader);
    let Some(factory) = loader.factory() else {
        fail(&inner, EmbedError::MissingFactory);
        return;
    };

    let (canvas, config, base) = {
        let mut st = inner.borrow_mut();
        if !st.lifecycle.begin_construct() {
            return;
        }
        (st.canvas.clone(), st.config.clone(), st.base.clone())
    };
    publish(&inner);

    let weak = weak.clone();
    spawn_local(async move {
        let result = create_instance(&factory, &canvas, &config, &base).await;
        on_instance(&weak, result);
    });
}

fn on_instance(weak: &Weak<RefCell<Mount>>, result: Result<RuntimeInstance, EmbedError>) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    if inner.borrow().disposed {
        return;
    }

    let instance = match result {
        Ok(instance) => instance,
        Err(err) => {
            fail(&inner, err);
            return;
        }
    };

    if !inner.borrow_mut().lifecycle.ready(instance) {
        return;
    }
    info!("runtime ready");
    publish(&inner);

    if let Err(err) = install_resize_handlers(&inner) {
        warn!("resize tracking unavailable: {}", err);
    }

    let (scheduler, delay_ms) = {
        let st = inner.borrow();
        (Rc::clone(&st.scheduler), st.config.settle_delay_ms)
    };
    let weak_settle = Rc::downgrade(&inner);
    match scheduler.schedule_after(delay_ms, Box::new(move || resync_now(&weak_settle))) {
        Ok(handle) => inner.borrow_mut().settle = Some(handle),
        Err(err) => warn!("settle resync not scheduled: {}", err),
    }
}

fn install_resize_handlers(inner: &Shared) -> Result<(), EmbedError> {
    let (window, container) = {
        let st = inner.borrow();
        (st.window.clone(), st.container.clone())
    };

    let mut listeners = Vec::with_capacity(2);
    for kind in ["resize", "orientationchange"] {
        let weak = Rc::downgrade(inner);
        let handler = Closure::wrap(Box::new(move |_event: Event| {
            resync_now(&weak);
        }) as Box<dyn FnMut(Event)>);
        listeners.push(Listener::attach(&window, kind, handler)?);
    }

    let observer = match container {
        Some(container) => {
            let weak = Rc::downgrade(inner);
            let callback = Closure::wrap(Box::new(move |_entries: JsValue| {
                resync_now(&weak);
            }) as Box<dyn FnMut(JsValue)>);
            let observer = ResizeObserver::new(callback.as_ref().unchecked_ref())
                .map_err(|err| EmbedError::dom(&err))?;
            observer.observe(&container);
            Some(LayoutObserver {
                observer,
                _callback: callback,
            })
        }
        None => None,
    };

    let mut st = inner.borrow_mut();
    st.listeners.extend(listeners);
    st.observer = observer;
    Ok(())
}

fn resync_now(weak: &Weak<RefCell<Mount>>) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let (canvas, container, instance, max_ratio) = {
        let st = inner.borrow();
        if st.disposed {
            return;
        }
        let Some(instance) = st.lifecycle.instance().cloned() else {
            return;
        };
        (
            st.canvas.clone(),
            st.container.clone(),
            instance,
            st.config.max_pixel_ratio,
        )
    };

    // SendMessage may dispatch resize synchronously, so no borrow is held here.
    let layout = match &container {
        Some(container) => layout_size(container),
        None => layout_size(&canvas),
    };
    let size = resync(
        layout,
        device_pixel_ratio(),
        max_ratio,
        &canvas,
        Some(&instance),
    );

    let mut st = inner.borrow_mut();
    if !st.disposed {
        st.last_size = Some(size);
    }
}

fn fail(inner: &Shared, err: EmbedError) {
    let message = err.to_string();
    if !inner.borrow_mut().lifecycle.fail(err) {
        return;
    }
    error!("runtime load failed: {}", message);
    publish(inner);
}

fn publish(inner: &Shared) {
    let (status, callback) = {
        let st = inner.borrow();
        if st.disposed {
            return;
        }
        let status = st.lifecycle.status();
        reflect_status(st.container.as_ref(), &st.canvas, &status);
        (status, st.on_change.clone())
    };
    debug!("runtime phase {}", inner.borrow().lifecycle.phase().name());

    if let Some(callback) = callback {
        callback(&status);
    }
}

fn teardown(inner: &Shared) {
    let (scheduled, settle, script, listeners, observer, instance, canvas, container) = {
        let mut st = inner.borrow_mut();
        if st.disposed {
            return;
        }
        st.disposed = true;
        st.on_change = None;
        (
            st.scheduled.take(),
            st.settle.take(),
            st.script.take(),
            std::mem::take(&mut st.listeners),
            st.observer.take(),
            st.lifecycle.reset(),
            st.canvas.clone(),
            st.container.clone(),
        )
    };

    if let Some(task) = scheduled {
        task.cancel();
    }
    if let Some(task) = settle {
        task.cancel();
    }
    drop(listeners);
    drop(observer);
    if let Some(script) = script {
        script.remove();
    }
    clear_status(container.as_ref(), &canvas);

    if instance.is_some() {
        // No quit hook is called; the runtime keeps its canvas until the page goes away.
        warn!("runtime instance left running after unmount");
    }
    debug!("runtime embed unmounted");
}
