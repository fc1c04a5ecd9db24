use log::debug;
use web_sys::{Element, HtmlCanvasElement};

use crate::error::NotifyError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasSize {
    pub css_width: f64,
    pub css_height: f64,
    pub buffer_width: u32,
    pub buffer_height: u32,
}

impl CanvasSize {
    pub fn compute(width: f64, height: f64, device_pixel_ratio: f64, max_ratio: f64) -> Self {
        let width = clamp_extent(width);
        let height = clamp_extent(height);
        let ratio = effective_ratio(device_pixel_ratio, max_ratio);

        Self {
            css_width: width,
            css_height: height,
            buffer_width: (width * ratio).floor() as u32,
            buffer_height: (height * ratio).floor() as u32,
        }
    }
}

fn clamp_extent(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

pub fn effective_ratio(device_pixel_ratio: f64, max_ratio: f64) -> f64 {
    // NaN fails the comparison; +inf falls through to the cap.
    let ratio = if device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    };
    ratio.min(max_ratio)
}

pub trait Surface {
    fn set_css_size(&self, width: f64, height: f64);
    fn set_buffer_size(&self, width: u32, height: u32);
}

/// Receives the logical size after every resync. Delivery is best-effort.
pub trait ResizeListener {
    fn notify_resize(&self, width: u32, height: u32) -> Result<(), NotifyError>;
}

impl Surface for HtmlCanvasElement {
    fn set_css_size(&self, width: f64, height: f64) {
        let style = self.style();
        let _ = style.set_property("width", &format!("{}px", width));
        let _ = style.set_property("height", &format!("{}px", height));
    }

    fn set_buffer_size(&self, width: u32, height: u32) {
        self.set_width(width);
        self.set_height(height);
    }
}

pub fn layout_size(container: &Element) -> (f64, f64) {
    let rect = container.get_bounding_client_rect();
    (rect.width(), rect.height())
}

pub fn device_pixel_ratio() -> f64 {
    web_sys::window()
        .map(|win| win.device_pixel_ratio())
        .unwrap_or(1.0)
}

pub fn resync<S, L>(
    layout: (f64, f64),
    device_pixel_ratio: f64,
    max_ratio: f64,
    surface: &S,
    listener: Option<&L>,
) -> CanvasSize
where
    S: Surface + ?Sized,
    L: ResizeListener + ?Sized,
{
    let size = CanvasSize::compute(layout.0, layout.1, device_pixel_ratio, max_ratio);
    surface.set_css_size(size.css_width, size.css_height);
    surface.set_buffer_size(size.buffer_width, size.buffer_height);

    if let Some(listener) = listener {
        if let Err(err) = listener.notify_resize(size.css_width as u32, size.css_height as u32) {
            debug!("resize notification skipped: {}", err);
        }
    }

    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct RecordingSurface {
        css: Cell<(f64, f64)>,
        buffer: Cell<(u32, u32)>,
    }

    impl Surface for RecordingSurface {
        fn set_css_size(&self, width: f64, height: f64) {
            self.css.set((width, height));
        }

        fn set_buffer_size(&self, width: u32, height: u32) {
            self.buffer.set((width, height));
        }
    }

    #[derive(Default)]
    struct RecordingListener {
        calls: RefCell<Vec<(u32, u32)>>,
        fail: bool,
    }

    impl ResizeListener for RecordingListener {
        fn notify_resize(&self, width: u32, height: u32) -> Result<(), NotifyError> {
            self.calls.borrow_mut().push((width, height));
            if self.fail {
                Err(NotifyError::Rejected("SendMessage threw".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn buffer_is_scaled_by_capped_ratio() {
        let size = CanvasSize::compute(390.0, 300.0, 3.0, 1.5);
        assert_eq!(size.css_width, 390.0);
        assert_eq!(size.css_height, 300.0);
        assert_eq!(size.buffer_width, 585);
        assert_eq!(size.buffer_height, 450);
    }

    #[test]
    fn ratio_below_cap_is_used_as_is() {
        let size = CanvasSize::compute(1280.0, 700.0, 1.25, 1.5);
        assert_eq!((size.buffer_width, size.buffer_height), (1600, 875));

        let size = CanvasSize::compute(1280.0, 700.0, 1.0, 1.5);
        assert_eq!((size.buffer_width, size.buffer_height), (1280, 700));
    }

    #[test]
    fn fractional_layout_floors_buffer_but_keeps_css() {
        let size = CanvasSize::compute(333.3, 401.7, 2.0, 1.5);
        assert_eq!(size.css_width, 333.3);
        assert_eq!(size.css_height, 401.7);
        assert_eq!(size.buffer_width, 499);
        assert_eq!(size.buffer_height, 602);
    }

    #[test]
    fn degenerate_ratio_falls_back_to_one() {
        assert_eq!(effective_ratio(0.0, 1.5), 1.0);
        assert_eq!(effective_ratio(-2.0, 1.5), 1.0);
        assert_eq!(effective_ratio(f64::NAN, 1.5), 1.0);
    }

    #[test]
    fn unbounded_ratio_is_capped() {
        assert_eq!(effective_ratio(f64::INFINITY, 1.5), 1.5);
        let size = CanvasSize::compute(390.0, 300.0, f64::INFINITY, 1.5);
        assert_eq!((size.buffer_width, size.buffer_height), (585, 450));
        let size = CanvasSize::compute(390.0, 300.0, 1e9, 1.5);
        assert_eq!((size.buffer_width, size.buffer_height), (585, 450));
    }

    #[test]
    fn collapsed_container_yields_empty_buffer() {
        let size = CanvasSize::compute(0.0, -4.0, 2.0, 1.5);
        assert_eq!(size.css_height, 0.0);
        assert_eq!((size.buffer_width, size.buffer_height), (0, 0));
    }

    #[test]
    fn resync_sets_both_sizes_and_notifies() {
        let surface = RecordingSurface::default();
        let listener = RecordingListener::default();

        let size = resync((390.0, 300.0), 3.0, 1.5, &surface, Some(&listener));

        assert_eq!(surface.css.get(), (390.0, 300.0));
        assert_eq!(surface.buffer.get(), (585, 450));
        assert_eq!(size.buffer_width, 585);
        assert_eq!(listener.calls.borrow().as_slice(), &[(390, 300)]);
    }

    #[test]
    fn failing_notification_does_not_block_resize() {
        let surface = RecordingSurface::default();
        let listener = RecordingListener {
            fail: true,
            ..Default::default()
        };

        let size = resync((800.0, 400.0), 2.0, 1.5, &surface, Some(&listener));

        assert_eq!(surface.css.get(), (800.0, 400.0));
        assert_eq!(surface.buffer.get(), (1200, 600));
        assert_eq!(size.css_width, 800.0);
        assert_eq!(listener.calls.borrow().len(), 1);
    }

    #[test]
    fn resync_without_listener_still_sizes() {
        let surface = RecordingSurface::default();
        resync::<_, RecordingListener>((10.0, 20.0), 1.0, 1.5, &surface, None);
        assert_eq!(surface.buffer.get(), (10, 20));
    }
}
