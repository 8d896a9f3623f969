use crate::dom;
use crate::render::GpuState;
use halo_core::MountHandle;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys as web;

struct Listener {
    target: web::EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(web::Event)>,
}

/// DOM listeners feeding one mounted scene. Dropping the set detaches them.
#[derive(Default)]
pub struct ListenerSet {
    listeners: Vec<Listener>,
}

impl ListenerSet {
    fn add(
        &mut self,
        target: &web::EventTarget,
        kind: &'static str,
        handler: impl FnMut(web::Event) + 'static,
    ) -> Result<(), JsValue> {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web::Event)>);
        target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
        self.listeners.push(Listener {
            target: target.clone(),
            kind,
            closure,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn detach(&mut self) {
        for l in self.listeners.drain(..) {
            _ = l
                .target
                .remove_event_listener_with_callback(l.kind, l.closure.as_ref().unchecked_ref());
        }
    }
}

impl Drop for ListenerSet {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Pointer moves and scroll come from the window so the effect follows the
/// cursor across overlaid page content; wheel and presses stay on the canvas.
pub fn wire_input_handlers(
    canvas: &web::HtmlCanvasElement,
    handle: &MountHandle<GpuState>,
) -> Result<ListenerSet, JsValue> {
    let window = web::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let mut set = ListenerSet::default();

    {
        let h = handle.clone();
        let canvas = canvas.clone();
        set.add(&window, "pointermove", move |ev: web::Event| {
            if let Some(ev) = ev.dyn_ref::<web::MouseEvent>() {
                let (x, y) = dom::pointer_canvas_css(ev, &canvas);
                h.pointer_move(x, y);
            }
        })?;
    }
    {
        let h = handle.clone();
        let win = window.clone();
        set.add(&window, "scroll", move |_ev: web::Event| {
            if let Ok(y) = win.scroll_y() {
                h.scroll(y as f32);
            }
        })?;
    }
    {
        let h = handle.clone();
        let canvas = canvas.clone();
        set.add(&window, "resize", move |_ev: web::Event| {
            match dom::canvas_viewport(&canvas) {
                Ok(viewport) => {
                    dom::sync_canvas_backing_size(&canvas, viewport);
                    _ = h.resize(viewport.width, viewport.height, viewport.pixel_ratio);
                }
                Err(e) => log::warn!("[events] resize ignored: {}", e),
            }
        })?;
    }
    {
        let h = handle.clone();
        set.add(canvas, "wheel", move |ev: web::Event| {
            if let Some(ev) = ev.dyn_ref::<web::WheelEvent>() {
                h.wheel(ev.delta_y() as f32);
            }
        })?;
    }
    {
        let h = handle.clone();
        set.add(canvas, "pointerdown", move |_ev: web::Event| h.pointer_down())?;
    }
    {
        let h = handle.clone();
        set.add(&window, "pointerup", move |_ev: web::Event| h.pointer_up())?;
    }
    log::debug!("[events] {} listeners attached", set.len());
    Ok(set)
}
