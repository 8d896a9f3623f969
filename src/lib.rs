#![cfg(target_arch = "wasm32")]
//! Browser entry point: mounts a halo effect on a canvas using WebGPU.

use halo_core::MountHandle;
use wasm_bindgen::prelude::*;
use web_sys as web;

mod dom;
mod events;
mod frame;
mod render;

use events::ListenerSet;
use frame::FrameLoop;
use render::GpuState;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("halo-web starting");
    Ok(())
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}

/// A mounted effect. Call `unmount` (or `free`) to release it.
#[wasm_bindgen]
pub struct FxHandle {
    canvas: web::HtmlCanvasElement,
    handle: MountHandle<GpuState>,
    frame: Option<FrameLoop>,
    listeners: Option<ListenerSet>,
}

/// Mount an effect on `canvas`. `config` is a plain object:
/// `{ effectVariant, enablePointerTracking, enableScrollTracking, opacity, layerOrder, seed }`.
/// Configuration errors reject before any GPU work starts.
#[wasm_bindgen(js_name = mountEffect)]
pub async fn mount_effect(canvas: web::HtmlCanvasElement, config: JsValue) -> Result<FxHandle, JsValue> {
    let config = dom::parse_config(&config).map_err(to_js)?;
    let viewport = dom::canvas_viewport(&canvas).map_err(to_js)?;
    dom::sync_canvas_backing_size(&canvas, viewport);

    let gpu = GpuState::new(&canvas).await.map_err(|e| {
        log::error!("[mount] WebGPU init failed: {:?}", e);
        to_js(e)
    })?;
    let handle = MountHandle::mount(gpu, &config, viewport).map_err(to_js)?;

    let listeners = match events::wire_input_handlers(&canvas, &handle) {
        Ok(l) => l,
        Err(e) => {
            handle.unmount();
            return Err(e);
        }
    };
    let frame = frame::start_loop(handle.clone());
    log::info!("[mount] {} mounted", config.variant);
    Ok(FxHandle {
        canvas,
        handle,
        frame: Some(frame),
        listeners: Some(listeners),
    })
}

#[wasm_bindgen]
impl FxHandle {
    /// Stop the frame loop, detach listeners and release GPU resources.
    /// Safe to call more than once.
    pub fn unmount(&mut self) {
        self.listeners.take();
        if let Some(frame) = self.frame.take() {
            frame.stop();
        }
        if self.handle.is_mounted() {
            self.handle.unmount();
            log::info!("[mount] unmounted");
        }
    }

    #[wasm_bindgen(js_name = isMounted)]
    pub fn is_mounted(&self) -> bool {
        self.handle.is_mounted()
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.frame.as_ref().is_some_and(FrameLoop::is_scheduled)
    }

    /// Explicit resize in CSS pixels, for hosts that observe the container.
    pub fn resize(&self, width: f32, height: f32, pixel_ratio: f32) -> Result<(), JsValue> {
        let viewport = halo_core::Viewport::new(width, height, pixel_ratio).map_err(to_js)?;
        dom::sync_canvas_backing_size(&self.canvas, viewport);
        self.handle.resize(width, height, pixel_ratio).map_err(to_js)
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, x: f32, y: f32) {
        self.handle.pointer_move(x, y);
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&self) {
        self.handle.pointer_down();
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&self) {
        self.handle.pointer_up();
    }

    pub fn wheel(&self, delta_y: f32) {
        self.handle.wheel(delta_y);
    }

    pub fn scroll(&self, scroll_y: f32) {
        self.handle.scroll(scroll_y);
    }

    /// Toggle a post pass (`"bloom"` or `"chromatic"`).
    #[wasm_bindgen(js_name = setPostEnabled)]
    pub fn set_post_enabled(&self, name: &str, enabled: bool) {
        self.handle.set_post_enabled(name, enabled);
    }
}

impl Drop for FxHandle {
    fn drop(&mut self) {
        self.unmount();
    }
}
