use halo_core::{EffectConfig, FxError, FxResult, PageVariant, Viewport};
use wasm_bindgen::JsValue;
use web_sys as web;

/// CSS size of the canvas and the current device pixel ratio.
pub fn canvas_viewport(canvas: &web::HtmlCanvasElement) -> FxResult<Viewport> {
    let dpr = web::window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0);
    let rect = canvas.get_bounding_client_rect();
    Viewport::new(rect.width() as f32, rect.height() as f32, dpr as f32)
}

pub fn sync_canvas_backing_size(canvas: &web::HtmlCanvasElement, viewport: Viewport) {
    let (w_px, h_px) = viewport.backing_size();
    if canvas.width() != w_px {
        canvas.set_width(w_px);
    }
    if canvas.height() != h_px {
        canvas.set_height(h_px);
    }
}

/// Pointer position relative to the canvas's top-left corner, in CSS px.
#[inline]
pub fn pointer_canvas_css(ev: &web::MouseEvent, canvas: &web::HtmlCanvasElement) -> (f32, f32) {
    let rect = canvas.get_bounding_client_rect();
    (
        ev.client_x() as f32 - rect.left() as f32,
        ev.client_y() as f32 - rect.top() as f32,
    )
}

fn field(obj: &JsValue, key: &str) -> FxResult<Option<JsValue>> {
    let v = js_sys::Reflect::get(obj, &JsValue::from_str(key))
        .map_err(|_| FxError::config(format!("cannot read `{key}`")))?;
    Ok(if v.is_undefined() || v.is_null() { None } else { Some(v) })
}

fn bool_field(obj: &JsValue, key: &str) -> FxResult<Option<bool>> {
    match field(obj, key)? {
        None => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| FxError::config(format!("`{key}` must be a boolean"))),
    }
}

fn number_field(obj: &JsValue, key: &str) -> FxResult<Option<f64>> {
    match field(obj, key)? {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| FxError::config(format!("`{key}` must be a number"))),
    }
}

/// Read the host's config object. Missing keys keep their defaults; values
/// of the wrong type are rejected rather than coerced.
pub fn parse_config(obj: &JsValue) -> FxResult<EffectConfig> {
    if obj.is_undefined() || obj.is_null() {
        return Ok(EffectConfig::default());
    }
    if !obj.is_object() {
        return Err(FxError::config("config must be an object"));
    }
    let variant = match field(obj, "effectVariant")? {
        None => PageVariant::Hero,
        Some(v) => v
            .as_string()
            .ok_or_else(|| FxError::config("`effectVariant` must be a string"))?
            .parse::<PageVariant>()?,
    };
    let mut config = EffectConfig::new(variant);
    if let Some(b) = bool_field(obj, "enablePointerTracking")? {
        config.enable_pointer_tracking = b;
    }
    if let Some(b) = bool_field(obj, "enableScrollTracking")? {
        config.enable_scroll_tracking = b;
    }
    if let Some(o) = number_field(obj, "opacity")? {
        config.opacity = o as f32;
    }
    if let Some(order) = number_field(obj, "layerOrder")? {
        if order.fract() != 0.0 || order.abs() > i32::MAX as f64 {
            return Err(FxError::config(format!("`layerOrder` {order} must be an integer")));
        }
        config.layer_order = order as i32;
    }
    if let Some(seed) = number_field(obj, "seed")? {
        if seed < 0.0 || seed.fract() != 0.0 || !seed.is_finite() {
            return Err(FxError::config(format!("`seed` {seed} must be a non-negative integer")));
        }
        config.seed = Some(seed as u64);
    }
    config.validate()?;
    Ok(config)
}
