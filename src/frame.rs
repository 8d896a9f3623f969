use crate::render::GpuState;
use halo_core::{MountHandle, TickOutcome};
use instant::Instant;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

type FrameSlot = RefCell<Option<Closure<dyn FnMut(f64)>>>;

// CPU time for one tick above which we start complaining
const SLOW_TICK: Duration = Duration::from_millis(12);

/// requestAnimationFrame loop driving one mount handle.
///
/// The callback only holds a weak reference to itself, so dropping the loop
/// frees the closure; `stop` also cancels the frame already requested.
pub struct FrameLoop {
    slot: Rc<FrameSlot>,
    pending: Rc<Cell<Option<i32>>>,
}

fn request(slot: &FrameSlot, pending: &Cell<Option<i32>>) {
    let Some(w) = web::window() else {
        return;
    };
    if let Some(cb) = slot.borrow().as_ref() {
        match w.request_animation_frame(cb.as_ref().unchecked_ref()) {
            Ok(id) => pending.set(Some(id)),
            Err(e) => log::error!("[frame] requestAnimationFrame failed: {:?}", e),
        }
    }
}

pub fn start_loop(handle: MountHandle<GpuState>) -> FrameLoop {
    let slot: Rc<FrameSlot> = Rc::new(RefCell::new(None));
    let pending = Rc::new(Cell::new(None));
    let weak: Weak<FrameSlot> = Rc::downgrade(&slot);
    let pending_tick = pending.clone();
    let mut slow_ticks: u32 = 0;
    *slot.borrow_mut() = Some(Closure::wrap(Box::new(move |now_ms: f64| {
        pending_tick.set(None);
        let started = Instant::now();
        let outcome = handle.tick(now_ms);
        let spent = started.elapsed();
        if spent > SLOW_TICK {
            slow_ticks += 1;
            if slow_ticks.is_power_of_two() {
                log::warn!("[frame] slow tick: {:.1} ms ({} so far)", spent.as_secs_f64() * 1000.0, slow_ticks);
            }
        }
        match outcome {
            TickOutcome::Rendered(_) => {
                if let Some(slot) = weak.upgrade() {
                    request(&slot, &pending_tick);
                }
            }
            TickOutcome::Stopped => log::info!("[frame] loop stopped"),
            TickOutcome::Failed(e) => log::error!("[frame] loop halted: {}", e),
        }
    }) as Box<dyn FnMut(f64)>));
    request(&slot, &pending);
    FrameLoop { slot, pending }
}

impl FrameLoop {
    pub fn stop(&self) {
        if let (Some(id), Some(w)) = (self.pending.take(), web::window()) {
            _ = w.cancel_animation_frame(id);
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending.get().is_some() && self.slot.borrow().is_some()
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.stop();
        self.slot.borrow_mut().take();
    }
}
