//! Mount handle: the host-facing lifecycle around one scene.
//!
//! Event forwarding only writes into the input tracker; GPU-bound state is
//! touched exclusively inside [`MountHandle::tick`]. Unmount is idempotent
//! and safe to call from inside a frame callback: the release is deferred
//! until the tick that is running has finished, and no later tick runs.

use crate::backend::GpuBackend;
use crate::composer::{EffectConfig, Scene, Viewport};
use crate::driver::{AnimationDriver, TickReport};
use crate::error::{FxError, FxResult};
use crate::input::{InputState, InputTracker};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Outcome of one call to [`MountHandle::tick`].
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    Rendered(TickReport),
    /// The handle is unmounted; the host should stop scheduling frames.
    Stopped,
    /// The frame failed and the scene tore itself down.
    Failed(FxError),
}

type FrameHook<B> = Box<dyn FnMut(&MountHandle<B>, &TickReport)>;

struct Mounted<B: GpuBackend> {
    backend: B,
    scene: Scene,
    tracker: InputTracker,
    driver: AnimationDriver,
}

impl<B: GpuBackend> Mounted<B> {
    fn release(mut self) {
        self.tracker.dispose();
        self.scene.unmount(&mut self.backend);
    }
}

struct Shared<B: GpuBackend> {
    state: RefCell<Option<Mounted<B>>>,
    alive: Cell<bool>,
    in_tick: Cell<bool>,
    hook: RefCell<Option<FrameHook<B>>>,
}

impl<B: GpuBackend> Drop for Shared<B> {
    fn drop(&mut self) {
        // last handle gone without an explicit unmount
        if let Some(m) = self.state.get_mut().take() {
            m.release();
        }
    }
}

/// Cloneable handle to a mounted scene.
pub struct MountHandle<B: GpuBackend> {
    shared: Rc<Shared<B>>,
}

impl<B: GpuBackend> Clone for MountHandle<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<B: GpuBackend> MountHandle<B> {
    /// Validate `config`, build every layer on `backend` and start input
    /// tracking. Fails without leaking anything on the backend.
    pub fn mount(mut backend: B, config: &EffectConfig, viewport: Viewport) -> FxResult<Self> {
        config.validate()?;
        let mut generator = config.generator();
        let scene = Scene::mount(config, viewport, &mut generator, &mut backend)?;
        let tracker = InputTracker::init(config.tracker_params(), viewport.width, viewport.height);
        Ok(Self {
            shared: Rc::new(Shared {
                state: RefCell::new(Some(Mounted {
                    backend,
                    scene,
                    tracker,
                    driver: AnimationDriver::new(),
                })),
                alive: Cell::new(true),
                in_tick: Cell::new(false),
                hook: RefCell::new(None),
            }),
        })
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.alive.get()
    }

    /// Install a callback that runs after every rendered frame.
    pub fn set_frame_hook(&self, hook: impl FnMut(&MountHandle<B>, &TickReport) + 'static) {
        *self.shared.hook.borrow_mut() = Some(Box::new(hook));
    }

    /// Advance one display frame at timestamp `now_ms`.
    pub fn tick(&self, now_ms: f64) -> TickOutcome {
        if !self.shared.alive.get() || self.shared.in_tick.get() {
            return TickOutcome::Stopped;
        }
        self.shared.in_tick.set(true);

        let result = match self.shared.state.try_borrow_mut() {
            Ok(mut guard) => guard
                .as_mut()
                .map(|m| m.driver.tick(now_ms, &mut m.tracker, &mut m.scene, &mut m.backend)),
            Err(_) => None,
        };
        let Some(result) = result else {
            self.shared.in_tick.set(false);
            return TickOutcome::Stopped;
        };

        let outcome = match result {
            Ok(report) => {
                self.run_hook(&report);
                TickOutcome::Rendered(report)
            }
            Err(e) => {
                log::error!("[driver] frame failed, tearing down: {}", e);
                self.shared.alive.set(false);
                TickOutcome::Failed(e)
            }
        };

        self.shared.in_tick.set(false);
        if !self.shared.alive.get() {
            self.release_now();
            if matches!(outcome, TickOutcome::Rendered(_)) {
                return TickOutcome::Stopped;
            }
        }
        outcome
    }

    fn run_hook(&self, report: &TickReport) {
        // taken out while it runs so the hook may replace itself or unmount
        let hook = self.shared.hook.borrow_mut().take();
        if let Some(mut hook) = hook {
            hook(self, report);
            let mut slot = self.shared.hook.borrow_mut();
            if slot.is_none() && self.shared.alive.get() {
                *slot = Some(hook);
            }
        }
    }

    /// Stop ticking and release every GPU resource. Repeated calls are no-ops.
    pub fn unmount(&self) {
        if !self.shared.alive.replace(false) {
            return;
        }
        self.shared.hook.borrow_mut().take();
        if self.shared.in_tick.get() {
            log::debug!("[mount] unmount requested mid-frame; deferring release");
            return;
        }
        self.release_now();
    }

    fn release_now(&self) {
        let taken = match self.shared.state.try_borrow_mut() {
            Ok(mut slot) => slot.take(),
            Err(_) => return,
        };
        if let Some(m) = taken {
            m.release();
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut Mounted<B>) -> R) -> Option<R> {
        if !self.shared.alive.get() {
            return None;
        }
        let mut guard = self.shared.state.try_borrow_mut().ok()?;
        guard.as_mut().map(f)
    }

    pub fn resize(&self, width: f32, height: f32, pixel_ratio: f32) -> FxResult<()> {
        let viewport = Viewport::new(width, height, pixel_ratio)?;
        self.with_state(|m| {
            m.tracker.set_viewport(viewport.width, viewport.height);
            m.scene.resize(viewport, &mut m.backend);
        });
        Ok(())
    }

    pub fn pointer_move(&self, client_x: f32, client_y: f32) {
        self.with_state(|m| m.tracker.on_pointer_move(client_x, client_y));
    }

    pub fn pointer_down(&self) {
        self.with_state(|m| m.tracker.on_pointer_down());
    }

    pub fn pointer_up(&self) {
        self.with_state(|m| m.tracker.on_pointer_up());
    }

    pub fn wheel(&self, delta_y: f32) {
        self.with_state(|m| m.tracker.on_wheel(delta_y));
    }

    pub fn scroll(&self, scroll_y: f32) {
        self.with_state(|m| m.tracker.on_scroll(scroll_y));
    }

    /// Latest sampled input, if mounted.
    pub fn input_state(&self) -> Option<InputState> {
        self.with_state(|m| m.tracker.state())
    }

    /// Read-only access to the scene for inspection.
    pub fn inspect<R>(&self, f: impl FnOnce(&Scene) -> R) -> Option<R> {
        self.with_state(|m| f(&m.scene))
    }

    /// Run `f` against the backend (e.g. to toggle renderer options).
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> Option<R> {
        self.with_state(|m| f(&mut m.backend))
    }

    /// Enable or disable a post pass by name.
    pub fn set_post_enabled(&self, name: &str, enabled: bool) {
        self.with_state(|m| m.scene.post_mut().set_enabled(name, enabled));
    }
}
