// Recording stand-in for the wgpu backend so scene lifecycles can be checked
// on the host.

#![allow(dead_code)]

use halo_core::{
    AttributeSet, FramePlan, FxError, FxResult, GeometryHandle, GpuBackend, ProgramDesc, ProgramHandle,
    Semantic,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct GpuLog {
    pub programs_created: usize,
    pub programs_released: usize,
    pub geometries_created: usize,
    pub geometries_released: usize,
    pub live_programs: HashSet<u32>,
    pub live_geometries: HashSet<u32>,
    pub uniform_writes: usize,
    pub attribute_writes: usize,
    pub resizes: Vec<(u32, u32)>,
    pub renders: usize,
    pub last_plan: Option<FramePlan>,
    pub program_labels: Vec<String>,
    /// Fail the n-th (0-based) `create_geometry` call.
    pub fail_geometry_at: Option<usize>,
    /// Fail the n-th (0-based) `create_program` call.
    pub fail_program_at: Option<usize>,
    pub fail_render: bool,
}

impl GpuLog {
    pub fn live(&self) -> usize {
        self.live_programs.len() + self.live_geometries.len()
    }
}

pub struct FakeGpu {
    pub log: Rc<RefCell<GpuLog>>,
    next_id: u32,
}

impl FakeGpu {
    pub fn new() -> (Self, Rc<RefCell<GpuLog>>) {
        let log = Rc::new(RefCell::new(GpuLog::default()));
        (
            Self {
                log: log.clone(),
                next_id: 0,
            },
            log,
        )
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GpuBackend for FakeGpu {
    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> FxResult<ProgramHandle> {
        let attempt = self.log.borrow().programs_created;
        if self.log.borrow().fail_program_at == Some(attempt) {
            self.log.borrow_mut().programs_created += 1;
            return Err(FxError::allocation(desc.label, "injected failure"));
        }
        let id = self.next();
        let mut log = self.log.borrow_mut();
        log.programs_created += 1;
        log.live_programs.insert(id);
        log.program_labels.push(desc.label.to_string());
        Ok(ProgramHandle(id))
    }

    fn create_geometry(&mut self, label: &str, buffers: &AttributeSet) -> FxResult<GeometryHandle> {
        assert!(buffers.is_consistent(), "{label} uploaded inconsistent buffers");
        let attempt = self.log.borrow().geometries_created;
        if self.log.borrow().fail_geometry_at == Some(attempt) {
            self.log.borrow_mut().geometries_created += 1;
            return Err(FxError::allocation(label, "injected failure"));
        }
        let id = self.next();
        let mut log = self.log.borrow_mut();
        log.geometries_created += 1;
        log.live_geometries.insert(id);
        Ok(GeometryHandle(id))
    }

    fn write_uniforms(&mut self, program: ProgramHandle, bytes: &[u8]) {
        let mut log = self.log.borrow_mut();
        assert!(log.live_programs.contains(&program.0), "uniform write to released program");
        assert_eq!(bytes.len() % 16, 0);
        log.uniform_writes += 1;
    }

    fn write_attribute(&mut self, geometry: GeometryHandle, _semantic: Semantic, _data: &[f32]) {
        let mut log = self.log.borrow_mut();
        assert!(log.live_geometries.contains(&geometry.0), "attribute write to released geometry");
        log.attribute_writes += 1;
    }

    fn release_program(&mut self, program: ProgramHandle) {
        let mut log = self.log.borrow_mut();
        if log.live_programs.remove(&program.0) {
            log.programs_released += 1;
        }
    }

    fn release_geometry(&mut self, geometry: GeometryHandle) {
        let mut log = self.log.borrow_mut();
        if log.live_geometries.remove(&geometry.0) {
            log.geometries_released += 1;
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.log.borrow_mut().resizes.push((width, height));
    }

    fn render(&mut self, plan: &FramePlan) -> FxResult<()> {
        let mut log = self.log.borrow_mut();
        if log.fail_render {
            return Err(FxError::ContextLost);
        }
        for d in &plan.draws {
            assert!(log.live_programs.contains(&d.program.0));
            assert!(log.live_geometries.contains(&d.geometry.0));
        }
        log.renders += 1;
        log.last_plan = Some(plan.clone());
        Ok(())
    }
}
