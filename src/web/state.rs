use std::sync::Arc;

use crate::{generation::CourseGenerator, model::ModelManager};

#[derive(Debug, Clone)]
pub struct AppState {
    mm: ModelManager,
    generator: Arc<CourseGenerator>,
}

impl AppState {
    pub fn new(mm: ModelManager, generator: CourseGenerator) -> Self {
        Self {
            mm,
            generator: Arc::new(generator),
        }
    }

    pub fn pool(&self) -> &ModelManager {
        &self.mm
    }

    pub fn generator(&self) -> &CourseGenerator {
        &self.generator
    }
}
