use std::sync::Arc;

use backend::RestBackend;
use config::Config;
use discovery::Pipeline;

pub mod backend;
pub mod config;
pub mod discovery;
pub mod error;
pub mod middleware;
pub mod models;
pub mod utils;

pub mod routes;

pub struct AppState<B = RestBackend> {
    pub config: Config,
    pub backend: Arc<B>,
    pub pipeline: Arc<Pipeline>,
}

impl<B> AppState<B> {
    pub fn new(config: Config, backend: B) -> Self {
        let pipeline = Arc::new(Pipeline::new(config.pipeline.clone()));
        Self {
            config,
            backend: Arc::new(backend),
            pipeline,
        }
    }
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            backend: Arc::clone(&self.backend),
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}
