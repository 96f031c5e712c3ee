//! The catalog management surface.

use crate::cancel::CancelSignal;
use crate::events::{PipelineEventSink, TracingEventSink};
use crate::merge::{MergedResponse, PipelineError};
use crate::pipeline::{Invocation, Pipeline, RunOptions};
use mesh_catalog::{AgentCatalog, AgentHandle, CatalogEntry, HttpAgent};
use mesh_core::{MeshConfig, MeshError, QualifiedName};
use mesh_planner::{IntentResolver, ResolutionTrace, Scorer};
use std::sync::Arc;

/// A catalog of agents plus the resolver and pipeline that answer requests
/// against it.
pub struct Mesh {
    config: MeshConfig,
    catalog: Arc<AgentCatalog>,
    pipeline: Pipeline,
    scorer: Option<Arc<dyn Scorer>>,
    events: Arc<dyn PipelineEventSink>,
}

impl Mesh {
    /// An empty mesh. Agents are added with [`Mesh::add_agent`],
    /// [`Mesh::add_endpoint`] or [`Mesh::connect_configured`].
    pub fn new(config: MeshConfig) -> Self {
        let catalog = Arc::new(AgentCatalog::new());
        let events: Arc<dyn PipelineEventSink> = Arc::new(TracingEventSink);
        let pipeline = Self::build_pipeline(&config, &catalog, None, &events);
        Self {
            config,
            catalog,
            pipeline,
            scorer: None,
            events,
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn PipelineEventSink>) -> Self {
        self.events = events;
        self.rebuild();
        self
    }

    /// Replace the keyword scorer.
    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = Some(scorer);
        self.rebuild();
        self
    }

    fn rebuild(&mut self) {
        self.pipeline =
            Self::build_pipeline(&self.config, &self.catalog, self.scorer.clone(), &self.events);
    }

    fn build_pipeline(
        config: &MeshConfig,
        catalog: &Arc<AgentCatalog>,
        scorer: Option<Arc<dyn Scorer>>,
        events: &Arc<dyn PipelineEventSink>,
    ) -> Pipeline {
        let resolver = match scorer {
            Some(scorer) => IntentResolver::with_scorer(scorer, config.resolver.clone()),
            None => IntentResolver::new(config.resolver.clone()),
        };
        Pipeline::new(catalog.clone(), resolver, config.pipeline.clone()).with_events(events.clone())
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<AgentCatalog> {
        &self.catalog
    }

    pub async fn add_agent(
        &self,
        handle: Arc<dyn AgentHandle>,
    ) -> Result<Vec<QualifiedName>, MeshError> {
        self.catalog.add_agent(handle).await
    }

    /// Connect to a remote agent server and add it to the catalog.
    pub async fn add_endpoint(
        &self,
        id: &str,
        endpoint: &str,
    ) -> Result<Vec<QualifiedName>, MeshError> {
        let agent = HttpAgent::new(id, endpoint, self.config.pipeline.call_timeout())?
            .with_descriptor_ttl(self.config.descriptor_ttl());
        self.catalog.add_agent(Arc::new(agent)).await
    }

    /// Add every agent listed in the configuration.
    ///
    /// Stops at the first agent that cannot be reached; agents added before
    /// it stay registered.
    pub async fn connect_configured(&self) -> Result<usize, MeshError> {
        let mut total = 0;
        for agent in &self.config.agents {
            total += self.add_endpoint(&agent.id, &agent.endpoint).await?.len();
        }
        Ok(total)
    }

    pub async fn remove_agent(&self, id: &str) -> Result<(), MeshError> {
        self.catalog.remove_agent(id).await
    }

    pub async fn list_actions(&self) -> Vec<CatalogEntry> {
        self.catalog.list_actions().await
    }

    /// Single mode: one request, one action.
    pub async fn resolve_and_invoke(&self, text: &str) -> Result<Invocation, MeshError> {
        self.pipeline.invoke_once(text).await
    }

    /// Score every candidate for `text` without invoking anything.
    pub async fn explain(&self, text: &str) -> ResolutionTrace {
        let index = self.catalog.snapshot().await;
        self.pipeline.resolver().explain(text, &index, &[])
    }

    /// Pipeline mode with inferred execution mode and the configured merge.
    pub async fn run_pipeline(&self, text: &str) -> Result<MergedResponse, PipelineError> {
        self.pipeline
            .run(text, RunOptions::default(), &CancelSignal::never())
            .await
    }

    pub async fn run_pipeline_with(
        &self,
        text: &str,
        options: RunOptions,
        cancel: &CancelSignal,
    ) -> Result<MergedResponse, PipelineError> {
        self.pipeline.run(text, options, cancel).await
    }
}
