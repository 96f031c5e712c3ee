//! Per-agent action registry.
//!
//! Maps each [`ActionDescriptor`] to the handler that serves it. The registry
//! itself has no side effects: it validates and coerces arguments, then hands
//! them to the handler and returns its result unmodified.

use mesh_core::{ActionDescriptor, ActionOutput, ArgValue, Arguments, MeshError};
use std::collections::HashMap;
use std::sync::Arc;

/// A domain operation behind an action.
pub trait Handler: Send + Sync {
    fn call(&self, args: &Arguments) -> Result<ActionOutput, MeshError>;
}

impl<F> Handler for F
where
    F: Fn(&Arguments) -> Result<ActionOutput, MeshError> + Send + Sync,
{
    fn call(&self, args: &Arguments) -> Result<ActionOutput, MeshError> {
        self(args)
    }
}

#[derive(Clone)]
struct RegisteredAction {
    descriptor: ActionDescriptor,
    handler: Arc<dyn Handler>,
}

/// Registry of actions exposed by one agent.
///
/// Iteration follows registration order so that resolver tie-breaking and
/// discovery output are reproducible.
#[derive(Clone)]
pub struct ActionRegistry {
    name: String,
    actions: Vec<RegisteredAction>,
    index: HashMap<String, usize>,
}

impl ActionRegistry {
    /// Create a new empty registry for the named agent.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// The owning agent's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register an action. Fails if the name is already taken.
    pub fn register(
        &mut self,
        descriptor: ActionDescriptor,
        handler: impl Handler + 'static,
    ) -> Result<(), MeshError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(MeshError::DuplicateAction {
                name: descriptor.name,
            });
        }

        self.index
            .insert(descriptor.name.clone(), self.actions.len());
        self.actions.push(RegisteredAction {
            descriptor,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// All descriptors, in registration order.
    pub fn describe(&self) -> Vec<ActionDescriptor> {
        self.actions.iter().map(|a| a.descriptor.clone()).collect()
    }

    /// Get a descriptor by name.
    pub fn descriptor(&self, name: &str) -> Option<&ActionDescriptor> {
        self.index.get(name).map(|&i| &self.actions[i].descriptor)
    }

    /// Check if an action exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Action names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.actions
            .iter()
            .map(|a| a.descriptor.name.as_str())
            .collect()
    }

    /// Get the number of registered actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Validate `args` against the action's schema and run its handler.
    pub fn invoke(&self, name: &str, args: &Arguments) -> Result<ActionOutput, MeshError> {
        let action = self
            .index
            .get(name)
            .map(|&i| &self.actions[i])
            .ok_or_else(|| MeshError::UnknownAction {
                name: name.to_string(),
            })?;

        let bound = bind_arguments(&action.descriptor, args)?;

        tracing::debug!(
            agent = %self.name,
            action = %name,
            args = bound.len(),
            "Invoking action"
        );

        action.handler.call(&bound)
    }
}

/// Coerce `args` to the descriptor's parameter kinds.
///
/// Missing required parameters and failed coercions are argument errors.
/// Arguments the schema does not mention are dropped.
pub fn bind_arguments(
    descriptor: &ActionDescriptor,
    args: &Arguments,
) -> Result<Arguments, MeshError> {
    let mut bound = Arguments::new();

    for spec in &descriptor.parameters {
        match args.get(&spec.name) {
            Some(value) => {
                let coerced: ArgValue = value
                    .coerce_to(spec.kind)
                    .map_err(|reason| MeshError::argument(&spec.name, reason))?;
                bound.insert(spec.name.clone(), coerced);
            }
            None if spec.required => {
                return Err(MeshError::argument(&spec.name, "required parameter missing"));
            }
            None => {}
        }
    }

    for (name, _) in args.iter() {
        if descriptor.parameter(name).is_none() {
            tracing::debug!(
                action = %descriptor.name,
                parameter = %name,
                "Ignoring argument not in schema"
            );
        }
    }

    Ok(bound)
}
