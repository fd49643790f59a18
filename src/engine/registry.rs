use std::collections::HashMap;

use anyhow::{anyhow, Result};

use super::backend::{EngineSpec, PerceptionEngine};
use super::backends::StubEngine;

/// Builds an engine from its spec.
pub type EngineFactory = Box<dyn Fn(&EngineSpec) -> Result<Box<dyn PerceptionEngine>> + Send + Sync>;

/// Engine factories keyed by model name.
///
/// A model name with no registered factory falls through to the default
/// factory, when one is set.
pub struct EngineRegistry {
    factories: HashMap<String, EngineFactory>,
    default_factory: Option<EngineFactory>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            default_factory: None,
        }
    }

    /// Registry with the engines compiled into this build.
    ///
    /// `stub` is always available. The default factory is the tract engine
    /// when `backend-tract` is enabled, the stub engine otherwise.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("stub", |spec| {
            Ok(Box::new(StubEngine::new(spec.cameras)) as Box<dyn PerceptionEngine>)
        });

        #[cfg(feature = "backend-tract")]
        {
            use super::backends::TractEngine;
            registry.register("tract", |spec| {
                Ok(Box::new(TractEngine::from_spec(spec)?) as Box<dyn PerceptionEngine>)
            });
            registry.set_default(|spec| {
                Ok(Box::new(TractEngine::from_spec(spec)?) as Box<dyn PerceptionEngine>)
            });
        }

        #[cfg(not(feature = "backend-tract"))]
        registry.set_default(|spec| {
            Ok(Box::new(StubEngine::new(spec.cameras)) as Box<dyn PerceptionEngine>)
        });

        registry
    }

    /// Register a factory for a model name, replacing any previous one.
    pub fn register<F>(&mut self, model: &str, factory: F)
    where
        F: Fn(&EngineSpec) -> Result<Box<dyn PerceptionEngine>> + Send + Sync + 'static,
    {
        self.factories.insert(model.to_string(), Box::new(factory));
    }

    /// Factory used for model names with no explicit registration.
    pub fn set_default<F>(&mut self, factory: F)
    where
        F: Fn(&EngineSpec) -> Result<Box<dyn PerceptionEngine>> + Send + Sync + 'static,
    {
        self.default_factory = Some(Box::new(factory));
    }

    /// Remove the default factory; unknown model names then fail to create.
    pub fn clear_default(&mut self) {
        self.default_factory = None;
    }

    /// Create the engine for `spec.model`.
    pub fn create(&self, spec: &EngineSpec) -> Result<Box<dyn PerceptionEngine>> {
        let factory = self
            .factories
            .get(&spec.model)
            .or(self.default_factory.as_ref())
            .ok_or_else(|| anyhow!("no engine registered for model '{}'", spec.model))?;
        let engine = factory(spec)?;
        log::info!(
            "created {} engine for model {} ({})",
            engine.name(),
            spec.model,
            spec.precision
        );
        Ok(engine)
    }

    /// List explicitly registered model names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn spec(model: &str) -> EngineSpec {
        EngineSpec {
            model: model.to_string(),
            precision: "fp16".to_string(),
            model_root: PathBuf::from("model"),
            cameras: 6,
            input_width: 704,
            input_height: 256,
        }
    }

    #[test]
    fn explicit_registration_wins() -> Result<()> {
        let registry = EngineRegistry::with_builtin();
        let engine = registry.create(&spec("stub"))?;
        assert_eq!(engine.name(), "stub");
        assert!(registry.list().contains(&"stub".to_string()));
        Ok(())
    }

    #[cfg(not(feature = "backend-tract"))]
    #[test]
    fn unknown_model_uses_default_factory() -> Result<()> {
        let registry = EngineRegistry::with_builtin();
        let engine = registry.create(&spec("resnet18"))?;
        assert_eq!(engine.name(), "stub");
        Ok(())
    }

    #[test]
    fn unknown_model_without_default_fails() {
        let mut registry = EngineRegistry::with_builtin();
        registry.clear_default();
        let err = registry.create(&spec("resnet18")).err().map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("no engine registered for model 'resnet18'")
        );
    }

    #[test]
    fn factory_errors_propagate() {
        let mut registry = EngineRegistry::new();
        registry.register("broken", |_| Err(anyhow!("weights missing")));
        assert!(registry.create(&spec("broken")).is_err());
    }
}
