//! Compiled block types, keyed by name.
//!
//! A [`Registry`] is immutable once built. Reloading builds a fresh one and
//! swaps it into a [`RegistryHandle`]; renders holding the previous `Arc`
//! finish against the registry they started with.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::block::BlockType;
use crate::error::{RenderError, RenderResult};
use crate::template::{self, CompiledTemplate};

/// A block type together with its compiled template
#[derive(Debug, Clone)]
pub struct CompiledBlockType {
    definition: BlockType,
    template: Arc<CompiledTemplate>,
}

impl CompiledBlockType {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &BlockType {
        &self.definition
    }

    pub fn template(&self) -> &CompiledTemplate {
        &self.template
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: HashMap<String, CompiledBlockType>,
}

impl Registry {
    /// Compile every enabled block type.
    ///
    /// Disabled rows are ignored entirely. Any compile failure aborts the
    /// whole load and names the offending type. Identical template texts
    /// are compiled once and shared.
    pub fn load<I>(rows: I) -> RenderResult<Self>
    where
        I: IntoIterator<Item = BlockType>,
    {
        let mut types = HashMap::new();
        let mut compiled: HashMap<String, Arc<CompiledTemplate>> = HashMap::new();
        let mut skipped = 0usize;

        for definition in rows {
            if !definition.enabled {
                skipped += 1;
                continue;
            }
            if definition.name.trim().is_empty() {
                return Err(RenderError::InvalidBlockType {
                    name: definition.name,
                    reason: "name must not be empty".to_string(),
                });
            }
            if types.contains_key(&definition.name) {
                return Err(RenderError::InvalidBlockType {
                    name: definition.name,
                    reason: "defined more than once".to_string(),
                });
            }

            let template = match compiled.get(&definition.template) {
                Some(shared) => Arc::clone(shared),
                None => {
                    let fresh = Arc::new(
                        template::compile(&definition.template)
                            .map_err(|e| e.with_block_type(&definition.name))?,
                    );
                    compiled.insert(definition.template.clone(), Arc::clone(&fresh));
                    fresh
                }
            };

            debug!(block_type = %definition.name, "compiled block template");
            types.insert(
                definition.name.clone(),
                CompiledBlockType {
                    definition,
                    template,
                },
            );
        }

        info!(
            block_types = types.len(),
            templates = compiled.len(),
            disabled = skipped,
            "block type registry loaded"
        );
        Ok(Self { types })
    }

    pub fn get(&self, name: &str) -> RenderResult<&CompiledBlockType> {
        self.types
            .get(name)
            .ok_or_else(|| RenderError::UnknownBlockType {
                block_type: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Shared, atomically replaceable registry reference.
#[derive(Debug)]
pub struct RegistryHandle {
    current: ArcSwap<Registry>,
}

impl Default for RegistryHandle {
    fn default() -> Self {
        Self::new(Registry::default())
    }
}

impl RegistryHandle {
    pub fn new(registry: Registry) -> Self {
        Self {
            current: ArcSwap::from_pointee(registry),
        }
    }

    /// The live registry. Lock-free; the `Arc` stays valid across reloads.
    pub fn current(&self) -> Arc<Registry> {
        self.current.load_full()
    }

    pub fn replace(&self, registry: Registry) {
        self.current.store(Arc::new(registry));
    }

    /// Build a new registry from `rows` and swap it in.
    ///
    /// On error the previous registry stays live. Returns the number of
    /// registered types.
    pub fn reload<I>(&self, rows: I) -> RenderResult<usize>
    where
        I: IntoIterator<Item = BlockType>,
    {
        let registry = Registry::load(rows)?;
        let count = registry.len();
        self.replace(registry);
        Ok(count)
    }
}
