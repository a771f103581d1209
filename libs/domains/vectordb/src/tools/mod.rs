//! Tool catalogue: descriptors, argument parsing and the registry.

mod args;
mod catalog;
mod request;

pub use args::Arguments;
pub use request::ToolRequest;

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::config::OperationCategory;
use crate::error::{VectorDbError, VectorDbResult};

/// Converts raw arguments into a typed request
pub type ArgumentParser = fn(&Arguments<'_>) -> VectorDbResult<ToolRequest>;

/// A registered tool. Immutable once registered.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub category: OperationCategory,
    pub input_schema: Value,
    parser: ArgumentParser,
}

impl ToolDescriptor {
    pub fn new(
        name: &'static str,
        description: &'static str,
        category: OperationCategory,
        input_schema: Value,
        parser: ArgumentParser,
    ) -> Self {
        Self {
            name,
            description,
            category,
            input_schema,
            parser,
        }
    }

    /// Validate and coerce arguments into this tool's request.
    pub fn parse(&self, arguments: &Arguments<'_>) -> VectorDbResult<ToolRequest> {
        (self.parser)(arguments)
    }

    pub fn info(&self) -> ToolInfo<'_> {
        ToolInfo {
            name: self.name,
            description: self.description,
            input_schema: &self.input_schema,
        }
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Wire shape of a tool in `/mcp/tools/list`
#[derive(Debug, Serialize)]
pub struct ToolInfo<'a> {
    pub name: &'a str,
    pub description: &'a str,
    #[serde(rename = "inputSchema")]
    pub input_schema: &'a Value,
}

/// Name-keyed tool table with stable, registration-ordered listing.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the full vector database tool set.
    pub fn with_default_tools() -> Self {
        let mut registry = Self::new();
        for descriptor in catalog::default_tools() {
            registry.register(descriptor);
        }
        registry
    }

    /// Add a tool.
    ///
    /// # Panics
    /// If a tool with the same name is already registered. Tool tables are
    /// assembled at startup, so a duplicate is a programming error.
    pub fn register(&mut self, descriptor: ToolDescriptor) {
        assert!(
            !self.index.contains_key(descriptor.name),
            "tool '{}' registered twice",
            descriptor.name
        );
        self.index.insert(descriptor.name, self.tools.len());
        self.tools.push(descriptor);
    }

    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn resolve(&self, name: &str) -> VectorDbResult<&ToolDescriptor> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| VectorDbError::ToolNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
