//! Function declarations and the dispatch registry
//!
//! This module covers both halves of the function-calling contract:
//!
//! 1. **Declaration** — [`FunctionDeclaration`] describes one locally
//!    invocable function (name, description, typed parameters) and
//!    serializes to the wire schema the model sees. Built through
//!    [`FunctionDeclarationBuilder`] into an immutable value.
//!
//! 2. **Dispatch** — [`FunctionRegistry`] maps declared names to async
//!    handlers. Handlers receive **positional** arguments in the
//!    declaration's parameter order, so the mapping from the model's named
//!    JSON arguments to the local call is fully determined by the
//!    declaration, never by argument-name matching at the call site.
//!
//! The registry is an explicit mapping the caller populates before the
//! session starts; nothing is ever resolved from ambient scope.
//!
//! # Declaring a function
//!
//! ```rust
//! use gemini_chat::FunctionDeclaration;
//!
//! # fn main() -> gemini_chat::Result<()> {
//! let declaration = FunctionDeclaration::builder("get_weather")
//!     .description("Get current weather for a city")
//!     .parameter("city", "string", "The city to look up")
//!     .optional_parameter("units", "string", "celsius or fahrenheit")
//!     .build()?;
//!
//! assert_eq!(declaration.argument_order(), ["city", "units"]);
//! # Ok(())
//! # }
//! ```
//!
//! Array-typed parameters use the `Array<T>` notation and must name their
//! item type:
//!
//! ```rust
//! use gemini_chat::FunctionDeclaration;
//!
//! # fn main() -> gemini_chat::Result<()> {
//! let declaration = FunctionDeclaration::builder("tag_rows")
//!     .description("Tag spreadsheet rows")
//!     .parameter("tags", "Array<string>", "Tags to apply")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::types::{
    FunctionDeclarationSchema, ItemSchema, ParameterSchema, PropertySchema, Tool,
};
use crate::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// What a local function handed back to the conversation engine.
///
/// An explicit tagged type instead of runtime type inspection: the engine
/// normalizes each variant into the wire payload fed back to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionReturn {
    /// A bare string, wrapped as `{"content": ...}` before echoing back
    Text(String),
    /// A structured value, passed through as-is
    Structured(Value),
    /// Nothing to report; replaced by a fixed success marker
    Empty,
}

impl From<String> for FunctionReturn {
    fn from(text: String) -> Self {
        FunctionReturn::Text(text)
    }
}

impl From<&str> for FunctionReturn {
    fn from(text: &str) -> Self {
        FunctionReturn::Text(text.to_string())
    }
}

impl From<Value> for FunctionReturn {
    fn from(value: Value) -> Self {
        FunctionReturn::Structured(value)
    }
}

impl From<()> for FunctionReturn {
    fn from(_: ()) -> Self {
        FunctionReturn::Empty
    }
}

/// Type alias for registered handler functions.
///
/// Handlers take positional arguments (ordered by the declaration) and run
/// asynchronously; the pinned, boxed future allows handlers of different
/// concrete types to live in one registry.
pub type FunctionHandler = Arc<
    dyn Fn(Vec<Value>) -> Pin<Box<dyn Future<Output = Result<FunctionReturn>> + Send>>
        + Send
        + Sync,
>;

/// One declared parameter, as recorded by the builder before schema
/// expansion
#[derive(Debug, Clone)]
struct ParameterSpec {
    name: String,
    type_name: String,
    description: String,
    optional: bool,
}

/// Immutable description of one locally invocable function.
///
/// Only name, description, and the parameter schema are serialized for the
/// model; `argument_order`, `terminal`, and `args_only` drive local
/// dispatch.
#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    name: String,
    description: String,
    properties: BTreeMap<String, PropertySchema>,
    required: Vec<String>,
    argument_order: Vec<String>,
    terminal: bool,
    args_only: bool,
}

impl FunctionDeclaration {
    /// Start building a declaration with the given (registry-unique) name
    pub fn builder(name: impl Into<String>) -> FunctionDeclarationBuilder {
        FunctionDeclarationBuilder {
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
            terminal: false,
            args_only: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared parameter names in positional-call order
    pub fn argument_order(&self) -> &[String] {
        &self.argument_order
    }

    /// Whether a call to this function ends the conversation immediately
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Whether a call to this function returns its parsed arguments to the
    /// caller without running local code
    pub fn is_args_only(&self) -> bool {
        self.args_only
    }

    /// The wire form sent to the model
    pub fn to_schema(&self) -> FunctionDeclarationSchema {
        FunctionDeclarationSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: ParameterSchema {
                kind: "OBJECT".to_string(),
                properties: self.properties.clone(),
                required: self.required.clone(),
            },
        }
    }
}

/// Builder producing an immutable [`FunctionDeclaration`]
#[derive(Debug, Clone)]
pub struct FunctionDeclarationBuilder {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
    terminal: bool,
    args_only: bool,
}

impl FunctionDeclarationBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a required parameter. `type_name` is a scalar type ("string",
    /// "number", "integer", "boolean") or `Array<T>` for arrays.
    pub fn parameter(
        self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.push_parameter(name, type_name, description, false)
    }

    /// Add an optional parameter
    pub fn optional_parameter(
        self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.push_parameter(name, type_name, description, true)
    }

    fn push_parameter(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        description: impl Into<String>,
        optional: bool,
    ) -> Self {
        self.parameters.push(ParameterSpec {
            name: name.into(),
            type_name: type_name.into(),
            description: description.into(),
            optional,
        });
        self
    }

    /// Mark this function as terminal: its invocation ends the
    /// conversation loop immediately
    pub fn end_with_result(mut self) -> Self {
        self.terminal = true;
        self
    }

    /// Mark this function args-only: the model's arguments are returned to
    /// the caller and no local code runs
    pub fn only_return_arguments(mut self) -> Self {
        self.args_only = true;
        self
    }

    pub fn build(self) -> Result<FunctionDeclaration> {
        if self.name.is_empty() {
            return Err(Error::validation("function name must not be empty"));
        }

        let mut properties = BTreeMap::new();
        let mut required = Vec::new();
        let mut argument_order = Vec::new();

        for spec in self.parameters {
            let (kind, items) = parse_type(&spec.name, &spec.type_name)?;
            properties.insert(
                spec.name.clone(),
                PropertySchema {
                    kind,
                    description: spec.description,
                    items,
                },
            );
            if !spec.optional {
                required.push(spec.name.clone());
            }
            argument_order.push(spec.name);
        }

        Ok(FunctionDeclaration {
            name: self.name,
            description: self.description,
            properties,
            required,
            argument_order,
            terminal: self.terminal,
            args_only: self.args_only,
        })
    }
}

/// Resolve a declared type name into a wire type plus optional item type.
///
/// `Array<string>` becomes `("array", Some(items: "string"))`; an array
/// without an item type is rejected.
fn parse_type(name: &str, type_name: &str) -> Result<(String, Option<ItemSchema>)> {
    if let Some(rest) = type_name.strip_prefix("Array") {
        let item = rest
            .strip_prefix('<')
            .and_then(|inner| inner.strip_suffix('>'))
            .map(str::trim)
            .filter(|inner| !inner.is_empty());
        return match item {
            Some(item) => Ok((
                "array".to_string(),
                Some(ItemSchema {
                    kind: item.to_string(),
                }),
            )),
            None => Err(Error::validation(format!(
                "array parameter `{name}` must declare its item type, e.g. Array<string>"
            ))),
        };
    }
    Ok((type_name.to_string(), None))
}

/// A declaration paired with its handler
pub struct RegisteredFunction {
    declaration: FunctionDeclaration,
    handler: FunctionHandler,
}

impl RegisteredFunction {
    pub fn declaration(&self) -> &FunctionDeclaration {
        &self.declaration
    }

    /// Invoke the handler, mapping the model's named JSON arguments to
    /// positional arguments via the declaration's argument order. Missing
    /// arguments are passed as JSON null.
    pub async fn invoke(&self, args: &Value) -> Result<FunctionReturn> {
        let positional: Vec<Value> = self
            .declaration
            .argument_order
            .iter()
            .map(|name| args.get(name).cloned().unwrap_or(Value::Null))
            .collect();
        (self.handler)(positional).await
    }
}

/// Name-to-handler mapping populated by the caller before a session starts
#[derive(Default)]
pub struct FunctionRegistry {
    functions: Vec<RegisteredFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration with its handler. Names are unique within a
    /// registry.
    pub fn register<F, Fut>(&mut self, declaration: FunctionDeclaration, handler: F) -> Result<()>
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FunctionReturn>> + Send + 'static,
    {
        if self.get(declaration.name()).is_some() {
            return Err(Error::validation(format!(
                "function `{}` is already registered",
                declaration.name()
            )));
        }
        self.functions.push(RegisteredFunction {
            declaration,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        });
        Ok(())
    }

    /// Look up a function by declared name
    pub fn get(&self, name: &str) -> Option<&RegisteredFunction> {
        self.functions
            .iter()
            .find(|function| function.declaration.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Aggregate every declaration into the single tools entry sent on the
    /// wire
    pub(crate) fn to_tool(&self) -> Tool {
        Tool {
            function_declarations: self
                .functions
                .iter()
                .map(|function| function.declaration.to_schema())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_declaration() -> FunctionDeclaration {
        FunctionDeclaration::builder("get_weather")
            .description("Get current weather for a city")
            .parameter("city", "string", "The city to look up")
            .optional_parameter("units", "string", "celsius or fahrenheit")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_records_argument_order() {
        let declaration = weather_declaration();
        assert_eq!(declaration.argument_order(), ["city", "units"]);
        assert!(!declaration.is_terminal());
        assert!(!declaration.is_args_only());
    }

    #[test]
    fn test_builder_flags() {
        let declaration = FunctionDeclaration::builder("finish")
            .description("Wrap up")
            .end_with_result()
            .build()
            .unwrap();
        assert!(declaration.is_terminal());

        let declaration = FunctionDeclaration::builder("extract")
            .description("Extract fields")
            .only_return_arguments()
            .build()
            .unwrap();
        assert!(declaration.is_args_only());
    }

    #[test]
    fn test_array_parameter_extracts_item_type() {
        let declaration = FunctionDeclaration::builder("tag_rows")
            .description("Tag rows")
            .parameter("tags", "Array<string>", "Tags to apply")
            .build()
            .unwrap();
        let schema = declaration.to_schema();
        let tags = &schema.parameters.properties["tags"];
        assert_eq!(tags.kind, "array");
        assert_eq!(tags.items.as_ref().unwrap().kind, "string");
    }

    #[test]
    fn test_array_parameter_without_item_type_rejected() {
        for bad in ["Array", "Array<>"] {
            let result = FunctionDeclaration::builder("tag_rows")
                .description("Tag rows")
                .parameter("tags", bad, "Tags to apply")
                .build();
            assert!(
                matches!(result, Err(Error::Validation(_))),
                "expected validation error for `{bad}`"
            );
        }
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = FunctionDeclaration::builder("").build();
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_wire_schema_shape() {
        let schema = serde_json::to_value(weather_declaration().to_schema()).unwrap();
        assert_eq!(
            schema,
            json!({
                "name": "get_weather",
                "description": "Get current weather for a city",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "city": {"type": "string", "description": "The city to look up"},
                        "units": {"type": "string", "description": "celsius or fahrenheit"}
                    },
                    "required": ["city"]
                }
            })
        );
    }

    #[tokio::test]
    async fn test_invoke_maps_named_args_positionally() {
        let declaration = FunctionDeclaration::builder("pair")
            .description("Record a pair")
            .parameter("a", "number", "first")
            .parameter("b", "number", "second")
            .build()
            .unwrap();

        let mut registry = FunctionRegistry::new();
        registry
            .register(declaration, |args| async move {
                Ok(FunctionReturn::Structured(json!({ "received": args })))
            })
            .unwrap();

        // JSON key order must not matter; only the declared order does.
        let result = registry
            .get("pair")
            .unwrap()
            .invoke(&json!({"b": 2, "a": 1}))
            .await
            .unwrap();
        assert_eq!(
            result,
            FunctionReturn::Structured(json!({"received": [1, 2]}))
        );
    }

    #[tokio::test]
    async fn test_invoke_fills_missing_args_with_null() {
        let mut registry = FunctionRegistry::new();
        registry
            .register(weather_declaration(), |args| async move {
                assert_eq!(args[0], json!("Paris"));
                assert!(args[1].is_null());
                Ok(FunctionReturn::Empty)
            })
            .unwrap();

        registry
            .get("get_weather")
            .unwrap()
            .invoke(&json!({"city": "Paris"}))
            .await
            .unwrap();
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = FunctionRegistry::new();
        registry
            .register(weather_declaration(), |_| async {
                Ok(FunctionReturn::Empty)
            })
            .unwrap();
        let result = registry.register(weather_declaration(), |_| async {
            Ok(FunctionReturn::Empty)
        });
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_registry_aggregates_declarations() {
        let mut registry = FunctionRegistry::new();
        registry
            .register(weather_declaration(), |_| async {
                Ok(FunctionReturn::Empty)
            })
            .unwrap();
        registry
            .register(
                FunctionDeclaration::builder("get_time")
                    .description("Current time")
                    .build()
                    .unwrap(),
                |_| async { Ok(FunctionReturn::Empty) },
            )
            .unwrap();

        let tool = registry.to_tool();
        assert_eq!(tool.function_declarations.len(), 2);
        assert_eq!(tool.function_declarations[0].name, "get_weather");
        assert_eq!(tool.function_declarations[1].name, "get_time");
    }

    #[test]
    fn test_function_return_conversions() {
        assert_eq!(
            FunctionReturn::from("done"),
            FunctionReturn::Text("done".to_string())
        );
        assert_eq!(
            FunctionReturn::from(json!({"ok": true})),
            FunctionReturn::Structured(json!({"ok": true}))
        );
        assert_eq!(FunctionReturn::from(()), FunctionReturn::Empty);
    }
}
