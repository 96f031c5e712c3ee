//! # mesh-core
//!
//! Types shared by every crate in the insurance agent mesh.
//!
//! An *action* is a named, schema-described operation exposed by an agent.
//! Its static metadata is an [`ActionDescriptor`]; callers address it across
//! the mesh with a [`QualifiedName`] (`agent.action`) and pass typed
//! [`Arguments`]. Handlers answer with an [`ActionOutput`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;

// Configuration types shared across all mesh crates
pub mod config;
pub mod error;
pub mod ids;

pub use config::{
    AgentEndpoint, ConfigError, MergeStrategy, MeshConfig, PipelineConfig, ResolverConfig,
    ServerConfig,
};
pub use error::MeshError;
pub use ids::{IdGenerator, SequentialIds, UuidIds};

/// The value type a parameter accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Decimal,
    Boolean,
}

impl ParamKind {
    /// JSON Schema type name for this kind.
    pub fn json_type(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Decimal => "number",
            ParamKind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Decimal => "decimal",
            ParamKind::Boolean => "boolean",
        };
        f.write_str(s)
    }
}

/// One entry of an action's ordered parameter schema.
///
/// There are no default values: a missing required parameter is a
/// resolution error, never something the mesh fills in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default = "default_required")]
    pub required: bool,
}

/// Static metadata for an action. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionDescriptor {
    /// Unique within the owning registry.
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a required parameter.
    pub fn param(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.parameters.push(ParameterSpec {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    /// Append an optional parameter.
    pub fn optional(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.parameters.push(ParameterSpec {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|p| p.required)
    }

    /// Names of required parameters not present in `args`, in schema order.
    pub fn missing_required(&self, args: &Arguments) -> Vec<String> {
        self.required_parameters()
            .filter(|p| !args.contains(&p.name))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Render the parameter list as a JSON Schema object.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.parameters {
            properties.insert(p.name.clone(), json!({ "type": p.kind.json_type() }));
        }
        let required: Vec<&str> = self
            .required_parameters()
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A typed argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
}

impl ArgValue {
    /// Coerce this value into `kind`, returning a reason on failure.
    pub fn coerce_to(&self, kind: ParamKind) -> Result<ArgValue, String> {
        match (kind, self) {
            (ParamKind::String, ArgValue::String(s)) => Ok(ArgValue::String(s.clone())),
            (ParamKind::String, other) => Ok(ArgValue::String(other.to_string())),

            (ParamKind::Integer, ArgValue::Integer(n)) => Ok(ArgValue::Integer(*n)),
            (ParamKind::Integer, ArgValue::Decimal(d)) if d.fract() == 0.0 => {
                Ok(ArgValue::Integer(*d as i64))
            }
            (ParamKind::Integer, ArgValue::String(s)) => s
                .trim()
                .replace(',', "")
                .parse::<i64>()
                .map(ArgValue::Integer)
                .map_err(|_| format!("'{}' is not an integer", s)),

            (ParamKind::Decimal, ArgValue::Decimal(d)) => Ok(ArgValue::Decimal(*d)),
            (ParamKind::Decimal, ArgValue::Integer(n)) => Ok(ArgValue::Decimal(*n as f64)),
            (ParamKind::Decimal, ArgValue::String(s)) => s
                .trim()
                .trim_start_matches('$')
                .replace(',', "")
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite())
                .map(ArgValue::Decimal)
                .ok_or_else(|| format!("'{}' is not a decimal number", s)),

            (ParamKind::Boolean, ArgValue::Boolean(b)) => Ok(ArgValue::Boolean(*b)),
            (ParamKind::Boolean, ArgValue::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" => Ok(ArgValue::Boolean(true)),
                "false" | "no" => Ok(ArgValue::Boolean(false)),
                _ => Err(format!("'{}' is not a boolean", s)),
            },

            (kind, other) => Err(format!("{} value '{}' cannot be used as {}", other.kind(), other, kind)),
        }
    }

    pub fn kind(&self) -> ParamKind {
        match self {
            ArgValue::Boolean(_) => ParamKind::Boolean,
            ArgValue::Integer(_) => ParamKind::Integer,
            ArgValue::Decimal(_) => ParamKind::Decimal,
            ArgValue::String(_) => ParamKind::String,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Boolean(b) => write!(f, "{}", b),
            ArgValue::Integer(n) => write!(f, "{}", n),
            ArgValue::Decimal(d) => write!(f, "{}", d),
            ArgValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::String(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::String(s)
    }
}

impl From<i64> for ArgValue {
    fn from(n: i64) -> Self {
        ArgValue::Integer(n)
    }
}

impl From<f64> for ArgValue {
    fn from(d: f64) -> Self {
        ArgValue::Decimal(d)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Boolean(b)
    }
}

/// Parameter name to typed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(BTreeMap<String, ArgValue>);

impl Arguments {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ArgValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ArgValue)> {
        self.0.iter()
    }

    /// Copy entries from `other` whose names are not present yet.
    pub fn fill_missing(&mut self, other: &Arguments) {
        for (name, value) in other.iter() {
            self.0.entry(name.clone()).or_insert_with(|| value.clone());
        }
    }

    pub fn str(&self, name: &str) -> Result<&str, MeshError> {
        match self.get(name) {
            Some(ArgValue::String(s)) => Ok(s.as_str()),
            Some(other) => Err(MeshError::argument(
                name,
                format!("expected string, got {}", other.kind()),
            )),
            None => Err(MeshError::argument(name, "missing")),
        }
    }

    pub fn i64(&self, name: &str) -> Result<i64, MeshError> {
        match self.get(name) {
            Some(ArgValue::Integer(n)) => Ok(*n),
            Some(other) => Err(MeshError::argument(
                name,
                format!("expected integer, got {}", other.kind()),
            )),
            None => Err(MeshError::argument(name, "missing")),
        }
    }

    pub fn f64(&self, name: &str) -> Result<f64, MeshError> {
        match self.get(name) {
            Some(ArgValue::Decimal(d)) => Ok(*d),
            Some(ArgValue::Integer(n)) => Ok(*n as f64),
            Some(other) => Err(MeshError::argument(
                name,
                format!("expected decimal, got {}", other.kind()),
            )),
            None => Err(MeshError::argument(name, "missing")),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool, MeshError> {
        match self.get(name) {
            Some(ArgValue::Boolean(b)) => Ok(*b),
            Some(other) => Err(MeshError::argument(
                name,
                format!("expected boolean, got {}", other.kind()),
            )),
            None => Err(MeshError::argument(name, "missing")),
        }
    }

    /// String value of an optional parameter, or `default` when absent.
    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> Result<&'a str, MeshError> {
        if self.contains(name) {
            self.str(name)
        } else {
            Ok(default)
        }
    }
}

impl FromIterator<(String, ArgValue)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (String, ArgValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Mesh-wide action address: `agent.action`.
///
/// Agent ids may contain dots (e.g. `10.0.0.5:7871`); action names never do,
/// so parsing splits on the last dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct QualifiedName {
    pub agent: String,
    pub action: String,
}

impl QualifiedName {
    pub fn new(agent: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            action: action.into(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let (agent, action) = s.rsplit_once('.')?;
        if agent.is_empty() || action.is_empty() {
            return None;
        }
        Some(Self::new(agent, action))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.agent, self.action)
    }
}

impl From<QualifiedName> for String {
    fn from(q: QualifiedName) -> Self {
        q.to_string()
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        QualifiedName::parse(&s).ok_or_else(|| format!("'{}' is not a qualified action name", s))
    }
}

/// The resolver's choice for one request: transient, consumed immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCall {
    pub action: QualifiedName,
    pub arguments: Arguments,
    /// In `0.0..=1.0`.
    pub confidence: f32,
}

/// What a handler returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActionOutput {
    Text { text: String },
    Json { json: Value },
}

impl ActionOutput {
    pub fn text(text: impl Into<String>) -> Self {
        ActionOutput::Text { text: text.into() }
    }

    pub fn json(json: Value) -> Self {
        ActionOutput::Json { json }
    }

    /// Text rendering; JSON payloads are pretty-printed.
    pub fn as_text(&self) -> String {
        match self {
            ActionOutput::Text { text } => text.clone(),
            ActionOutput::Json { json } => {
                serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string())
            }
        }
    }
}

impl fmt::Display for ActionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

fn default_required() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_policy() -> ActionDescriptor {
        ActionDescriptor::new("createPolicy", "Create a new insurance policy")
            .param("policyType", ParamKind::String)
            .param("customerName", ParamKind::String)
            .param("coverageAmount", ParamKind::Decimal)
            .optional("notes", ParamKind::String)
    }

    #[test]
    fn input_schema_validates_typed_arguments() {
        let schema = create_policy().input_schema();
        let validator = jsonschema::draft202012::options()
            .build(&schema)
            .expect("schema must compile");

        let args = Arguments::new()
            .with("policyType", "life")
            .with("customerName", "John Doe")
            .with("coverageAmount", 500000.0);
        let instance = serde_json::to_value(&args).expect("arguments must serialize");
        assert!(validator.is_valid(&instance));

        let missing = json!({ "policyType": "life" });
        assert!(!validator.is_valid(&missing));

        let mistyped = json!({
            "policyType": "life",
            "customerName": "John Doe",
            "coverageAmount": "lots"
        });
        assert!(!validator.is_valid(&mistyped));
    }

    #[test]
    fn missing_required_follows_schema_order() {
        let args = Arguments::new().with("customerName", "John Doe");
        assert_eq!(
            create_policy().missing_required(&args),
            vec!["policyType".to_string(), "coverageAmount".to_string()]
        );
    }

    #[test]
    fn coerce_numeric_strings() {
        let v = ArgValue::from("$500,000").coerce_to(ParamKind::Decimal).unwrap();
        assert_eq!(v, ArgValue::Decimal(500000.0));

        let v = ArgValue::from("1,200").coerce_to(ParamKind::Integer).unwrap();
        assert_eq!(v, ArgValue::Integer(1200));

        let v = ArgValue::Integer(42).coerce_to(ParamKind::Decimal).unwrap();
        assert_eq!(v, ArgValue::Decimal(42.0));

        let v = ArgValue::from("Yes").coerce_to(ParamKind::Boolean).unwrap();
        assert_eq!(v, ArgValue::Boolean(true));
    }

    #[test]
    fn coerce_rejects_garbage() {
        assert!(ArgValue::from("lots").coerce_to(ParamKind::Decimal).is_err());
        assert!(ArgValue::from("maybe").coerce_to(ParamKind::Boolean).is_err());
        assert!(ArgValue::Decimal(1.5).coerce_to(ParamKind::Integer).is_err());
        assert!(ArgValue::Boolean(true).coerce_to(ParamKind::Decimal).is_err());
    }

    #[test]
    fn anything_coerces_to_string() {
        let v = ArgValue::Integer(7).coerce_to(ParamKind::String).unwrap();
        assert_eq!(v, ArgValue::String("7".to_string()));
    }

    #[test]
    fn typed_getters_report_parameter() {
        let args = Arguments::new().with("age", "forty");
        let err = args.i64("age").unwrap_err();
        assert!(matches!(err, MeshError::ArgumentError { ref parameter, .. } if parameter == "age"));

        let err = args.f64("amount").unwrap_err();
        assert!(matches!(err, MeshError::ArgumentError { ref parameter, .. } if parameter == "amount"));

        assert_eq!(args.str_or("note", "none").unwrap(), "none");
    }

    #[test]
    fn qualified_name_splits_on_last_dot() {
        let q = QualifiedName::parse("10.0.0.5:7871.getClaimStatus").unwrap();
        assert_eq!(q.agent, "10.0.0.5:7871");
        assert_eq!(q.action, "getClaimStatus");
        assert_eq!(q.to_string(), "10.0.0.5:7871.getClaimStatus");

        assert!(QualifiedName::parse("createPolicy").is_none());
        assert!(QualifiedName::parse(".createPolicy").is_none());
    }

    #[test]
    fn arguments_deserialize_from_json_scalars() {
        let args: Arguments = serde_json::from_value(json!({
            "age": 42,
            "smoker": false,
            "amount": 12.5,
            "name": "John"
        }))
        .unwrap();

        assert_eq!(args.i64("age").unwrap(), 42);
        assert!(!args.bool("smoker").unwrap());
        assert_eq!(args.f64("amount").unwrap(), 12.5);
        assert_eq!(args.str("name").unwrap(), "John");
    }

    #[test]
    fn action_output_serializes_with_type_tag() {
        let out = ActionOutput::text("done");
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!({ "type": "text", "text": "done" })
        );
    }
}
