use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Which event stream an engine instance evaluates.
///
/// The two deployments share one implementation; the kind selects the rule
/// set, the key-value namespaces and the audit tag.
///
/// # Examples
///
/// ```
/// use oxrule_common::types::EngineKind;
///
/// let kind: EngineKind = "resources".parse().unwrap();
/// assert_eq!(kind, EngineKind::Resources);
/// assert_eq!(kind.to_string(), "resources");
/// assert!("metrics".parse::<EngineKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Errors,
    Resources,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Errors => "errors",
            EngineKind::Resources => "resources",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "errors" | "error" => Ok(EngineKind::Errors),
            "resources" | "resource" => Ok(EngineKind::Resources),
            _ => Err(format!("unknown engine kind: {s}")),
        }
    }
}

/// The (tenant, service, project) triple that rules and cached rule sets
/// are keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleScope {
    pub tenant_id: String,
    pub service_name: String,
    pub project_id: String,
}

impl RuleScope {
    pub fn new(
        tenant_id: impl Into<String>,
        service_name: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            service_name: service_name.into(),
            project_id: project_id.into(),
        }
    }
}

impl std::fmt::Display for RuleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.tenant_id, self.service_name, self.project_id)
    }
}

/// One reported runtime occurrence, decoded from the inbound topic.
///
/// Field names follow the SDK wire format. `repeat_count` is scratch space
/// filled in by `repeat_over` conditions during evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    #[serde(deserialize_with = "string_or_number")]
    pub project_id: String,
    #[serde(
        rename = "user_id",
        alias = "tenant_id",
        deserialize_with = "string_or_number"
    )]
    pub tenant_id: String,
    pub service_name: String,
    pub environment: String,
    pub version: String,
    pub error_message: String,
    #[serde(rename = "go_version", alias = "runtime_version")]
    pub runtime_version: String,
    pub os: String,
    pub arch: String,
    pub event_type: String,
    pub level: String,
    pub event_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    pub timestamp: String,
    pub context_json: String,
    pub language: String,
    #[serde(deserialize_with = "null_as_default")]
    pub fields: Map<String, Value>,
    pub repeat_count: i64,
}

impl Event {
    pub fn scope(&self) -> RuleScope {
        RuleScope::new(&self.tenant_id, &self.service_name, &self.project_id)
    }
}

/// Comparison operator of a [`Condition`].
///
/// Unrecognized spellings are preserved in [`Operator::Unknown`] so they can
/// be logged; they never match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    RepeatOver,
    Unknown(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::NotIn => "nin",
            Operator::Contains => "contains",
            Operator::RepeatOver => "repeat_over",
            Operator::Unknown(s) => s,
        }
    }
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        match s.as_str() {
            "eq" => Operator::Eq,
            "neq" => Operator::Neq,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "in" => Operator::In,
            "nin" | "not_in" => Operator::NotIn,
            "contains" => Operator::Contains,
            "repeat_over" => Operator::RepeatOver,
            _ => Operator::Unknown(s),
        }
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Unknown(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single predicate: `field <operator> value`.
///
/// `field` is a dot path. Its first segment names a fixed event attribute
/// or `fields`, the dynamic bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// How a [`LogicNode`] folds its conditions and children.
///
/// Anything other than `AND` (case-insensitive) reads as `OR`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Combinator {
    And,
    #[default]
    Or,
}

impl From<String> for Combinator {
    fn from(s: String) -> Self {
        if s.eq_ignore_ascii_case("and") {
            Combinator::And
        } else {
            Combinator::Or
        }
    }
}

impl From<Combinator> for String {
    fn from(c: Combinator) -> Self {
        match c {
            Combinator::And => "AND".to_string(),
            Combinator::Or => "OR".to_string(),
        }
    }
}

/// One node of a rule's boolean expression tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicNode {
    #[serde(default)]
    pub operator: Combinator,
    #[serde(default, deserialize_with = "null_as_default")]
    pub conditions: Vec<Condition>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<LogicNode>,
}

impl LogicNode {
    pub fn and(conditions: Vec<Condition>, children: Vec<LogicNode>) -> Self {
        Self {
            operator: Combinator::And,
            conditions,
            children,
        }
    }

    pub fn or(conditions: Vec<Condition>, children: Vec<LogicNode>) -> Self {
        Self {
            operator: Combinator::Or,
            conditions,
            children,
        }
    }
}

/// Notification channel requested by an [`Action`].
///
/// The wire names are the ones the downstream senders consume.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    Email,
    Discord,
    Telegram,
    Noop,
    Other(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            ActionType::Email => "EMAIL",
            ActionType::Discord => "DISCORD",
            ActionType::Telegram => "TELEGRAM",
            ActionType::Noop => "NONE",
            ActionType::Other(s) => s,
        }
    }
}

impl From<String> for ActionType {
    fn from(s: String) -> Self {
        match s.to_uppercase().as_str() {
            "EMAIL" | "MAIL" => ActionType::Email,
            "DISCORD" | "CHAT" => ActionType::Discord,
            "TELEGRAM" | "BOT" => ActionType::Telegram,
            "NONE" => ActionType::Noop,
            _ => ActionType::Other(s),
        }
    }
}

impl From<ActionType> for String {
    fn from(t: ActionType) -> Self {
        match t {
            ActionType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification instruction attached to a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Delivery parameters, e.g. `email` or `chat_id`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub params: BTreeMap<String, String>,
}

impl Action {
    pub fn new(action_type: ActionType, params: &[(&str, &str)]) -> Self {
        Self {
            action_type,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// A named, scoped expression tree plus the actions it triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(
        rename = "user_id",
        alias = "tenant_id",
        default,
        deserialize_with = "string_or_number"
    )]
    pub tenant_id: String,
    #[serde(default)]
    pub service_name: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub root_node: LogicNode,
}

/// Identity of a matched rule as recorded in the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedRule {
    pub rule_id: String,
    pub rule_name: String,
}

impl From<&Rule> for UsedRule {
    fn from(rule: &Rule) -> Self {
        Self {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Ids arrive as strings from the SDK and as integers from the database.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or numeric id, got {other}"
        ))),
    }
}
