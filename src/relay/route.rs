// Declarative description of one relayed backend call.

use reqwest::Method;
use serde_json::{Map, Value};

use super::error::RelayError;

/// Opaque JSON object passed between client, relay and backend.
pub type Envelope = Map<String, Value>;

/// Key carrying the sub-operation of multiplexed routes.
pub const ACTION_KEY: &str = "action";

const DEFAULT_FAILURE: &str = "Backend request failed";

/// Where forwarded fields travel on the backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// JSON request body.
    Body,
    /// Query string parameters; no body is sent.
    Query,
}

/// A fully resolved backend request.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// One backend operation: path, required keys, defaults and payload shape.
#[derive(Debug, Clone)]
pub struct RelayRoute {
    name: String,
    method: Method,
    backend_path: String,
    required: Vec<String>,
    defaults: Vec<(String, Value)>,
    fields: Option<Vec<String>>,
    placement: Placement,
    failure: String,
}

impl RelayRoute {
    pub fn new(method: Method, backend_path: &str) -> Self {
        Self {
            name: backend_path.to_string(),
            method,
            backend_path: backend_path.to_string(),
            required: Vec::new(),
            defaults: Vec::new(),
            fields: None,
            placement: Placement::Body,
            failure: DEFAULT_FAILURE.to_string(),
        }
    }

    pub fn get(backend_path: &str) -> Self {
        Self::new(Method::GET, backend_path)
    }

    pub fn post(backend_path: &str) -> Self {
        Self::new(Method::POST, backend_path)
    }

    pub fn delete(backend_path: &str) -> Self {
        Self::new(Method::DELETE, backend_path)
    }

    /// Label used in logs and metrics.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn require<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_default(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.defaults.push((key.to_string(), value.into()));
        self
    }

    /// Forward only these keys instead of the whole envelope.
    pub fn forward_fields<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn in_query(mut self) -> Self {
        self.placement = Placement::Query;
        self
    }

    pub fn on_failure(mut self, message: &str) -> Self {
        self.failure = message.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn backend_path(&self) -> &str {
        &self.backend_path
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn failure_message(&self) -> &str {
        &self.failure
    }

    /// Reject the envelope on the first required key that is missing.
    pub fn validate(&self, envelope: &Envelope) -> Result<(), RelayError> {
        match self
            .required
            .iter()
            .find(|key| !is_present(envelope.get(key.as_str())))
        {
            Some(key) => Err(RelayError::MissingField(key.clone())),
            None => Ok(()),
        }
    }

    pub fn apply_defaults(&self, envelope: &mut Envelope) {
        for (key, value) in &self.defaults {
            let absent = envelope.get(key).map_or(true, Value::is_null);
            if absent {
                envelope.insert(key.clone(), value.clone());
            }
        }
    }

    /// Validate, fill defaults and build the backend request.
    pub fn prepare(&self, mut envelope: Envelope) -> Result<Outbound, RelayError> {
        self.validate(&envelope)?;
        self.apply_defaults(&mut envelope);

        let segments = self.fill_path(&envelope)?;
        let payload = self.payload(envelope);

        // GET and DELETE carry no body; their fields ride in the query string.
        let placement = if self.method == Method::GET || self.method == Method::DELETE {
            Placement::Query
        } else {
            self.placement
        };

        let (query, body) = match placement {
            Placement::Body => (Vec::new(), Some(Value::Object(payload))),
            Placement::Query => (
                payload
                    .into_iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k, scalar_to_string(&v)))
                    .collect(),
                None,
            ),
        };

        Ok(Outbound {
            method: self.method.clone(),
            segments,
            query,
            body,
        })
    }

    fn fill_path(&self, envelope: &Envelope) -> Result<Vec<String>, RelayError> {
        self.backend_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match placeholder(segment) {
                Some(key) => envelope
                    .get(key)
                    .filter(|v| is_present(Some(*v)))
                    .map(scalar_to_string)
                    .ok_or_else(|| RelayError::MissingField(key.to_string())),
                None => Ok(segment.to_string()),
            })
            .collect()
    }

    fn payload(&self, mut envelope: Envelope) -> Envelope {
        match &self.fields {
            Some(fields) => fields
                .iter()
                .filter_map(|key| envelope.remove(key).map(|v| (key.clone(), v)))
                .collect(),
            None => {
                envelope.remove(ACTION_KEY);
                for segment in self.backend_path.split('/') {
                    if let Some(key) = placeholder(segment) {
                        envelope.remove(key);
                    }
                }
                envelope
            }
        }
    }
}

/// Several backend operations behind one local route, selected by `action`.
#[derive(Debug, Clone, Default)]
pub struct ActionRelay {
    actions: Vec<(String, RelayRoute)>,
}

impl ActionRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(mut self, action: &str, route: RelayRoute) -> Self {
        self.actions.push((action.to_string(), route));
        self
    }

    pub fn actions(&self) -> impl Iterator<Item = (&str, &RelayRoute)> {
        self.actions.iter().map(|(a, r)| (a.as_str(), r))
    }

    pub fn select(&self, envelope: &Envelope) -> Result<&RelayRoute, RelayError> {
        let action = envelope.get(ACTION_KEY);
        if !is_present(action) {
            return Err(RelayError::MissingField(ACTION_KEY.to_string()));
        }
        let action = action.map(scalar_to_string).unwrap_or_default();
        self.actions
            .iter()
            .find(|(name, _)| *name == action)
            .map(|(_, route)| route)
            .ok_or(RelayError::InvalidAction(action))
    }
}

/// Either a single backend operation or an action-multiplexed group.
#[derive(Debug, Clone)]
pub enum Relay {
    Single(RelayRoute),
    Action(ActionRelay),
}

impl Relay {
    pub fn resolve(&self, envelope: &Envelope) -> Result<&RelayRoute, RelayError> {
        match self {
            Relay::Single(route) => Ok(route),
            Relay::Action(group) => group.select(envelope),
        }
    }

    /// Every backend operation reachable through this relay, with its action.
    pub fn routes(&self) -> Vec<(Option<&str>, &RelayRoute)> {
        match self {
            Relay::Single(route) => vec![(None, route)],
            Relay::Action(group) => group.actions().map(|(a, r)| (Some(a), r)).collect(),
        }
    }
}

impl From<RelayRoute> for Relay {
    fn from(route: RelayRoute) -> Self {
        Relay::Single(route)
    }
}

impl From<ActionRelay> for Relay {
    fn from(group: ActionRelay) -> Self {
        Relay::Action(group)
    }
}

/// JavaScript truthiness: `null`, `false`, `0`, `NaN` and `""` count as missing.
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Parse an inbound body. Empty bodies and non-object JSON yield an empty envelope.
pub fn parse_envelope(body: &[u8]) -> Result<Envelope, RelayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Envelope::new());
    }
    match serde_json::from_slice::<Value>(body).map_err(RelayError::InvalidBody)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Envelope::new()),
    }
}

fn placeholder(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
