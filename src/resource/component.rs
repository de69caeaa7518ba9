//! Display Components
//!
//! Nested, serializable display widgets a display transform may return in
//! place of a plain value. A component serializes as
//! `{"component": <name>, ...props, "children": [...]}`.

use serde_json::{json, Map, Value};
use std::fmt;

pub trait Component: Send + Sync + fmt::Debug {
    /// Component identifier understood by the frontend
    fn name(&self) -> &'static str;

    /// Props, excluding children
    fn props(&self) -> Map<String, Value>;

    fn children(&self) -> &[Box<dyn Component>] {
        &[]
    }
}

/// Serialize a component tree into JSON
pub fn serialize_component(component: &dyn Component) -> Value {
    let mut map = Map::new();
    map.insert("component".to_string(), json!(component.name()));
    map.extend(component.props());

    let children = component.children();
    if !children.is_empty() {
        map.insert(
            "children".to_string(),
            Value::Array(
                children
                    .iter()
                    .map(|child| serialize_component(child.as_ref()))
                    .collect(),
            ),
        );
    }

    Value::Object(map)
}

/// What a display transform hands back
#[derive(Debug)]
pub enum DisplayValue {
    Value(Value),
    Component(Box<dyn Component>),
}

impl DisplayValue {
    /// Materialize into the `data` slot
    pub fn into_data(self) -> Value {
        match self {
            Self::Value(v) => v,
            Self::Component(c) => serialize_component(c.as_ref()),
        }
    }
}

impl From<Value> for DisplayValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl<C: Component + 'static> From<C> for DisplayValue {
    fn from(component: C) -> Self {
        Self::Component(Box::new(component))
    }
}

#[derive(Debug, Clone)]
pub struct Text {
    pub value: Value,
}

impl Text {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl Component for Text {
    fn name(&self) -> &'static str {
        "text"
    }

    fn props(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("value".to_string(), self.value.clone());
        props
    }
}

#[derive(Debug, Clone)]
pub struct Badge {
    pub label: String,
    pub color: Option<[u8; 3]>,
}

impl Badge {
    pub fn new(label: &str, color: Option<[u8; 3]>) -> Self {
        Self {
            label: label.to_string(),
            color,
        }
    }
}

impl Component for Badge {
    fn name(&self) -> &'static str {
        "badge"
    }

    fn props(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("label".to_string(), json!(self.label));
        props.insert(
            "color".to_string(),
            self.color
                .map(|[r, g, b]| json!(format!("#{:02x}{:02x}{:02x}", r, g, b)))
                .unwrap_or(Value::Null),
        );
        props
    }
}

#[derive(Debug, Clone)]
pub struct Link {
    pub label: String,
    pub href: String,
}

impl Link {
    pub fn new(label: &str, href: &str) -> Self {
        Self {
            label: label.to_string(),
            href: href.to_string(),
        }
    }
}

impl Component for Link {
    fn name(&self) -> &'static str {
        "link"
    }

    fn props(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("label".to_string(), json!(self.label));
        props.insert("href".to_string(), json!(self.href));
        props
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackDirection {
    Horizontal,
    #[default]
    Vertical,
}

#[derive(Debug)]
pub struct Stack {
    pub direction: StackDirection,
    pub children: Vec<Box<dyn Component>>,
}

impl Stack {
    pub fn new(direction: StackDirection) -> Self {
        Self {
            direction,
            children: Vec::new(),
        }
    }

    pub fn push(mut self, child: impl Component + 'static) -> Self {
        self.children.push(Box::new(child));
        self
    }
}

impl Component for Stack {
    fn name(&self) -> &'static str {
        "stack"
    }

    fn props(&self) -> Map<String, Value> {
        let mut props = Map::new();
        let direction = match self.direction {
            StackDirection::Horizontal => "horizontal",
            StackDirection::Vertical => "vertical",
        };
        props.insert("direction".to_string(), json!(direction));
        props
    }

    fn children(&self) -> &[Box<dyn Component>] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_serializes_hex_color() {
        let value = serialize_component(&Badge::new("RUNNING", Some([0, 200, 83])));
        assert_eq!(
            value,
            json!({"component": "badge", "label": "RUNNING", "color": "#00c853"})
        );
    }

    #[test]
    fn test_nested_stack_serializes_recursively() {
        let inner = Stack::new(StackDirection::Horizontal).push(Badge::new("a", None));
        let outer = Stack::new(StackDirection::Vertical)
            .push(Text::new("title"))
            .push(inner);

        let value = DisplayValue::from(outer).into_data();
        assert_eq!(value["component"], "stack");
        assert_eq!(value["children"][0], json!({"component": "text", "value": "title"}));
        assert_eq!(value["children"][1]["direction"], "horizontal");
        assert_eq!(value["children"][1]["children"][0]["label"], "a");
    }

    #[test]
    fn test_plain_value_passes_through() {
        assert_eq!(DisplayValue::from(json!(42)).into_data(), json!(42));
    }
}
