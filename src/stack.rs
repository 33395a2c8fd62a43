use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::engine::{Attributes, Engine, RegisterRequest};
use crate::error::{Error, Result};
use crate::output::{AttributeRef, Output};

/// a declarable piece of infrastructure. Its serialized form is
/// what gets handed to the engine as the resource's properties.
pub trait Resource: Serialize {
    fn type_token(&self) -> &'static str;

    /// URNs of the resources this one references.
    fn depends_on(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// a resource after the engine accepted it. Use [`Registered::output`] to
/// reference its attributes from other resources.
#[derive(Debug, Clone)]
pub struct Registered {
    pub urn: String,
    pub name: String,
    pub type_token: &'static str,
    attributes: Attributes,
}

impl Registered {
    pub fn output<T: DeserializeOwned>(&self, attribute: &str) -> Result<Output<T>> {
        let attr_err = |message: String| Error::Attribute {
            resource: self.name.clone(),
            attribute: attribute.to_string(),
            message,
        };
        let value = match self.attributes.get(attribute) {
            Some(Some(v)) => Some(
                serde_json::from_value(v.clone()).map_err(|e| attr_err(format!("unexpected type: {e}")))?,
            ),
            Some(None) => None,
            None => return Err(attr_err("not provided by the engine".to_string())),
        };
        let source = AttributeRef {
            urn: self.urn.clone(),
            resource: self.name.clone(),
            attribute: attribute.to_string(),
        };
        Ok(Output::from_attribute(source, value))
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedResource {
    pub urn: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub name: String,
    pub properties: Value,
    pub depends_on: Vec<String>,
    pub attributes: Attributes,
}

/// everything a stack declared, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackDocument {
    pub project: String,
    pub stack: String,
    pub resources: Vec<SavedResource>,
    pub outputs: BTreeMap<String, Value>,
}

impl StackDocument {
    pub fn resources_of_type<'a>(&'a self, ty: &'a str) -> impl Iterator<Item = &'a SavedResource> + 'a {
        self.resources.iter().filter(move |r| r.ty == ty)
    }

    pub fn resource(&self, ty: &str, name: &str) -> Option<&SavedResource> {
        self.resources.iter().find(|r| r.ty == ty && r.name == name)
    }
}

pub struct Stack<'e> {
    project: String,
    stack: String,
    engine: &'e mut dyn Engine,
    resources: Vec<SavedResource>,
    urns: BTreeSet<String>,
    outputs: BTreeMap<String, Value>,
}

impl<'e> Stack<'e> {
    pub fn new(project: &str, stack: &str, engine: &'e mut dyn Engine) -> Result<Self> {
        validate_name("project", project)?;
        validate_name("stack", stack)?;
        Ok(Self {
            project: project.to_string(),
            stack: stack.to_string(),
            engine,
            resources: vec![],
            urns: BTreeSet::new(),
            outputs: BTreeMap::new(),
        })
    }

    pub fn urn(&self, type_token: &str, name: &str) -> String {
        format!("urn:{}::{}::{type_token}::{name}", self.stack, self.project)
    }

    pub fn register<R: Resource>(&mut self, name: &str, resource: &R) -> Result<Registered> {
        let type_token = resource.type_token();
        let urn = self.urn(type_token, name);
        if name.is_empty() {
            return Err(Error::validation(&urn, "resource name cannot be empty"));
        }
        resource.validate().map_err(|e| Error::validation(name, e))?;
        let depends_on = resource.depends_on();
        // references can only point backwards, so the graph stays acyclic
        if let Some(missing) = depends_on.iter().find(|d| !self.urns.contains(*d)) {
            return Err(Error::validation(name, format!("depends on undeclared resource {missing}")));
        }
        if self.urns.contains(&urn) {
            return Err(Error::DuplicateResource { urn });
        }
        let properties = serde_json::to_value(resource)?;
        let attributes = self.engine.register(&RegisterRequest {
            urn: &urn,
            type_token,
            name,
            properties: &properties,
        })?;
        self.urns.insert(urn.clone());
        self.resources.push(SavedResource {
            urn: urn.clone(),
            ty: type_token.to_string(),
            name: name.to_string(),
            properties,
            depends_on: depends_on.into_iter().collect(),
            attributes: attributes.clone(),
        });
        Ok(Registered {
            urn,
            name: name.to_string(),
            type_token,
            attributes,
        })
    }

    /// surfaces a value to whoever applies the stack.
    pub fn export<T: Serialize>(&mut self, name: &str, value: &Output<T>) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.outputs.insert(name.to_string(), value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn finish(self) -> StackDocument {
        info!(
            project = %self.project,
            stack = %self.stack,
            resources = self.resources.len(),
            "stack declared"
        );
        StackDocument {
            project: self.project,
            stack: self.stack,
            resources: self.resources,
            outputs: self.outputs,
        }
    }
}

fn validate_name(kind: &str, name: &str) -> Result<()> {
    // same rules as cloudformation stack names
    let restriction = "Must only consist of alphanumeric characters and hyphens, Must start with an alphabetical character, and cannot be longer than 128 characters.";
    let valid = name.len() <= 128
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid {
        return Err(Error::validation(kind, format!("Invalid {kind} name {name:?}\n{restriction}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocalEngine;

    #[derive(Serialize)]
    struct Thing {
        value: Output<String>,
    }

    impl Resource for Thing {
        fn type_token(&self) -> &'static str {
            "test:index:Thing"
        }
        fn depends_on(&self) -> BTreeSet<String> {
            self.value.depends_on()
        }
        fn validate(&self) -> std::result::Result<(), String> {
            match self.value.value() {
                Some(v) if v.is_empty() => Err("value cannot be empty".to_string()),
                _ => Ok(()),
            }
        }
    }

    #[derive(Serialize)]
    struct Other {}

    impl Resource for Other {
        fn type_token(&self) -> &'static str {
            "test:index:Other"
        }
    }

    #[test]
    fn duplicate_names_are_rejected_per_type() {
        let mut engine = LocalEngine::new("us-east-1", "000000000000");
        let mut stack = Stack::new("site", "dev", &mut engine).unwrap();
        stack.register("a", &Thing { value: "x".into() }).unwrap();
        let err = stack.register("a", &Thing { value: "y".into() }).unwrap_err();
        assert!(matches!(err, Error::DuplicateResource { .. }));
        // same name, different type is fine
        stack.register("a", &Other {}).unwrap();
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn outputs_record_dependencies() {
        let mut engine = LocalEngine::new("us-east-1", "000000000000");
        let mut stack = Stack::new("site", "dev", &mut engine).unwrap();
        let first = stack.register("first", &Thing { value: "x".into() }).unwrap();
        let value: Output<String> = first.output("value").unwrap();
        assert_eq!(value.value().map(String::as_str), Some("x"));
        stack.register("second", &Thing { value }).unwrap();
        let doc = stack.finish();
        let second = doc.resource("test:index:Thing", "second").unwrap();
        assert_eq!(second.depends_on, vec!["urn:dev::site::test:index:Thing::first".to_string()]);
    }

    #[test]
    fn missing_attribute_is_an_error() {
        let mut engine = LocalEngine::new("us-east-1", "000000000000");
        let mut stack = Stack::new("site", "dev", &mut engine).unwrap();
        let first = stack.register("first", &Other {}).unwrap();
        let err = first.output::<String>("doesNotExist").unwrap_err();
        assert!(matches!(err, Error::Attribute { .. }));
    }

    #[test]
    fn validation_runs_before_registration() {
        let mut engine = LocalEngine::new("us-east-1", "000000000000");
        let mut stack = Stack::new("site", "dev", &mut engine).unwrap();
        let err = stack.register("bad", &Thing { value: "".into() }).unwrap_err();
        assert!(err.to_string().contains("value cannot be empty"));
        assert!(stack.is_empty());
        drop(stack);
        assert_eq!(engine.registered(), 0);
    }

    #[test]
    fn invalid_stack_names() {
        let mut engine = LocalEngine::new("us-east-1", "000000000000");
        assert!(Stack::new("site", "1dev", &mut engine).is_err());
        assert!(Stack::new("my_site", "dev", &mut engine).is_err());
        assert!(Stack::new("my-site", "dev-2", &mut engine).is_ok());
    }
}
