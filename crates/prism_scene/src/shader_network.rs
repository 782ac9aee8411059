//! Shader Networks
//!
//! A [`ShaderNetwork`] is a DAG of named shaders. Edges connect an output
//! [`Parameter`] of one shader to an input [`Parameter`] of another, and one
//! parameter is designated as the network output (normally the root
//! shader's whole output, with an empty parameter name).
//!
//! # Substitutions
//!
//! String parameters may embed `${name}` tokens that are resolved against an
//! attribute [`Dictionary`] at translation time. Substitution is always
//! applied to a copy; the network itself is immutable once shared.

use std::collections::{BTreeMap, BTreeSet};

use prism_core::{CompoundData, ContentHash, ContentHasher, Data, Hash128};

use crate::value::{Dictionary, Value};

/// A single shader node.
#[derive(Debug, Clone, PartialEq)]
pub struct Shader {
    /// Native shader type, e.g. `standard_surface`.
    pub name: String,
    /// Role hint such as `surface`, `shader`, `light`.
    pub kind: String,
    pub parameters: CompoundData,
}

impl Shader {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            parameters: CompoundData::new(),
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Data>) -> Self {
        self.parameters.insert(name, value);
        self
    }
}

impl ContentHash for Shader {
    fn hash_into(&self, h: &mut ContentHasher) {
        h.write_str(&self.name);
        h.write_str(&self.kind);
        self.parameters.hash_into(h);
    }
}

/// `(shader handle, parameter name)`. An empty name addresses the shader's
/// whole output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Parameter {
    pub shader: String,
    pub name: String,
}

impl Parameter {
    #[must_use]
    pub fn new(shader: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            shader: shader.into(),
            name: name.into(),
        }
    }

    /// The whole output of `shader`.
    #[must_use]
    pub fn output(shader: impl Into<String>) -> Self {
        Self::new(shader, "")
    }
}

impl ContentHash for Parameter {
    fn hash_into(&self, h: &mut ContentHasher) {
        h.write_str(&self.shader);
        h.write_str(&self.name);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Connection {
    pub source: Parameter,
    pub destination: Parameter,
}

impl Connection {
    #[must_use]
    pub fn new(source: Parameter, destination: Parameter) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// DAG of shaders plus a designated output parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderNetwork {
    shaders: BTreeMap<String, Shader>,
    connections: BTreeSet<Connection>,
    output: Parameter,
}

impl ShaderNetwork {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for single-shader networks.
    #[must_use]
    pub fn single(handle: impl Into<String>, shader: Shader) -> Self {
        let handle = handle.into();
        let mut network = Self::new();
        network.add_shader(handle.clone(), shader);
        network.set_output(Parameter::output(handle));
        network
    }

    pub fn add_shader(&mut self, handle: impl Into<String>, shader: Shader) {
        self.shaders.insert(handle.into(), shader);
    }

    pub fn remove_shader(&mut self, handle: &str) -> Option<Shader> {
        self.connections
            .retain(|c| c.source.shader != handle && c.destination.shader != handle);
        self.shaders.remove(handle)
    }

    #[must_use]
    pub fn shader(&self, handle: &str) -> Option<&Shader> {
        self.shaders.get(handle)
    }

    pub fn shader_mut(&mut self, handle: &str) -> Option<&mut Shader> {
        self.shaders.get_mut(handle)
    }

    pub fn shaders(&self) -> impl Iterator<Item = (&String, &Shader)> {
        self.shaders.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    pub fn add_connection(&mut self, connection: Connection) {
        self.connections.insert(connection);
    }

    pub fn remove_connection(&mut self, connection: &Connection) -> bool {
        self.connections.remove(connection)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Connections whose destination is a parameter of `handle`.
    pub fn input_connections<'a>(&'a self, handle: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.destination.shader == handle)
    }

    /// The source connected to `destination`, if any.
    #[must_use]
    pub fn input(&self, destination: &Parameter) -> Option<&Parameter> {
        self.connections
            .iter()
            .find(|c| &c.destination == destination)
            .map(|c| &c.source)
    }

    pub fn set_output(&mut self, output: Parameter) {
        self.output = output;
    }

    #[must_use]
    pub fn output(&self) -> &Parameter {
        &self.output
    }

    #[must_use]
    pub fn output_shader(&self) -> Option<&Shader> {
        self.shaders.get(&self.output.shader)
    }

    /// Hash of the upstream network feeding `destination`, or `None` when
    /// the parameter is unconnected.
    #[must_use]
    pub fn input_hash(&self, destination: &Parameter) -> Option<Hash128> {
        let source = self.input(destination)?;
        let mut h = ContentHasher::new();
        let mut visited = BTreeSet::new();
        self.hash_upstream(&source.shader, &mut h, &mut visited);
        h.append(source);
        Some(h.finish())
    }

    fn hash_upstream<'a>(&'a self, handle: &'a str, h: &mut ContentHasher, visited: &mut BTreeSet<&'a str>) {
        if !visited.insert(handle) {
            return;
        }
        if let Some(shader) = self.shaders.get(handle) {
            shader.hash_into(h);
        }
        for c in self.input_connections(handle) {
            h.append(&c.destination.name);
            h.append(&c.source.name);
            self.hash_upstream(&c.source.shader, h, visited);
        }
    }

    // ------------------------------------------------------------------------
    // Substitutions
    // ------------------------------------------------------------------------

    /// `true` if any string parameter contains a `${…}` token.
    #[must_use]
    pub fn has_substitutions(&self) -> bool {
        self.shaders.values().any(|s| {
            s.parameters
                .iter()
                .any(|(_, v)| string_values(v).any(|text| !tokens(text).is_empty()))
        })
    }

    /// Hash of the values the substitutions would resolve to. Two attribute
    /// dictionaries with equal substitution hashes produce identical
    /// substituted networks.
    #[must_use]
    pub fn substitutions_hash(&self, attributes: &Dictionary) -> Hash128 {
        let mut h = ContentHasher::new();
        for shader in self.shaders.values() {
            for (_, value) in shader.parameters.iter() {
                for text in string_values(value) {
                    for token in tokens(text) {
                        h.write_str(token);
                        h.write_str(&lookup(attributes, token));
                    }
                }
            }
        }
        h.finish()
    }

    /// Returns a copy with every `${name}` token resolved.
    #[must_use]
    pub fn substituted(&self, attributes: &Dictionary) -> Self {
        let mut result = self.clone();
        for shader in result.shaders.values_mut() {
            let names: Vec<String> = shader.parameters.iter().map(|(k, _)| k.clone()).collect();
            for name in names {
                let Some(value) = shader.parameters.get(&name) else {
                    continue;
                };
                let replaced = match value {
                    Data::String(s) if !tokens(s).is_empty() => Some(Data::String(substitute(s, attributes))),
                    Data::StringVector(v) if v.iter().any(|s| !tokens(s).is_empty()) => Some(Data::StringVector(
                        v.iter().map(|s| substitute(s, attributes)).collect(),
                    )),
                    _ => None,
                };
                if let Some(replaced) = replaced {
                    shader.parameters.insert(name, replaced);
                }
            }
        }
        result
    }
}

impl ContentHash for ShaderNetwork {
    fn hash_into(&self, h: &mut ContentHasher) {
        h.write_usize(self.shaders.len());
        for (handle, shader) in &self.shaders {
            h.write_str(handle);
            shader.hash_into(h);
        }
        h.write_usize(self.connections.len());
        for c in &self.connections {
            c.source.hash_into(h);
            c.destination.hash_into(h);
        }
        self.output.hash_into(h);
    }
}

fn string_values(value: &Data) -> Box<dyn Iterator<Item = &str> + '_> {
    match value {
        Data::String(s) => Box::new(std::iter::once(s.as_str())),
        Data::StringVector(v) => Box::new(v.iter().map(String::as_str)),
        _ => Box::new(std::iter::empty()),
    }
}

/// Names of all `${name}` tokens in `text`.
fn tokens(text: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        result.push(&after[..end]);
        rest = &after[end + 1..];
    }
    result
}

fn lookup(attributes: &Dictionary, name: &str) -> String {
    let value = attributes
        .get(name)
        .or_else(|| attributes.get(&format!("user:{name}")));
    match value {
        Some(Value::Data(d)) => d.to_string(),
        _ => String::new(),
    }
}

fn substitute(text: &str, attributes: &Dictionary) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        result.push_str(&lookup(attributes, &after[..end]));
        rest = &after[end + 1..];
    }
    result.push_str(rest);
    result
}
