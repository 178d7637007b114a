//! Type resolution
//!
//! Flattens derivation chains in the [`TypeRegistry`]. A type deriving from
//! several bases (a union) resolves to several candidates, one per resolved
//! base, and callers try them in order until one fits.

use std::fmt;

use super::attributes::{AttributeDef, AttributeSet};
use super::builtins::BuiltinType;
use super::complex_types::{ChildContent, ComplexType};
use super::elements::{ElementDef, ElementSet, ResolvedElement};
use super::globals::TypeDef;
use super::schemas::TypeRegistry;
use super::simple_types::SimpleBase;
use crate::error::{Error, ParseError, Result, ValidationError, ValidationErrorKind};
use crate::namespaces::QName;
use crate::values::TypedValue;

/// One fully resolved candidate of a type
///
/// Content and attributes are the result of overlaying every derivation step
/// from the root of the chain down to the requested type.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcreteType {
    /// Name of the type that was resolved
    pub name: QName,
    /// Effective element content
    pub content: ChildContent,
    /// Effective attributes
    pub attributes: AttributeSet,
    /// Undeclared attributes are accepted
    pub any_attributes: bool,
    /// Character content is allowed between children
    pub mixed: bool,
}

impl ConcreteType {
    fn from_def(name: &QName, def: &TypeDef) -> Self {
        match def {
            TypeDef::Complex(complex) => Self {
                name: name.clone(),
                content: complex.content.clone(),
                attributes: complex.attributes.clone(),
                any_attributes: complex.any_attributes,
                mixed: complex.mixed,
            },
            TypeDef::BuiltIn(_) | TypeDef::Simple(_) => Self {
                name: name.clone(),
                content: ChildContent::Empty,
                attributes: AttributeSet::new(),
                any_attributes: false,
                mixed: false,
            },
        }
    }

    /// Overlay a derived type onto this resolved base
    fn derive(mut self, name: &QName, derived: &TypeDef) -> Self {
        self.name = name.clone();
        let TypeDef::Complex(derived) = derived else {
            // Simple types carry no content of their own
            self.attributes.clear();
            return self;
        };

        if derived.is_restriction {
            self.content = derived.content.clone();
            self.attributes = derived.attributes.clone();
            self.any_attributes = derived.any_attributes;
            self.mixed = derived.mixed;
        } else {
            self.content = merge_content(self.content, &derived.content);
            self.attributes.extend(
                derived
                    .attributes
                    .iter()
                    .map(|(name, def)| (name.clone(), def.clone())),
            );
            self.any_attributes |= derived.any_attributes;
            self.mixed |= derived.mixed;
        }
        self
    }

    /// Declared member elements, if any
    pub fn children(&self) -> Option<&ElementSet> {
        self.content.elements()
    }

    /// Whether a wildcard is declared
    pub fn any_children(&self) -> bool {
        self.content.has_wildcard()
    }

    /// Array-ness of the wildcard
    pub fn array_hint(&self) -> Option<bool> {
        match self.content {
            ChildContent::Wildcard { is_array, .. } => is_array,
            _ => None,
        }
    }
}

/// Extension: base members first, derived members win on collision
fn merge_content(base: ChildContent, derived: &ChildContent) -> ChildContent {
    match (base, derived) {
        (ChildContent::Empty, derived) => derived.clone(),
        (base, ChildContent::Empty) => base,
        (base, derived) => {
            let wildcard = match (&base, derived) {
                (_, ChildContent::Wildcard { is_array, .. })
                | (ChildContent::Wildcard { is_array, .. }, _) => Some(*is_array),
                _ => None,
            };
            let mut declared = base.elements().cloned().unwrap_or_default();
            if let Some(own) = derived.elements() {
                declared.extend(own.iter().map(|(name, def)| (name.clone(), def.clone())));
            }
            match wildcard {
                Some(is_array) => ChildContent::Wildcard { is_array, declared },
                None => ChildContent::Elements(declared),
            }
        }
    }
}

/// A coercion step for scalar content
#[derive(Debug, Clone, PartialEq)]
pub enum Coercer {
    /// Coerce with a built-in type
    Builtin(&'static BuiltinType),
    /// Split on whitespace and coerce each item with the first fitting candidate
    List(Vec<Coercer>),
}

impl Coercer {
    /// Coerce lexical content
    pub fn coerce(&self, text: &str) -> Result<TypedValue> {
        match self {
            Coercer::Builtin(builtin) => builtin.coerce(text),
            Coercer::List(items) => text
                .split_whitespace()
                .map(|item| try_parse(items, item))
                .collect::<Result<Vec<_>>>()
                .map(TypedValue::Array),
        }
    }
}

impl fmt::Display for Coercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coercer::Builtin(builtin) => write!(f, "xs:{}", builtin.name),
            Coercer::List(items) => {
                let names: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "list of ({})", names.join(" | "))
            }
        }
    }
}

/// Try each candidate in order and return the first success
///
/// When every candidate fails, the error of the last one is returned.
pub fn try_parse(candidates: &[Coercer], text: &str) -> Result<TypedValue> {
    let mut last_error = None;
    for candidate in candidates {
        match candidate.coerce(text) {
            Ok(value) => return Ok(value),
            Err(err) => last_error = Some(err),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        Error::Validation(ValidationError::coercion(format!(
            "no coercion available for '{}'",
            text
        )))
    }))
}

/// Element declarations visible at one level of a document
#[derive(Debug, Clone, PartialEq)]
pub enum ElementScope {
    /// Global elements of the registry
    Global,
    /// Members declared by a content model
    Declared(ElementSet),
    /// A wildcard: declared members, then any global element
    Wildcard {
        /// Members declared next to the wildcard
        declared: ElementSet,
        /// Array-ness of the wildcard
        is_array: Option<bool>,
    },
}

impl ElementScope {
    /// Look up an element by qualified name
    pub fn get<'a>(&'a self, registry: &'a TypeRegistry, name: &QName) -> Option<&'a ElementDef> {
        match self {
            ElementScope::Global => registry.lookup_element(name),
            ElementScope::Declared(set) => set.get(name),
            ElementScope::Wildcard { declared, .. } => declared
                .get(name)
                .or_else(|| registry.lookup_element(name)),
        }
    }

    /// Names allowed in this scope, for diagnostics
    pub fn describe(&self, registry: &TypeRegistry) -> String {
        let names = |set: &ElementSet| {
            set.keys()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            ElementScope::Global => format!("global elements: [{}]", names(registry.elements())),
            ElementScope::Declared(set) => format!("allowed elements: [{}]", names(set)),
            ElementScope::Wildcard { declared, .. } => {
                format!("any element, declared: [{}]", names(declared))
            }
        }
    }
}

fn circular(name: &QName) -> Error {
    Error::InvalidSchema(ParseError::new(format!("circular derivation of type {}", name)))
}

impl TypeRegistry {
    /// Resolve a type into its ordered list of concrete candidates
    pub fn resolve_type(&self, name: &QName) -> Result<Vec<ConcreteType>> {
        self.resolve_type_inner(name, &mut Vec::new())
    }

    fn resolve_type_inner<'a>(
        &'a self,
        name: &'a QName,
        path: &mut Vec<&'a QName>,
    ) -> Result<Vec<ConcreteType>> {
        if path.contains(&name) {
            return Err(circular(name));
        }
        let def = self.get_type(name)?;
        let bases = def.bases();
        if bases.is_empty() {
            return Ok(vec![ConcreteType::from_def(name, def)]);
        }

        path.push(name);
        let mut resolved = Vec::new();
        for base in bases {
            for candidate in self.resolve_type_inner(base, path)? {
                resolved.push(candidate.derive(name, def));
            }
        }
        path.pop();
        Ok(resolved)
    }

    /// Follow element references down to a definition
    ///
    /// The array default nearest to the definition applies, and only when
    /// the definition itself leaves array-ness unset.
    pub fn resolve_element(&self, def: &ElementDef) -> Result<ResolvedElement> {
        let mut current = def;
        let mut array_default = None;
        let mut hops = 0;
        loop {
            match current {
                ElementDef::Reference {
                    target,
                    array_default: default,
                } => {
                    if default.is_some() {
                        array_default = *default;
                    }
                    hops += 1;
                    if hops > self.element_count() {
                        return Err(Error::InvalidSchema(ParseError::new(format!(
                            "circular reference of element {}",
                            target
                        ))));
                    }
                    current = self.get_element(target)?;
                }
                ElementDef::Definition { type_name, is_array } => {
                    return Ok(ResolvedElement {
                        type_name: type_name.clone(),
                        is_array: is_array.or(array_default),
                    });
                }
            }
        }
    }

    /// Follow attribute references down to the attribute's type name
    pub fn resolve_attribute_type(&self, def: &AttributeDef) -> Result<QName> {
        let mut current = def;
        let mut hops = 0;
        loop {
            match current {
                AttributeDef::Typed { type_name } => return Ok(type_name.clone()),
                AttributeDef::Reference { target } => {
                    hops += 1;
                    if hops > self.attribute_count() {
                        return Err(Error::InvalidSchema(ParseError::new(format!(
                            "circular reference of attribute {}",
                            target
                        ))));
                    }
                    current = self.get_attribute(target)?;
                }
            }
        }
    }

    /// Collect the coercions along a type's base chain
    ///
    /// Empty for structured types. Union members keep their declared order.
    pub fn resolve_to_parse(&self, name: &QName) -> Result<Vec<Coercer>> {
        self.resolve_to_parse_inner(name, &mut Vec::new())
    }

    fn resolve_to_parse_inner<'a>(
        &'a self,
        name: &'a QName,
        path: &mut Vec<&'a QName>,
    ) -> Result<Vec<Coercer>> {
        if path.contains(&name) {
            return Err(circular(name));
        }
        let def = self.get_type(name)?;
        path.push(name);
        let coercers = match def {
            TypeDef::BuiltIn(builtin) => vec![Coercer::Builtin(builtin)],
            TypeDef::Simple(simple) => match &simple.base {
                SimpleBase::Restriction(base) => self.resolve_to_parse_inner(base, path)?,
                SimpleBase::Union(members) => {
                    let mut all = Vec::new();
                    for member in members {
                        all.extend(self.resolve_to_parse_inner(member, path)?);
                    }
                    all
                }
                SimpleBase::List(item) => {
                    vec![Coercer::List(self.resolve_to_parse_inner(item, path)?)]
                }
            },
            TypeDef::Complex(ComplexType { base: Some(base), .. }) => {
                self.resolve_to_parse_inner(base, path)?
            }
            TypeDef::Complex(_) => Vec::new(),
        };
        path.pop();
        Ok(coercers)
    }

    /// Attributes a type declares itself; empty for simple types
    pub fn resolve_to_attributes(&self, name: &QName) -> Result<AttributeSet> {
        match self.get_type(name)? {
            TypeDef::Complex(complex) => Ok(complex.attributes.clone()),
            _ => Ok(AttributeSet::new()),
        }
    }

    /// Element scope of the first candidate that admits children
    pub fn try_children(&self, candidates: &[ConcreteType]) -> Result<ElementScope> {
        for candidate in candidates {
            match &candidate.content {
                ChildContent::Wildcard { is_array, declared } => {
                    return Ok(ElementScope::Wildcard {
                        declared: declared.clone(),
                        is_array: *is_array,
                    });
                }
                ChildContent::Elements(set) => return Ok(ElementScope::Declared(set.clone())),
                ChildContent::Empty => {}
            }
        }
        let names: Vec<String> = candidates.iter().map(|c| c.name.to_string()).collect();
        Err(Error::Validation(
            ValidationError::new(
                ValidationErrorKind::TypeHasNoChildren,
                "type does not expect children",
            )
            .with_schema_component(format!("candidates: [{}]", names.join(", "))),
        ))
    }
}
