//! Type and method identities
//!
//! Interception needs to name the things it matches against without runtime
//! reflection. Types and methods are described by plain data: a method is an
//! opaque comparable key (declaring type, name, parameter types), and a type
//! lists its ancestors, interfaces and attributes.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// ============================================================================
// Names
// ============================================================================

/// Name of an interface or type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(Cow<'static, str>);

impl InterfaceId {
    /// Create an interface id
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        InterfaceId(name.into())
    }

    /// Get the name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for InterfaceId {
    fn from(name: &'static str) -> Self {
        InterfaceId(Cow::Borrowed(name))
    }
}

impl From<String> for InterfaceId {
    fn from(name: String) -> Self {
        InterfaceId(Cow::Owned(name))
    }
}

/// Marker attached to a type or method, consumed by attribute matchers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute(Cow<'static, str>);

impl Attribute {
    /// Create an attribute
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Attribute(name.into())
    }

    /// Get the attribute name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

impl From<&'static str> for Attribute {
    fn from(name: &'static str) -> Self {
        Attribute(Cow::Borrowed(name))
    }
}

// ============================================================================
// Types
// ============================================================================

/// Shared handle to a type descriptor
pub type TypeRef = Arc<TypeDescriptor>;

/// Description of a target type
///
/// Equality and hashing cover the whole shape, so two descriptors with the
/// same name but different ancestors or attributes are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    name: InterfaceId,
    /// Ancestor types, nearest first
    supertypes: Vec<InterfaceId>,
    interfaces: Vec<InterfaceId>,
    attributes: Vec<Attribute>,
}

impl TypeDescriptor {
    /// Create a descriptor with no ancestors, interfaces or attributes
    pub fn new(name: impl Into<InterfaceId>) -> Self {
        TypeDescriptor {
            name: name.into(),
            supertypes: Vec::new(),
            interfaces: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Add an ancestor type
    pub fn with_supertype(mut self, supertype: impl Into<InterfaceId>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    /// Add an implemented interface
    pub fn with_interface(mut self, interface: impl Into<InterfaceId>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, attribute: impl Into<Attribute>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    /// Finish building and share the descriptor
    pub fn into_ref(self) -> TypeRef {
        Arc::new(self)
    }

    /// Type name
    pub fn name(&self) -> &InterfaceId {
        &self.name
    }

    /// Ancestor types, nearest first
    pub fn supertypes(&self) -> &[InterfaceId] {
        &self.supertypes
    }

    /// Implemented interfaces
    pub fn interfaces(&self) -> &[InterfaceId] {
        &self.interfaces
    }

    /// Attributes on the type
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Check if the type implements an interface directly
    pub fn implements_interface(&self, interface: &InterfaceId) -> bool {
        self.interfaces.contains(interface)
    }

    /// Check if the type carries an attribute
    pub fn has_attribute(&self, attribute: &Attribute) -> bool {
        self.attributes.contains(attribute)
    }

    /// Check if a value of this type can be used where `other` is expected
    pub fn is_assignable_to(&self, other: &InterfaceId) -> bool {
        &self.name == other || self.supertypes.contains(other) || self.interfaces.contains(other)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ============================================================================
// Methods
// ============================================================================

/// Shared handle to a method
pub type MethodRef = Arc<Method>;

/// Identity of a method
///
/// Equality and hashing use the declaring type, the name and the parameter
/// type names. Attributes are carried for matchers but are not part of the
/// identity.
#[derive(Debug, Clone)]
pub struct Method {
    declaring_type: InterfaceId,
    name: Cow<'static, str>,
    parameters: Vec<Cow<'static, str>>,
    attributes: Vec<Attribute>,
}

impl Method {
    /// Create a parameterless method
    pub fn new(declaring_type: impl Into<InterfaceId>, name: impl Into<Cow<'static, str>>) -> Self {
        Method {
            declaring_type: declaring_type.into(),
            name: name.into(),
            parameters: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Set the parameter type names
    pub fn with_parameters<I, P>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Cow<'static, str>>,
    {
        self.parameters = parameters.into_iter().map(Into::into).collect();
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, attribute: impl Into<Attribute>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    /// Finish building and share the method
    pub fn into_ref(self) -> MethodRef {
        Arc::new(self)
    }

    /// Interface or type that declares the method
    pub fn declaring_type(&self) -> &InterfaceId {
        &self.declaring_type
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter type names
    pub fn parameters(&self) -> &[Cow<'static, str>] {
        &self.parameters
    }

    /// Attributes on the method
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Check if the method carries an attribute
    pub fn has_attribute(&self, attribute: &Attribute) -> bool {
        self.attributes.contains(attribute)
    }

    /// `Declaring.Name`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.declaring_type, self.name)
    }
}

impl PartialEq for Method {
    fn eq(&self, other: &Self) -> bool {
        self.declaring_type == other.declaring_type
            && self.name == other.name
            && self.parameters == other.parameters
    }
}

impl Eq for Method {}

impl Hash for Method {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring_type.hash(state);
        self.name.hash(state);
        self.parameters.hash(state);
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.declaring_type, self.name)?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_method_identity_ignores_attributes() {
        let plain = Method::new("IStore", "Load").with_parameters(["string"]);
        let tagged = Method::new("IStore", "Load")
            .with_parameters(["string"])
            .with_attribute("Cache");
        assert_eq!(plain, tagged);

        let mut set = FxHashSet::default();
        set.insert(plain);
        assert!(set.contains(&tagged));
    }

    #[test]
    fn test_method_overloads_are_distinct() {
        let a = Method::new("IStore", "Load").with_parameters(["string"]);
        let b = Method::new("IStore", "Load").with_parameters(["string", "int"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_method_display() {
        let m = Method::new("IStore", "Save").with_parameters(["string", "int"]);
        assert_eq!(m.to_string(), "IStore.Save(string, int)");
        assert_eq!(m.full_name(), "IStore.Save");
    }

    #[test]
    fn test_type_assignability() {
        let ty = TypeDescriptor::new("FileStore")
            .with_supertype("BaseStore")
            .with_interface("IStore");
        assert!(ty.is_assignable_to(&"FileStore".into()));
        assert!(ty.is_assignable_to(&"BaseStore".into()));
        assert!(ty.is_assignable_to(&"IStore".into()));
        assert!(!ty.is_assignable_to(&"ICache".into()));
        assert!(ty.implements_interface(&"IStore".into()));
        assert!(!ty.implements_interface(&"BaseStore".into()));
    }

    #[test]
    fn test_type_identity_covers_shape() {
        let plain = TypeDescriptor::new("Store");
        let audited = TypeDescriptor::new("Store").with_attribute("Audited");
        assert_ne!(plain, audited);

        let mut set = FxHashSet::default();
        set.insert(plain.clone());
        assert!(set.contains(&TypeDescriptor::new("Store")));
        assert!(!set.contains(&audited));
    }

    #[test]
    fn test_type_attributes() {
        let ty = TypeDescriptor::new("Repo").with_attribute("Transactional");
        assert!(ty.has_attribute(&Attribute::from("Transactional")));
        assert!(!ty.has_attribute(&Attribute::from("Cached")));
    }
}
