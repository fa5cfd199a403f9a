//! Type descriptors and the universe that owns them.
//!
//! Parameter types are described as an explicit graph of `TypeDescriptor`
//! nodes held in an arena and addressed by `TypeId`. Identity-based
//! addressing is what makes self-referential types representable: a
//! composite's constructor parameter may name the composite's own id, and
//! the resolver memoizes per id to terminate on such cycles.

use crate::unit::Constructor;
use std::fmt;

/// Identity of a descriptor within one `TypeUniverse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub usize);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type#{}", self.0)
    }
}

/// Identity of a registered constructor within one `TypeUniverse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstructorId(pub usize);

/// The fixed set of elementary kinds the primitive strategy provider must
/// understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Integer,
    Float,
    Boolean,
    Text,
    ByteSequence,
    Date,
    Time,
    DateTime,
    Duration,
    Rational,
    NoneType,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Text => "text",
            PrimitiveKind::ByteSequence => "byte-sequence",
            PrimitiveKind::Date => "date",
            PrimitiveKind::Time => "time",
            PrimitiveKind::DateTime => "datetime",
            PrimitiveKind::Duration => "duration",
            PrimitiveKind::Rational => "rational",
            PrimitiveKind::NoneType => "none",
        };
        write!(f, "{}", name)
    }
}

/// Semantic description of a declared parameter type.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Enumeration {
        name: String,
        members: Vec<String>,
    },
    Union(Vec<TypeId>),
    Sequence(TypeId),
    SetOf(TypeId),
    Mapping(TypeId, TypeId),
    Tuple(Vec<TypeId>),
    Optional(TypeId),
    /// User-defined composite type built through its registered constructor.
    Composite {
        name: String,
        constructor: ConstructorId,
    },
    /// Abstract type, resolvable only through its known concrete
    /// implementers.
    Abstract {
        name: String,
        implementers: Vec<TypeId>,
    },
    /// Generic type variable, optionally constrained to a bound type. The
    /// chosen concrete type is fixed per session across all uses of the
    /// same variable name.
    TypeVar {
        name: String,
        bound: Option<TypeId>,
    },
}

impl TypeDescriptor {
    /// Human-readable name used in resolution errors.
    pub fn name(&self) -> String {
        match self {
            TypeDescriptor::Primitive(kind) => kind.to_string(),
            TypeDescriptor::Enumeration { name, .. } => name.clone(),
            TypeDescriptor::Union(_) => "union".to_string(),
            TypeDescriptor::Sequence(_) => "sequence".to_string(),
            TypeDescriptor::SetOf(_) => "set".to_string(),
            TypeDescriptor::Mapping(_, _) => "mapping".to_string(),
            TypeDescriptor::Tuple(_) => "tuple".to_string(),
            TypeDescriptor::Optional(_) => "optional".to_string(),
            TypeDescriptor::Composite { name, .. } => name.clone(),
            TypeDescriptor::Abstract { name, .. } => name.clone(),
            TypeDescriptor::TypeVar { name, .. } => name.clone(),
        }
    }
}

/// Arena of type descriptors plus the constructor registry.
///
/// Descriptors may be declared first and defined later, which is how a
/// cycle is introduced: declare the composite's id, register a constructor
/// whose parameter refers to that id, then define the composite.
#[derive(Default)]
pub struct TypeUniverse {
    descriptors: Vec<Option<TypeDescriptor>>,
    constructors: Vec<Constructor>,
}

impl TypeUniverse {
    pub fn new() -> Self {
        TypeUniverse::default()
    }

    /// Intern a fully-formed descriptor.
    pub fn intern(&mut self, descriptor: TypeDescriptor) -> TypeId {
        self.descriptors.push(Some(descriptor));
        TypeId(self.descriptors.len() - 1)
    }

    pub fn primitive(&mut self, kind: PrimitiveKind) -> TypeId {
        self.intern(TypeDescriptor::Primitive(kind))
    }

    /// Reserve an id for a descriptor defined later (forward reference).
    pub fn declare(&mut self) -> TypeId {
        self.descriptors.push(None);
        TypeId(self.descriptors.len() - 1)
    }

    /// Fill in a previously declared id.
    pub fn define(&mut self, id: TypeId, descriptor: TypeDescriptor) {
        self.descriptors[id.0] = Some(descriptor);
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.descriptors.get(id.0).and_then(|d| d.as_ref())
    }

    pub fn register_constructor(&mut self, constructor: Constructor) -> ConstructorId {
        self.constructors.push(constructor);
        ConstructorId(self.constructors.len() - 1)
    }

    pub fn constructor(&self, id: ConstructorId) -> &Constructor {
        &self.constructors[id.0]
    }

    /// Shorthand: register a constructor and intern the composite that
    /// uses it, in one step.
    pub fn composite(&mut self, constructor: Constructor) -> TypeId {
        let name = constructor.type_name.clone();
        let cid = self.register_constructor(constructor);
        self.intern(TypeDescriptor::Composite {
            name,
            constructor: cid,
        })
    }
}
