use std::fmt;

use super::{EnumId, MessageId, ServiceId};

/// One of the built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ScalarType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

/// Anything a field may refer to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// A built-in scalar type.
    Scalar(ScalarType),
    /// A message type.
    Message(MessageId),
    /// An enum type.
    Enum(EnumId),
    /// A `map<K, V>` type.
    Map(Box<MapType>),
}

/// The key and value types of a map field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapType {
    /// The key type, always an integral, bool or string scalar.
    pub key: ScalarType,
    /// The value type, never itself a map.
    pub value: Type,
}

/// A declaration registered under a fully-qualified name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum UserType {
    Message(MessageId),
    Enum(EnumId),
    Service(ServiceId),
}

impl ScalarType {
    /// Every scalar type, in declaration order.
    pub const ALL: [ScalarType; 15] = [
        ScalarType::Double,
        ScalarType::Float,
        ScalarType::Int32,
        ScalarType::Int64,
        ScalarType::Uint32,
        ScalarType::Uint64,
        ScalarType::Sint32,
        ScalarType::Sint64,
        ScalarType::Fixed32,
        ScalarType::Fixed64,
        ScalarType::Sfixed32,
        ScalarType::Sfixed64,
        ScalarType::Bool,
        ScalarType::String,
        ScalarType::Bytes,
    ];

    /// The keyword used to declare a field of this type.
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Double => "double",
            ScalarType::Float => "float",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Uint32 => "uint32",
            ScalarType::Uint64 => "uint64",
            ScalarType::Sint32 => "sint32",
            ScalarType::Sint64 => "sint64",
            ScalarType::Fixed32 => "fixed32",
            ScalarType::Fixed64 => "fixed64",
            ScalarType::Sfixed32 => "sfixed32",
            ScalarType::Sfixed64 => "sfixed64",
            ScalarType::Bool => "bool",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
        }
    }

    /// Looks up a scalar type by its keyword.
    pub fn from_name(name: &str) -> Option<Self> {
        ScalarType::ALL.iter().copied().find(|ty| ty.name() == name)
    }

    /// Whether this type may be used as the key of a map field.
    pub fn is_valid_map_key(self) -> bool {
        !matches!(
            self,
            ScalarType::Double | ScalarType::Float | ScalarType::Bytes
        )
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl UserType {
    /// A short description of the kind of declaration, for error messages.
    pub fn kind(self) -> &'static str {
        match self {
            UserType::Message(_) => "message",
            UserType::Enum(_) => "enum",
            UserType::Service(_) => "service",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_names_round_trip() {
        for ty in ScalarType::ALL {
            assert_eq!(ScalarType::from_name(ty.name()), Some(ty));
        }
        assert_eq!(ScalarType::from_name("Int32"), None);
        assert_eq!(ScalarType::from_name("message"), None);
    }

    #[test]
    fn map_keys() {
        assert!(ScalarType::String.is_valid_map_key());
        assert!(ScalarType::Sfixed64.is_valid_map_key());
        assert!(ScalarType::Bool.is_valid_map_key());
        assert!(!ScalarType::Bytes.is_valid_map_key());
        assert!(!ScalarType::Double.is_valid_map_key());
    }
}
