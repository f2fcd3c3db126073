use once_cell::sync::Lazy;

use std::fmt::{self, Display, Formatter};

use crate::ir::{Classifier, IrType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Any,
    Nothing,
    Unit,
    Boolean,
    Char,
    Int,
    Long,
    Double,
    String,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 9] = [
        BuiltinType::Any,
        BuiltinType::Nothing,
        BuiltinType::Unit,
        BuiltinType::Boolean,
        BuiltinType::Char,
        BuiltinType::Int,
        BuiltinType::Long,
        BuiltinType::Double,
        BuiltinType::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::Any => "Any",
            BuiltinType::Nothing => "Nothing",
            BuiltinType::Unit => "Unit",
            BuiltinType::Boolean => "Boolean",
            BuiltinType::Char => "Char",
            BuiltinType::Int => "Int",
            BuiltinType::Long => "Long",
            BuiltinType::Double => "Double",
            BuiltinType::String => "String",
        }
    }
}

impl Display for BuiltinType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

static STANDARD: Lazy<IrBuiltIns> = Lazy::new(IrBuiltIns::new);

/// Catalog of the builtin types a backend knows about.
#[derive(Debug, Clone)]
pub struct IrBuiltIns {
    types: Vec<BuiltinType>,
}

impl Default for IrBuiltIns {
    fn default() -> Self {
        Self::new()
    }
}

impl IrBuiltIns {
    pub fn new() -> Self {
        Self::with_types(BuiltinType::ALL)
    }

    /// A catalog restricted to `types`. Unit and Nothing are always present
    /// since statements and jumps are typed with them.
    pub fn with_types(types: impl IntoIterator<Item = BuiltinType>) -> Self {
        let mut registered = vec![BuiltinType::Unit, BuiltinType::Nothing];
        for ty in types {
            if !registered.contains(&ty) {
                registered.push(ty);
            }
        }
        IrBuiltIns { types: registered }
    }

    /// The process-wide catalog with every builtin registered.
    pub fn standard() -> &'static IrBuiltIns {
        &STANDARD
    }

    pub fn contains(&self, builtin: BuiltinType) -> bool {
        self.types.contains(&builtin)
    }

    pub fn lookup(&self, name: &str) -> Option<BuiltinType> {
        self.types.iter().copied().find(|ty| ty.name() == name)
    }

    pub fn any_type(&self) -> IrType {
        IrType::builtin(BuiltinType::Any)
    }

    pub fn nothing_type(&self) -> IrType {
        IrType::builtin(BuiltinType::Nothing)
    }

    pub fn unit_type(&self) -> IrType {
        IrType::builtin(BuiltinType::Unit)
    }

    pub fn boolean_type(&self) -> IrType {
        IrType::builtin(BuiltinType::Boolean)
    }

    pub fn char_type(&self) -> IrType {
        IrType::builtin(BuiltinType::Char)
    }

    pub fn int_type(&self) -> IrType {
        IrType::builtin(BuiltinType::Int)
    }

    pub fn long_type(&self) -> IrType {
        IrType::builtin(BuiltinType::Long)
    }

    pub fn double_type(&self) -> IrType {
        IrType::builtin(BuiltinType::Double)
    }

    pub fn string_type(&self) -> IrType {
        IrType::builtin(BuiltinType::String)
    }

    /// `sub` can be used where `sup` is expected. Error types are accepted
    /// everywhere so an ill-formed type is reported once, not at every use.
    pub fn is_subtype_of(&self, sub: &IrType, sup: &IrType) -> bool {
        let (
            IrType::Simple {
                classifier: sub_classifier,
                nullable: sub_nullable,
            },
            IrType::Simple {
                classifier: sup_classifier,
                nullable: sup_nullable,
            },
        ) = (sub, sup)
        else {
            return true;
        };

        if *sub_nullable && !*sup_nullable {
            return false;
        }

        match (sub_classifier, sup_classifier) {
            (Classifier::Builtin(BuiltinType::Nothing), _) => true,
            (_, Classifier::Builtin(BuiltinType::Any)) => true,
            (sub, sup) => sub == sup,
        }
    }
}
