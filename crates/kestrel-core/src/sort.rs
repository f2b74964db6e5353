/// Term sorts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sort {
    Bool,
    Int,
    Real,
    /// An uninterpreted sort, identified by name.
    Uninterpreted(String),
}

impl Sort {
    pub fn uninterpreted(name: impl Into<String>) -> Self {
        Sort::Uninterpreted(name.into())
    }

    /// Int or Real.
    pub fn is_arith(&self) -> bool {
        matches!(self, Sort::Int | Sort::Real)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Sort::Int)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Sort::Bool)
    }
}

impl std::fmt::Display for Sort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::Real => write!(f, "Real"),
            Sort::Uninterpreted(name) => write!(f, "{name}"),
        }
    }
}
