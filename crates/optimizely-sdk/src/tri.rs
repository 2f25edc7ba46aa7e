//! Three-valued logic for the audience condition-tree evaluator.
//!
//! Kept as a first-class enum rather than an `Option<bool>` so combinator
//! code can't accidentally collapse "inconclusive" into `false` by calling
//! `.unwrap_or(false)` at the wrong boundary.

/// The outcome of evaluating one node of a condition tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tri {
    True,
    False,
    /// Inconclusive: a missing attribute, a type mismatch, or an unknown
    /// matcher/condition type. Propagates through `and`/`or` per Kleene
    /// semantics rather than being treated as `false`.
    Unknown,
}

impl Tri {
    pub fn not(self) -> Tri {
        match self {
            Tri::True => Tri::False,
            Tri::False => Tri::True,
            Tri::Unknown => Tri::Unknown,
        }
    }

    pub fn from_bool(value: bool) -> Tri {
        if value {
            Tri::True
        } else {
            Tri::False
        }
    }

    pub fn is_true(self) -> bool {
        matches!(self, Tri::True)
    }

    /// Kleene conjunction, folded left to right over a sequence of children.
    /// `and` of zero children is vacuously `true`.
    pub fn and_fold(children: impl IntoIterator<Item = Tri>) -> Tri {
        let mut saw_unknown = false;
        for child in children {
            match child {
                Tri::False => return Tri::False,
                Tri::Unknown => saw_unknown = true,
                Tri::True => {},
            }
        }
        if saw_unknown {
            Tri::Unknown
        } else {
            Tri::True
        }
    }

    /// Kleene disjunction. `or` of zero children is `false` (there is
    /// nothing to satisfy it).
    pub fn or_fold(children: impl IntoIterator<Item = Tri>) -> Tri {
        let mut saw_unknown = false;
        for child in children {
            match child {
                Tri::True => return Tri::True,
                Tri::Unknown => saw_unknown = true,
                Tri::False => {},
            }
        }
        if saw_unknown {
            Tri::Unknown
        } else {
            Tri::False
        }
    }
}
