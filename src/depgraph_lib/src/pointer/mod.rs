//! The abstract pointer domain: byte offsets with an `UNKNOWN` sentinel,
//! pointers as (target node, offset) pairs and points-to sets.

use crate::graph::NodeId;
use crate::prelude::*;

mod points_to_set;
pub use points_to_set::*;

/// A byte offset into an abstract memory region.
///
/// Offsets are non-negative and extended with the [`Offset::UNKNOWN`]
/// sentinel representing an unresolved offset. All arithmetic is
/// UNKNOWN-absorbing: if any operand is UNKNOWN, so is the result.
#[derive(
    Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Default,
)]
pub struct Offset(u64);

impl Offset {
    /// The sentinel for an unresolved offset.
    /// It compares greater than every concrete offset.
    pub const UNKNOWN: Offset = Offset(u64::MAX);

    /// Create a concrete offset.
    /// Panics when the sentinel bit pattern is passed in directly.
    pub fn new(value: u64) -> Offset {
        assert!(value != u64::MAX, "Use Offset::UNKNOWN for unknown offsets");
        Offset(value)
    }

    /// Returns whether this is the UNKNOWN sentinel.
    pub fn is_unknown(&self) -> bool {
        *self == Offset::UNKNOWN
    }

    /// Return the concrete value or `None` for UNKNOWN.
    pub fn value(&self) -> Option<u64> {
        if self.is_unknown() {
            None
        } else {
            Some(self.0)
        }
    }

    /// UNKNOWN-absorbing addition that also saturates to UNKNOWN on overflow.
    pub fn add(self, rhs: Offset) -> Offset {
        match (self.value(), rhs.value()) {
            (Some(a), Some(b)) => match a.checked_add(b) {
                Some(sum) if sum != u64::MAX => Offset(sum),
                _ => Offset::UNKNOWN,
            },
            _ => Offset::UNKNOWN,
        }
    }

    /// Like [`Offset::add`], but additionally saturates to UNKNOWN when the
    /// result would exceed `max_offset`.
    ///
    /// The `max_offset` ceiling bounds the number of distinct concrete
    /// offsets the analysis produces per memory object, so that unbounded
    /// chains of address arithmetic cannot blow up the points-to domain.
    pub fn bounded_add(self, rhs: Offset, max_offset: u64) -> Offset {
        let sum = self.add(rhs);
        match sum.value() {
            Some(value) if value > max_offset => Offset::UNKNOWN,
            _ => sum,
        }
    }
}

impl From<u64> for Offset {
    fn from(value: u64) -> Offset {
        Offset::new(value)
    }
}

impl std::ops::Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset::add(self, rhs)
    }
}

impl std::fmt::Display for Offset {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.value() {
            Some(value) => write!(formatter, "{}", value),
            None => write!(formatter, "?"),
        }
    }
}

/// An abstract pointer: a target memory region (identified by the node that
/// created it) together with a byte offset into the region.
///
/// Three sentinel targets exist in every pointer graph: the null region,
/// the unknown memory region and the invalidated region, see
/// [`crate::graph::PointerGraph`]. A pointer into unknown memory is kept in
/// the canonical form `(UNKNOWN_NODE, UNKNOWN)`; the constructors and the
/// set operations of [`PointsToSet`] enforce this.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct Pointer {
    /// The node representing the target memory region.
    pub target: NodeId,
    /// The byte offset into the target region.
    pub offset: Offset,
}

impl Pointer {
    /// Create a pointer to the given target region.
    /// Pointers to unknown memory are canonicalized to an UNKNOWN offset.
    pub fn new(target: NodeId, offset: Offset) -> Pointer {
        if target == NodeId::UNKNOWN_NODE {
            Pointer::unknown()
        } else {
            Pointer { target, offset }
        }
    }

    /// The null pointer.
    pub fn null() -> Pointer {
        Pointer {
            target: NodeId::NULL_NODE,
            offset: Offset::new(0),
        }
    }

    /// The canonical pointer to unknown memory.
    pub fn unknown() -> Pointer {
        Pointer {
            target: NodeId::UNKNOWN_NODE,
            offset: Offset::UNKNOWN,
        }
    }

    /// The pointer to invalidated (freed or dead) memory.
    pub fn invalidated() -> Pointer {
        Pointer {
            target: NodeId::INVALIDATED_NODE,
            offset: Offset::new(0),
        }
    }

    /// Returns whether this is the null pointer.
    pub fn is_null(&self) -> bool {
        self.target == NodeId::NULL_NODE
    }

    /// Returns whether this pointer points into unknown memory.
    pub fn is_unknown(&self) -> bool {
        self.target == NodeId::UNKNOWN_NODE
    }

    /// Returns whether this pointer points into invalidated memory.
    pub fn is_invalidated(&self) -> bool {
        self.target == NodeId::INVALIDATED_NODE
    }

    /// A pointer is valid if it points to an ordinary memory region,
    /// i.e. it is neither null nor invalidated nor unknown.
    pub fn is_valid(&self) -> bool {
        !self.is_null() && !self.is_unknown() && !self.is_invalidated()
    }
}

impl std::fmt::Display for Pointer {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "({}+{})", self.target, self.offset)
    }
}
