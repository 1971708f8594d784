//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Persisted records (roles, identities) keep their identifier across every
/// update; stores key on it and never reassign it.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
