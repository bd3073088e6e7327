/// A single sum type used uniformly for partial updates and optional filters.
///
/// Using one `Unset | Set(T)` vocabulary everywhere a field may be "not provided"
/// avoids the pointer-or-null-plus-in-band-zero ambiguity the original service's
/// partial-update handling suffered from ("is 0 a value or an omission?").
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Unset,
    Set(T),
}

impl<T> Patch<T> {
    /// Returns `true` if no value was provided.
    pub fn is_unset(&self) -> bool {
        matches!(self, Patch::Unset)
    }

    /// Returns `true` if a value was provided.
    pub fn is_set(&self) -> bool {
        matches!(self, Patch::Set(_))
    }

    /// Converts to a standard [`Option`].
    pub fn into_option(self) -> Option<T> {
        match self {
            Patch::Unset => None,
            Patch::Set(value) => Some(value),
        }
    }

    /// Borrows the contained value, if any.
    pub fn as_ref(&self) -> Patch<&T> {
        match self {
            Patch::Unset => Patch::Unset,
            Patch::Set(value) => Patch::Set(value),
        }
    }

    /// Maps the contained value, if any.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Unset => Patch::Unset,
            Patch::Set(value) => Patch::Set(f(value)),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Patch::Set(value),
            None => Patch::Unset,
        }
    }
}

impl<T> From<Patch<T>> for Option<T> {
    fn from(value: Patch<T>) -> Self {
        value.into_option()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_round_trips_through_option() {
        let patch: Patch<u32> = None.into();
        assert!(patch.is_unset());
        assert_eq!(Option::<u32>::from(patch), None);
    }

    #[test]
    fn set_round_trips_through_option() {
        let patch: Patch<u32> = Some(7).into();
        assert!(patch.is_set());
        assert_eq!(Option::<u32>::from(patch), Some(7));
    }
}
