use std::borrow::Cow;

const DBL_QUOTE: char = '"';
const UNDERSCORE: char = '_';

#[inline]
fn all_allowed(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == UNDERSCORE)
}

/// Distinguishes which part of a qualified [`Ident`] is being quoted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IdentPart {
    Schema,
    Object,
}

/// A SQL identifier, optionally schema-qualified, that quotes itself only when
/// necessary.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ident<'a>(Option<&'a str>, &'a str);

impl<'a> Ident<'a> {
    /// Creates a new unqualified identifier.
    pub const fn unqualified(name: &'a str) -> Self {
        Self(None, name)
    }

    /// Creates a new schema-qualified identifier.
    pub const fn qualified(schema: &'a str, name: &'a str) -> Self {
        Self(Some(schema), name)
    }

    /// The object name, unquoted.
    pub fn name(&self) -> &str {
        self.1
    }

    /// Returns the fully quoted identifier, e.g. `dbo."My Table"`.
    pub fn quote(&self) -> Cow<'a, str> {
        match self.0 {
            Some(schema) => Cow::Owned(format!("{}.{}", quote_part(schema), quote_part(self.1))),
            None => quote_part(self.1),
        }
    }

    /// Returns a single quoted part of the identifier, if present.
    pub fn quote_part(&self, part: IdentPart) -> Option<Cow<'a, str>> {
        match part {
            IdentPart::Schema => self.0.map(quote_part),
            IdentPart::Object => Some(quote_part(self.1)),
        }
    }
}

fn quote_part(text: &str) -> Cow<'_, str> {
    if all_allowed(text) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{DBL_QUOTE}{text}{DBL_QUOTE}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("dbo"), "banner", "dbo.banner")]
    #[case(Some("dbo"), "My Table", "dbo.\"My Table\"")]
    #[case(None, "banner", "banner")]
    #[case(None, "My Table", "\"My Table\"")]
    fn identifier_is_quoted_only_when_needed(
        #[case] schema: Option<&str>,
        #[case] name: &str,
        #[case] expected: &str,
    ) {
        let ident = match schema {
            Some(schema) => Ident::qualified(schema, name),
            None => Ident::unqualified(name),
        };

        assert_eq!(ident.quote(), expected);
    }

    #[test]
    fn unqualified_identifier_has_no_schema_part() {
        let ident = Ident::unqualified("banner");
        assert_eq!(ident.quote_part(IdentPart::Schema), None);
    }
}
