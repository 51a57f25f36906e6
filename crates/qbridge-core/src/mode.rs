/// The five+one query execution modes (design §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Submit,
    Redirect,
    Async,
    Direct,
    Mutation,
    Batch,
}

impl Mode {
    /// Parses a single-character path-segment mode tag (`s`, `r`, `a`, `d`,
    /// `m`, `b`). Per design §9's path-parsing open question, this tag
    /// takes precedence over a qid that happens to start with the same
    /// letter — callers must only call this on the *first* path segment.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "s" => Some(Self::Submit),
            "r" => Some(Self::Redirect),
            "a" => Some(Self::Async),
            "d" => Some(Self::Direct),
            "m" => Some(Self::Mutation),
            "b" => Some(Self::Batch),
            _ => None,
        }
    }

    pub const fn tag(self) -> &'static str {
        match self {
            Self::Submit => "s",
            Self::Redirect => "r",
            Self::Async => "a",
            Self::Direct => "d",
            Self::Mutation => "m",
            Self::Batch => "b",
        }
    }

    /// Whether requests in this mode must pass the ACL check (design
    /// §4.6: all modes except `SUBMIT`/`REDIRECT` are auth'd).
    pub const fn requires_auth(self) -> bool {
        !matches!(self, Self::Submit | Self::Redirect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_tag() {
        for mode in [Mode::Submit, Mode::Redirect, Mode::Async, Mode::Direct, Mode::Mutation, Mode::Batch] {
            assert_eq!(Mode::from_tag(mode.tag()), Some(mode));
        }
    }

    #[test]
    fn unknown_tag_is_none() {
        assert_eq!(Mode::from_tag("x"), None);
    }
}
