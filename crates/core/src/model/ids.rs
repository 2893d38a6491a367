use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error returned when an id cannot be parsed from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

/// Integer newtype ids: `new`/`value`, `Debug` as `Name(n)`, `Display` as the
/// bare number and `FromStr` from decimal text.
macro_rules! int_id {
    ($(#[$doc:meta])* $name:ident($repr:ty)) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name($repr);

        impl $name {
            #[must_use]
            pub fn new(id: $repr) -> Self {
                Self(id)
            }

            #[must_use]
            pub fn value(&self) -> $repr {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<$repr>().map(Self).map_err(|_| ParseIdError {
                    kind: stringify!($name),
                })
            }
        }
    };
}

int_id!(
    /// A word in the vocabulary catalogue.
    WordId(u64)
);
int_id!(
    /// A course grouping lessons.
    CourseId(u64)
);
int_id!(
    /// A lesson within a course.
    LessonId(u64)
);
int_id!(
    /// A question, unique within one practice session.
    QuestionId(u32)
);

/// Identifier of a practice session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random session id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(SessionId::from_uuid)
            .map_err(|_| ParseIdError { kind: "SessionId" })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_id_display() {
        let id = WordId::new(42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_word_id_from_str() {
        let id: WordId = "123".parse().unwrap();
        assert_eq!(id, WordId::new(123));
    }

    #[test]
    fn test_word_id_from_str_invalid() {
        let result = "not-a-number".parse::<WordId>();
        assert!(result.is_err());
    }

    #[test]
    fn test_course_and_lesson_ids_parse() {
        assert_eq!("7".parse::<CourseId>().unwrap(), CourseId::new(7));
        assert_eq!("12".parse::<LessonId>().unwrap(), LessonId::new(12));
        assert!("-1".parse::<LessonId>().is_err());
    }

    #[test]
    fn test_session_id_round_trips_through_string() {
        let id = SessionId::generate();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_question_id_debug() {
        assert_eq!(format!("{:?}", QuestionId::new(3)), "QuestionId(3)");
    }

    #[test]
    fn test_parse_error_names_the_id_kind() {
        let err = "x".parse::<QuestionId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse QuestionId from string");
        assert!("4294967296".parse::<QuestionId>().is_err());
        assert_eq!(format!("{:?}", WordId::new(8)), "WordId(8)");
    }
}
