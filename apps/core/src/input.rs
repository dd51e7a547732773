//! Input adapters that turn heterogeneous user input into plain text for the resolver.

/// Where a piece of user text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Typed into the entry line.
    Typed(String),
    /// Transcribed from the microphone.
    Spoken(String),
}

impl UserInput {
    /// The text to resolve, or `None` for blank input.
    ///
    /// The text is passed on unchanged; only the blank check looks at trimmed content.
    pub fn into_text(self) -> Option<String> {
        let text = match self {
            UserInput::Typed(text) | UserInput::Spoken(text) => text,
        };
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_is_rejected() {
        assert_eq!(UserInput::Typed(String::new()).into_text(), None);
        assert_eq!(UserInput::Typed("  \t ".to_string()).into_text(), None);
        assert_eq!(UserInput::Spoken("\n".to_string()).into_text(), None);
    }

    #[test]
    fn test_text_passes_through_unchanged() {
        assert_eq!(
            UserInput::Typed("  Snake Bite ".to_string()).into_text(),
            Some("  Snake Bite ".to_string())
        );
        assert_eq!(
            UserInput::Spoken("snake bite".to_string()).into_text(),
            Some("snake bite".to_string())
        );
    }
}
