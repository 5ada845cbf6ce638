//! Greeting request and response records.
//!
//! The requested name is untrusted input that subscribers may render as
//! HTML, so it is escaped before it is placed in the greeting content.

use serde::{Deserialize, Serialize};

use super::html::html_escape;

/// Inbound greeting request sent to `/app/hello`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloMessage {
    /// Name to greet. Arbitrary text, possibly markup.
    pub name: String,
}

impl HelloMessage {
    /// Creates a request for the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Outbound greeting published to `/topic/greetings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeting {
    /// Rendered greeting text, safe to embed in HTML.
    pub content: String,
}

impl Greeting {
    /// Builds `"Hello, " + html_escape(name) + "!"`.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        Self {
            content: format!("Hello, {}!", html_escape(name)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn greets_plain_name() {
        assert_eq!(Greeting::for_name("Spring").content, "Hello, Spring!");
    }

    #[test]
    fn accented_name_uses_entity_references() {
        assert_eq!(Greeting::for_name("José").content, "Hello, Jos&eacute;!");
        assert_eq!(Greeting::for_name("Zoë 5€").content, "Hello, Zo&euml; 5&euro;!");
    }

    #[test]
    fn script_tag_is_neutralized() {
        let greeting = Greeting::for_name("<script>");
        assert_eq!(greeting.content, "Hello, &lt;script&gt;!");
        assert!(!greeting.content.contains("<script>"));
    }

    #[test]
    fn escapes_ampersand_and_quotes() {
        assert_eq!(
            Greeting::for_name(r#"Tom & "Jerry""#).content,
            "Hello, Tom &amp; &quot;Jerry&quot;!"
        );
    }

    #[test]
    fn empty_name_still_greets() {
        assert_eq!(Greeting::for_name("").content, "Hello, !");
    }

    #[test]
    fn wire_shapes_match_field_names() {
        let Ok(json) = serde_json::to_string(&Greeting::for_name("a")) else {
            panic!("greeting serializes");
        };
        assert_eq!(json, r#"{"content":"Hello, a!"}"#);

        let parsed: Result<HelloMessage, _> = serde_json::from_str(r#"{"name":"Spring"}"#);
        assert!(matches!(parsed, Ok(msg) if msg.name == "Spring"));
    }
}
