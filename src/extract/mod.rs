//! Pull the first fenced code block out of a chat response.

use regex::Regex;

use crate::error::{Error, Result};

/// What to do when the response carries no opening fence at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FencePolicy {
    #[default]
    Require,
    /// Forward the whole response unchanged.
    PassThrough,
}

fn fence_regex(language: &str) -> Regex {
    let pattern = format!(r"(?s)```{}(.*?)```", regex::escape(language));
    Regex::new(&pattern).expect("fence pattern built from an escaped literal")
}

/// Text strictly between the first "```<language>" and the next "```".
pub fn extract_code_block(text: &str, language: &str) -> Result<String> {
    fence_regex(language)
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| no_fence(language))
}

/// Apply `policy` on top of [`extract_code_block`]. An opening fence without
/// a closing one fails under either policy.
pub fn resolve_code(text: &str, language: &str, policy: FencePolicy) -> Result<String> {
    let opening = format!("```{language}");
    if policy == FencePolicy::PassThrough && !text.contains(&opening) {
        tracing::info!("no code fence in response, passing it through unchanged");
        return Ok(text.to_string());
    }
    extract_code_block(text, language)
}

fn no_fence(language: &str) -> Error {
    Error::NoCodeFenceFound { language: language.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_between_markers() {
        let text = "Here:\n```python\nprint(1+1)\n```\nDone";
        assert_eq!(extract_code_block(text, "python").unwrap(), "\nprint(1+1)\n");
    }

    #[test]
    fn only_first_block_is_returned() {
        let text = "a\n```python\nx = 1\n```\nb\n```python\ny = 2\n```\n";
        assert_eq!(extract_code_block(text, "python").unwrap(), "\nx = 1\n");
    }

    #[test]
    fn untagged_fence_before_tagged_is_skipped() {
        let text = "```\nplain\n```\n```python\nprint(3)\n```";
        assert_eq!(extract_code_block(text, "python").unwrap(), "\nprint(3)\n");
    }

    #[test]
    fn missing_fence_fails() {
        let err = extract_code_block("just prose", "python").unwrap_err();
        assert!(matches!(err, Error::NoCodeFenceFound { ref language } if language == "python"));
    }

    #[test]
    fn unterminated_fence_fails() {
        let text = "```python\nprint(1)\n";
        assert!(extract_code_block(text, "python").is_err());
        assert!(resolve_code(text, "python", FencePolicy::PassThrough).is_err());
    }

    #[test]
    fn language_tag_is_literal() {
        let text = "```c++\nint main() {}\n```";
        assert_eq!(extract_code_block(text, "c++").unwrap(), "\nint main() {}\n");
        assert!(extract_code_block(text, "python").is_err());
    }

    #[test]
    fn regex_metacharacters_in_tag_compile() {
        for tag in ["(", "[a-", "*", "python|js", "\\"] {
            let text = format!("```{tag}\nbody\n```");
            assert_eq!(extract_code_block(&text, tag).unwrap(), "\nbody\n");
        }
    }

    #[test]
    fn pass_through_forwards_whole_text() {
        let text = "print('no fence')";
        assert_eq!(resolve_code(text, "python", FencePolicy::PassThrough).unwrap(), text);
        assert!(resolve_code(text, "python", FencePolicy::Require).is_err());
    }

    #[test]
    fn pass_through_still_extracts_when_fenced() {
        let text = "x\n```python\nprint(1)\n```";
        assert_eq!(
            resolve_code(text, "python", FencePolicy::PassThrough).unwrap(),
            "\nprint(1)\n"
        );
    }
}
