//! Cleanup of generated text before it is persisted as an artifact.

/// Drop every line that is purely a markdown code-fence marker.
///
/// Backends frequently wrap generated code in ```` ``` ````/```` ```python ````
/// fences even when told not to. Fence-only lines are removed; everything
/// else, including indentation, is preserved verbatim.
pub fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_plain_and_language_fences() {
        let text = "```python\ndef add(a, b):\n    return a + b\n```";
        assert_eq!(strip_code_fences(text), "def add(a, b):\n    return a + b");
    }

    #[test]
    fn keeps_unfenced_text_intact() {
        let text = "def add(a, b):\n    return a + b";
        assert_eq!(strip_code_fences(text), text);
    }

    #[test]
    fn strips_indented_fence_lines() {
        let text = "def f():\n    ```\n    pass";
        assert_eq!(strip_code_fences(text), "def f():\n    pass");
    }

    #[test]
    fn keeps_inline_backticks() {
        let text = "x = \"```\" + y";
        assert_eq!(strip_code_fences(text), text);
    }
}
