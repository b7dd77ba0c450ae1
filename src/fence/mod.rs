//! Code-fence stripping for free-text model output.
//!
//! Two passes over the lines of the response: locate the first opening fence
//! (three backticks at line start, optionally followed by a language tag), then
//! take the last bare fence line after it as the close. Anything fenced in
//! between, tagged or not, belongs to the generated source. A reply whose final
//! line ends in backticks (`st.title("x")```) is closed on that line.

const FENCE: &str = "```";

/// Return the inner content of the first fenced block, trimmed. Text without an
/// opening fence is returned trimmed and otherwise unchanged.
pub fn strip_code_fences(raw: &str) -> String {
    let text = raw.trim();
    let Some(body_start) = find_opening_fence(text) else {
        return text.to_string();
    };
    let body = &text[body_start..];
    let inner = match find_closing_fence(body) {
        Some(end) => &body[..end],
        None => match body.trim_end().strip_suffix(FENCE) {
            Some(head) => head,
            // Truncated output: keep everything after the opener.
            None => body,
        },
    };
    inner.trim().to_string()
}

/// Byte offset just past the opening fence line, if there is one.
fn find_opening_fence(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if let Some(tag) = line.trim().strip_prefix(FENCE) {
            if is_language_tag(tag) {
                return Some(offset + line.len());
            }
        }
        offset += line.len();
    }
    None
}

/// Byte offset of the start of the last bare fence line.
fn find_closing_fence(body: &str) -> Option<usize> {
    let mut offset = 0;
    let mut close = None;
    for line in body.split_inclusive('\n') {
        if line.trim() == FENCE {
            close = Some(offset);
        }
        offset += line.len();
    }
    close
}

fn is_language_tag(tag: &str) -> bool {
    let tag = tag.trim();
    !tag.contains('`') && !tag.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODE: &str = "import streamlit as st\n\nst.title(\"Cafe\")";

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_code_fences(CODE), CODE);
        assert_eq!(strip_code_fences(&format!("\n\n  {CODE}  \n")), CODE);
    }

    #[test]
    fn stripping_is_idempotent() {
        let once = strip_code_fences(&format!("```python\n{CODE}\n```"));
        assert_eq!(strip_code_fences(&once), once);
    }

    #[test]
    fn language_tagged_fence() {
        assert_eq!(strip_code_fences(&format!("```python\n{CODE}\n```")), CODE);
    }

    #[test]
    fn untagged_fence() {
        assert_eq!(strip_code_fences(&format!("```\n{CODE}\n```")), CODE);
    }

    #[test]
    fn whitespace_around_fenced_block() {
        let raw = format!("  \n\n```python  \n\n{CODE}\n\n```  \n\n");
        assert_eq!(strip_code_fences(&raw), CODE);
    }

    #[test]
    fn prose_around_the_block_is_dropped() {
        let raw = format!("Here is your app:\n```python\n{CODE}\n```\nRun it with streamlit.");
        assert_eq!(strip_code_fences(&raw), CODE);
    }

    #[test]
    fn nested_tagged_block_inside_source_is_kept() {
        let body = "HELP = \"\"\"\n```bash\nstreamlit run app.py\n```\n\"\"\"\nst.markdown(HELP)";
        let raw = format!("```python\n{body}\n```");
        assert_eq!(strip_code_fences(&raw), body);
    }

    #[test]
    fn inline_backticks_are_content() {
        let body = "st.markdown(\"use ``` for code\")";
        assert_eq!(strip_code_fences(&format!("```\n{body}\n```")), body);
    }

    #[test]
    fn unterminated_fence_keeps_the_tail() {
        assert_eq!(strip_code_fences(&format!("```python\n{CODE}\n")), CODE);
    }

    #[test]
    fn nested_untagged_block_inside_source_is_kept() {
        let body = "HELP = \"\"\"\n```\nstreamlit run app.py\n```\n\"\"\"\nst.markdown(HELP)";
        let raw = format!("```python\n{body}\n```");
        assert_eq!(strip_code_fences(&raw), body);
    }

    #[test]
    fn close_on_the_last_code_line() {
        let raw = "```python\nimport streamlit as st\nst.title(\"x\")```";
        assert_eq!(strip_code_fences(raw), "import streamlit as st\nst.title(\"x\")");
        assert_eq!(strip_code_fences(&format!("{raw}\n\n")), "import streamlit as st\nst.title(\"x\")");
    }

    #[test]
    fn empty_block_yields_empty_text() {
        assert_eq!(strip_code_fences("```python\n```"), "");
        assert_eq!(strip_code_fences("```\n\n```"), "");
    }

    #[test]
    fn single_line_fence_is_not_an_opener() {
        let raw = "```python print(1)```";
        assert_eq!(strip_code_fences(raw), raw);
    }
}
