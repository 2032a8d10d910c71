//! Prompt assembly.
//!
//! Every upstream call carries a single synthetic user turn whose text is
//! built here. Conversation history travels inline as a transcript, not as
//! separate message objects, so the wire shape stays identical across chat,
//! document and image calls.

use crate::session::Turn;

/// Standing instruction prepended to every user-facing prompt.
pub const SYSTEM_PROMPT: &str = "You are Claude, an AI assistant that is helpful, honest, and direct.
Please format your responses using proper Markdown syntax following these guidelines:

- Use # for main headings
- Use ## for subheadings
- Use bullet points (- or *) for lists
- Use numbered lists (1. 2. 3.) for sequential items
- Use **bold** for emphasis
- Use `code blocks` for code or technical terms
- Use > for quotations
- Use --- for horizontal rules to separate sections
- Use tables when presenting structured data
- Use proper spacing between sections for better readability

Always structure your responses with clear headings and organized sections when appropriate.";

/// Chat prompt: system instruction, optional transcript, then the new input.
pub fn chat_prompt(history: &[Turn], input: &str) -> String {
    if history.is_empty() {
        return format!("{SYSTEM_PROMPT}\n\nUser: {input}");
    }

    let transcript = history
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.text))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{SYSTEM_PROMPT}\n\nPrevious conversation:\n{transcript}\n\nUser: {input}")
}

/// Per-chunk summarization prompt. Carries no system instruction and no
/// history; `index` is 1-based.
pub fn summary_prompt(index: usize, total: usize, chunk: &str) -> String {
    format!("Summarize this part ({index}/{total}) of the document: {chunk}")
}

/// Join part summaries for the final pass. Each part ends with a blank line,
/// including the last.
pub fn join_summaries(summaries: &[String]) -> String {
    let mut joined = String::new();
    for summary in summaries {
        joined.push_str(summary);
        joined.push_str("\n\n");
    }
    joined
}

/// Final prompt over the combined summaries of a multi-chunk document.
pub fn final_prompt(summaries: &str, query: &str) -> String {
    format!(
        "{SYSTEM_PROMPT}\n\nContext (summarized from a larger document):\n{summaries}\n\nQuestion: {query}"
    )
}

/// Direct prompt over a document that fits a single chunk.
pub fn direct_prompt(content: &str, query: &str) -> String {
    format!("{SYSTEM_PROMPT}\n\nContext:\n{content}\n\nQuestion: {query}")
}

/// Text half of an image question. The image itself travels as a separate
/// content block.
pub fn image_prompt(query: &str) -> String {
    format!("{SYSTEM_PROMPT}\n\nAnalyze this image and answer the following question: {query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_prompt_without_history() {
        let prompt = chat_prompt(&[], "hello there");
        assert_eq!(prompt, format!("{SYSTEM_PROMPT}\n\nUser: hello there"));
    }

    #[test]
    fn chat_prompt_inlines_the_transcript() {
        let history = vec![Turn::user("first question"), Turn::assistant("first answer")];
        let prompt = chat_prompt(&history, "second question");
        assert_eq!(
            prompt,
            format!(
                "{SYSTEM_PROMPT}\n\nPrevious conversation:\nUser: first question\nAssistant: first answer\n\nUser: second question"
            )
        );
    }

    #[test]
    fn summary_prompt_is_one_based() {
        assert_eq!(
            summary_prompt(1, 3, "chunk body"),
            "Summarize this part (1/3) of the document: chunk body"
        );
    }

    #[test]
    fn summary_prompt_carries_no_system_instruction() {
        assert!(!summary_prompt(2, 2, "x").contains(SYSTEM_PROMPT));
    }

    #[test]
    fn joined_summaries_keep_the_trailing_separator() {
        let joined = join_summaries(&["part one".to_string(), "part two".to_string()]);
        assert_eq!(joined, "part one\n\npart two\n\n");
    }

    #[test]
    fn final_prompt_shape() {
        let prompt = final_prompt("s1\n\ns2\n\n", "what is this about");
        assert_eq!(
            prompt,
            format!(
                "{SYSTEM_PROMPT}\n\nContext (summarized from a larger document):\ns1\n\ns2\n\n\n\nQuestion: what is this about"
            )
        );
    }

    #[test]
    fn direct_prompt_shape() {
        let prompt = direct_prompt("small document", "what is this");
        assert_eq!(
            prompt,
            format!("{SYSTEM_PROMPT}\n\nContext:\nsmall document\n\nQuestion: what is this")
        );
    }

    #[test]
    fn image_prompt_shape() {
        let prompt = image_prompt("what is pictured");
        assert_eq!(
            prompt,
            format!("{SYSTEM_PROMPT}\n\nAnalyze this image and answer the following question: what is pictured")
        );
    }
}
