use crate::models::RankedHit;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "so", "to", "of", "in", "on", "for", "with", "as", "at",
    "by", "is", "are", "was", "were", "be", "been", "being", "do", "does", "did", "why", "what",
    "how", "when", "where", "which", "who", "this", "that", "these", "those", "it", "we", "you",
    "i", "they", "can", "could", "should", "would", "may", "might",
];

const MAX_QUERY_TERMS: usize = 8;

/// Reduces a free-text question to a lexical query: lowercased, punctuation
/// stripped, stopwords and short tokens dropped, capped at eight distinct
/// terms. Falls back to the trimmed question when nothing survives.
pub fn keywordize(question: &str) -> String {
    let cleaned: String = question
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();

    let mut terms: Vec<&str> = Vec::new();
    for token in cleaned.split_whitespace() {
        if token.len() < 3 || STOPWORDS.contains(&token) || terms.contains(&token) {
            continue;
        }
        terms.push(token);
        if terms.len() >= MAX_QUERY_TERMS {
            break;
        }
    }

    if terms.is_empty() {
        question.trim().to_string()
    } else {
        terms.join(" ")
    }
}

/// Builds the grounding prompt: numbered context blocks headed by
/// `filename • page_ref`, then the lecture-companion instructions and the
/// question.
pub fn build_prompt(question: &str, contexts: &[RankedHit]) -> String {
    let context_block = if contexts.is_empty() {
        "(No context found.)".to_string()
    } else {
        contexts
            .iter()
            .enumerate()
            .map(|(index, hit)| {
                let reference = match &hit.page_ref {
                    Some(page_ref) => format!("{} \u{2022} {}", hit.filename, page_ref),
                    None => hit.filename.clone(),
                };
                format!("[{}] {}\n{}\n", index + 1, reference, hit.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are a lecture companion. Answer the student's question using ONLY the provided \
context when possible.\nIf context is insufficient, say so and then give a brief general \
explanation.\n\nReturn Markdown with sections:\n- TL;DR (2-3 lines)\n- Explanation\n- Example \
(if helpful)\n- Sources (list the bracket numbers you used, e.g., [1], [2])\n\nQuestion:\n\
{question}\n\nContext:\n{context_block}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provenance;
    use uuid::Uuid;

    fn ranked(filename: &str, page_ref: Option<&str>, text: &str) -> RankedHit {
        RankedHit {
            chunk_id: Uuid::new_v4(),
            resource_id: Uuid::new_v4(),
            filename: filename.to_string(),
            page_ref: page_ref.map(str::to_string),
            text: text.to_string(),
            rank: 0.5,
            provenance: Provenance::Both,
        }
    }

    #[test]
    fn keywordize_drops_stopwords_and_short_tokens() {
        assert_eq!(
            keywordize("Why is the TLB important for virtual memory?"),
            "tlb important virtual memory"
        );
    }

    #[test]
    fn keywordize_deduplicates_and_caps_terms() {
        let question = "cache cache lines lines associativity replacement eviction \
                        prefetching bandwidth latency throughput";
        let query = keywordize(question);
        let terms: Vec<&str> = query.split(' ').collect();
        assert_eq!(terms.len(), 8);
        assert_eq!(terms[0], "cache");
        assert_eq!(terms[1], "lines");
    }

    #[test]
    fn keywordize_falls_back_to_the_question() {
        assert_eq!(keywordize("why is it so"), "why is it so");
    }

    #[test]
    fn prompt_numbers_contexts_with_references() {
        let contexts = vec![
            ranked("lecture1.pdf", Some("page 3"), "Paging splits memory."),
            ranked("slides.pptx", None, "The TLB caches translations."),
        ];
        let prompt = build_prompt("How does paging work?", &contexts);
        assert!(prompt.contains("[1] lecture1.pdf \u{2022} page 3"));
        assert!(prompt.contains("[2] slides.pptx\n"));
        assert!(prompt.contains("How does paging work?"));
    }

    #[test]
    fn prompt_without_context_says_so() {
        let prompt = build_prompt("Anything?", &[]);
        assert!(prompt.contains("(No context found.)"));
    }
}
