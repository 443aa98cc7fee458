//! Extraction of `forthel` environments from a marked-up source file.
//!
//! Only text between `\begin{forthel}` and `\end{forthel}` participates in
//! checking; surrounding prose and preamble are presentation-only and are
//! dropped here.

const BEGIN: &str = "\\begin{forthel}";
const END: &str = "\\end{forthel}";

/// Extract the contents of every `forthel` environment, in document order,
/// trimmed. An unterminated final environment is taken to run to the end of
/// the document.
pub fn extract_forthel_blocks(document: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut rest = document;
    while let Some(start) = rest.find(BEGIN) {
        let after = &rest[start + BEGIN.len()..];
        match after.find(END) {
            Some(end) => {
                blocks.push(after[..end].trim().to_string());
                rest = &after[end + END.len()..];
            }
            None => {
                blocks.push(after.trim().to_string());
                break;
            }
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_blocks_in_order() {
        let doc = "\
\\documentclass{article}
\\begin{document}
\\begin{forthel}
Every set is a class.
\\end{forthel}
Some prose.
\\begin{forthel}
[read lib.ftl.tex]
\\end{forthel}
\\end{document}";
        let blocks = extract_forthel_blocks(doc);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], "Every set is a class.");
        assert_eq!(blocks[1], "[read lib.ftl.tex]");
    }

    #[test]
    fn no_blocks_in_plain_document() {
        assert!(extract_forthel_blocks("no environments here").is_empty());
    }

    #[test]
    fn unterminated_block_runs_to_end() {
        let blocks = extract_forthel_blocks("\\begin{forthel}\nTail text.");
        assert_eq!(blocks, vec!["Tail text.".to_string()]);
    }
}
