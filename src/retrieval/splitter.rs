//! Boundary-aware text splitter.
//!
//! Produces overlapping windows of roughly `chunk_size` characters, breaking
//! preferentially at paragraph boundaries, then lines, then words, and only
//! as a last resort mid-word. Overlap carries trailing pieces of one window
//! into the head of the next so context survives the cut.

/// Separators tried in order of preference. The empty string means
/// "split into individual characters".
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Split `text` into overlapping chunks.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chunks = split_recursive(text, chunk_size, overlap, SEPARATORS);
    chunks
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

fn split_recursive(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    let (separator, rest) = match separators.split_first() {
        Some((first, rest)) => (*first, rest),
        None => return vec![text.to_string()],
    };

    let pieces: Vec<String> = if separator.is_empty() {
        text.chars().map(|c| c.to_string()).collect()
    } else {
        text.split(separator).map(|p| p.to_string()).collect()
    };

    // Pieces still longer than the window get split again at the next
    // preferred boundary before merging.
    let mut atoms = Vec::new();
    for piece in pieces {
        if char_len(&piece) > chunk_size && !rest.is_empty() {
            atoms.extend(split_recursive(&piece, chunk_size, overlap, rest));
        } else {
            atoms.push(piece);
        }
    }

    merge_pieces(atoms, separator, chunk_size, overlap)
}

/// Merge small pieces into windows of at most `chunk_size` characters,
/// carrying the trailing `overlap` characters into the next window.
fn merge_pieces(
    pieces: Vec<String>,
    separator: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;

    for piece in pieces {
        let piece_len = char_len(&piece);
        if piece_len == 0 {
            continue;
        }

        let projected = current_len + piece_len + if current.is_empty() { 0 } else { sep_len };
        if projected > chunk_size && !current.is_empty() {
            chunks.push(current.join(separator));

            // Drop leading pieces until what remains fits in the overlap.
            while current_len > overlap
                || (current_len + piece_len + sep_len > chunk_size && !current.is_empty())
            {
                let removed = current.remove(0);
                current_len -= char_len(&removed);
                if !current.is_empty() {
                    current_len = current_len.saturating_sub(sep_len);
                }
                if current.is_empty() {
                    current_len = 0;
                    break;
                }
            }
        }

        current_len += piece_len + if current.is_empty() { 0 } else { sep_len };
        current.push(piece);
    }

    if !current.is_empty() {
        chunks.push(current.join(separator));
    }

    chunks
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_text("hello world", 500, 50);
        assert_eq!(chunks, vec!["hello world"]);
    }

    #[test]
    fn splits_on_paragraph_boundaries_first() {
        let para_a = "a".repeat(300);
        let para_b = "b".repeat(300);
        let text = format!("{para_a}\n\n{para_b}");
        let chunks = split_text(&text, 500, 50);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], para_a);
        assert_eq!(chunks[1], para_b);
    }

    #[test]
    fn chunks_respect_size_limit() {
        let words: Vec<String> = (0..200).map(|i| format!("word{i}")).collect();
        let text = words.join(" ");
        let chunks = split_text(&text, 100, 20);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100, "chunk too long: {chunk}");
        }
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let words: Vec<String> = (0..50).map(|i| format!("w{i:03}")).collect();
        let text = words.join(" ");
        let chunks = split_text(&text, 60, 20);
        assert!(chunks.len() > 1);
        // The tail of each chunk reappears at the head of the next.
        for pair in chunks.windows(2) {
            let tail_word = pair[0].split_whitespace().last().unwrap();
            assert!(
                pair[1].contains(tail_word),
                "no overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text("", 500, 50).is_empty());
        assert!(split_text("  \n\n  ", 500, 50).is_empty());
    }

    #[test]
    fn unbroken_run_is_hard_split() {
        let text = "x".repeat(1200);
        let chunks = split_text(&text, 500, 50);
        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 500);
        }
    }
}
