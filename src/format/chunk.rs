/// Telegram's cap on a single text message, in characters.
pub const TEXT_LIMIT: usize = 4096;

/// Maximal runs of whitespace as `(start, end)` char offsets.
fn whitespace_runs(chars: &[char]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut open = None;
    for (i, c) in chars.iter().enumerate() {
        match (c.is_whitespace(), open) {
            (true, None) => open = Some(i),
            (false, Some(s)) => {
                runs.push((s, i));
                open = None;
            }
            _ => {}
        }
    }
    if let Some(s) = open {
        runs.push((s, chars.len()));
    }
    runs
}

/// Split `text` into blocks of at most `limit` chars, cutting only at
/// whitespace runs. The run at a cut is dropped.
///
/// A stretch with no whitespace longer than `limit` is emitted whole, so
/// that one block may exceed the limit. Blank blocks are never produced.
pub fn split_blocks(text: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let runs = whitespace_runs(&chars);
    let mut blocks = Vec::new();
    let mut push = |from: usize, to: usize| {
        if chars[from..to].iter().any(|c| !c.is_whitespace()) {
            blocks.push(chars[from..to].iter().collect::<String>());
        }
    };

    let mut start = 0;
    let mut next = 0;
    while start < chars.len() {
        if chars.len() - start <= limit {
            push(start, chars.len());
            break;
        }

        while next < runs.len() && runs[next].0 <= start {
            next += 1;
        }
        let mut cut = None;
        let mut i = next;
        while i < runs.len() && runs[i].0 - start <= limit {
            cut = Some(i);
            i += 1;
        }
        // nothing fits: take the oversized word up to the next run
        let cut = cut.or_else(|| (next < runs.len()).then_some(next));

        match cut {
            Some(i) => {
                push(start, runs[i].0);
                start = runs[i].1;
                next = i + 1;
            }
            None => {
                push(start, chars.len());
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
    fn short_text_is_one_block() {
        assert_eq!(split_blocks("hello world", 4096), vec!["hello world"]);
        assert!(split_blocks("", 4096).is_empty());
    }

    #[test]
    fn cuts_at_last_whitespace_within_limit() {
        assert_eq!(
            split_blocks("aaa bbb ccc ddd", 8),
            vec!["aaa bbb", "ccc ddd"]
        );
        assert_eq!(split_blocks("aaaa\n\n  bbbb", 5), vec!["aaaa", "bbbb"]);
    }

    #[test]
    fn no_block_exceeds_limit_and_words_survive() {
        let words: Vec<String> = (0..2000).map(|i| format!("word{i}")).collect();
        let text = words.join(" ");
        let blocks = split_blocks(&text, 100);
        assert!(blocks.len() > 1);
        for b in &blocks {
            assert!(b.chars().count() <= 100, "block too long: {}", b.len());
        }
        assert_eq!(blocks.join(" "), text);
    }

    #[test]
    fn limit_is_counted_in_chars() {
        let text = format!("{} {}", "я".repeat(6), "ж".repeat(6));
        assert_eq!(split_blocks(&text, 8), vec!["я".repeat(6), "ж".repeat(6)]);
        assert_eq!(split_blocks(&text, 13), vec![text.clone()]);
    }

    #[test]
    fn oversized_run_is_kept_whole() {
        let long = "x".repeat(30);
        let text = format!("ab {long} cd");
        assert_eq!(split_blocks(&text, 10), vec!["ab".to_string(), long, "cd".to_string()]);
    }

    #[test]
    fn oversized_tail_without_whitespace() {
        let long = "y".repeat(25);
        assert_eq!(split_blocks(&long, 10), vec![long.clone()]);
    }

    #[test]
    fn escapes_are_never_split() {
        let text = "\\.\\. ".repeat(50);
        for b in split_blocks(&text, 17) {
            assert!(!b.ends_with('\\'));
            assert!(!b.starts_with('.'));
        }
    }
}
