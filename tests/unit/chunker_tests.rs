/*!
 * Property tests for line-boundary chunking
 */

use proptest::prelude::*;
use txtsum::summary::{Chunk, chunk, join_chunks};

/// Text of arbitrary lines, including empty lines and multi-byte characters
fn text_strategy() -> impl Strategy<Value = String> {
    (prop::collection::vec("[ab é字.-]{0,150}", 0..30), any::<bool>())
        .prop_map(|(lines, trailing_newline)| {
            let mut text = lines.join("\n");
            if trailing_newline {
                text.push('\n');
            }
            text
        })
}

fn check_invariants(text: &str, max: usize, chunks: &[Chunk]) {
    assert_eq!(join_chunks(chunks), text, "round trip failed for max {}", max);

    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.index, i, "indices must be contiguous from 0");
        assert_eq!(c.char_len, c.text.chars().count());
        if c.oversized {
            assert!(!c.text.contains('\n'), "an oversized chunk holds a single line");
            assert!(c.char_len > max);
        } else {
            assert!(c.char_len <= max, "chunk {} has {} chars, max {}", i, c.char_len, max);
        }
    }
}

proptest! {
    #[test]
    fn test_chunk_arbitraryTexts_shouldHoldAllInvariants(text in text_strategy(), max in 1usize..200) {
        let chunks = chunk(&text, max);

        if text.is_empty() {
            prop_assert!(chunks.is_empty());
        } else {
            check_invariants(&text, max, &chunks);
        }
    }

    #[test]
    fn test_chunk_textWithinLimit_shouldBeSingleIdenticalChunk(text in text_strategy(), slack in 0usize..10) {
        prop_assume!(!text.is_empty());
        let max = text.chars().count() + slack;
        let chunks = chunk(&text, max);

        prop_assert_eq!(chunks.len(), 1);
        prop_assert_eq!(&chunks[0].text, &text);
        prop_assert!(!chunks[0].oversized);
    }
}

#[test]
fn test_chunk_threeLineScenario_shouldBeOneChunk() {
    let text = "Line1\nLine2\nLine3\n";
    let chunks = chunk(text, 100);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, text);
}

#[test]
fn test_chunk_250CharsAt100_shouldYieldAtLeastThreeChunks() {
    // Ten lines of 24 chars joined by newlines: 249 chars
    let text = (0..10).map(|i| format!("{:02} ---------------------", i)).collect::<Vec<_>>().join("\n");
    let text = format!("{}x", text);
    assert_eq!(text.chars().count(), 250);

    let chunks = chunk(&text, 100);
    assert!(chunks.len() >= 3);
    check_invariants(&text, 100, &chunks);
    assert!(chunks.iter().all(|c| !c.oversized));
}

#[test]
fn test_chunk_shouldSplitOnlyAtLineBoundaries() {
    let text = "alpha beta gamma\ndelta epsilon\nzeta eta theta iota";
    let lines: Vec<&str> = text.lines().collect();

    for c in chunk(text, 20) {
        for line in c.text.split('\n') {
            assert!(lines.contains(&line), "'{}' is not a whole input line", line);
        }
    }
}
