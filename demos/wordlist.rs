//! Example: building a Wordlist wrapper around a DoubleArray.
//!
//! This shows how to create a convenient high-level API on top of the raw
//! lookup interface. The `Wordlist` struct wraps a `DoubleArray` and provides
//! word lookup, prefix checking, word splitting and iteration.
//!
//! Run with: cargo run --example wordlist

use libdarts::{DoubleArray, TraverseStatus};

/// A convenient wrapper around a double array for word validation.
struct Wordlist {
    trie: DoubleArray,
}

impl Wordlist {
    fn new(words: &[&str]) -> libdarts::Result<Self> {
        let trie = DoubleArray::build(words, None, None)?;
        Ok(Wordlist { trie })
    }

    /// Returns true if the word is in the wordlist.
    fn is_word(&self, word: &str) -> bool {
        self.trie.get(word.as_bytes()).is_some()
    }

    /// Returns true if any word in the wordlist starts with the given prefix.
    fn has_prefix(&self, prefix: &str) -> bool {
        self.trie.traverse_from(prefix.as_bytes(), 0, 0).status() != TraverseStatus::Mismatch
    }

    /// Returns the words that start `text` at byte `start`, shortest first.
    fn words_at<'t>(&self, text: &'t str, start: usize) -> Vec<&'t str> {
        self.trie
            .common_prefix_iter(text.as_bytes(), start)
            .map(|(_, end)| &text[start..end])
            .collect()
    }

    /// Returns all words in the wordlist.
    fn all_words(&self) -> Vec<String> {
        let mut words = Vec::new();
        let mut prefix = Vec::new();
        self.collect_words(0, &mut prefix, &mut words);
        words
    }

    fn collect_words(&self, node: usize, prefix: &mut Vec<u8>, words: &mut Vec<String>) {
        for byte in 1..=u8::MAX {
            let step = self.trie.traverse(&[byte], 0, 1, node);
            if step.status() == TraverseStatus::Mismatch {
                continue;
            }
            prefix.push(byte);
            if let TraverseStatus::Found(_) = step.status() {
                words.push(String::from_utf8_lossy(prefix).into_owned());
            }
            self.collect_words(step.node_position, prefix, words);
            prefix.pop();
        }
    }
}

fn main() {
    let words = ["BAKE", "BAKED", "BAKER", "CAKE", "CAKED", "FAKE", "LAKE"];
    let wordlist = Wordlist::new(&words).unwrap();

    // Word lookup
    println!("Word lookup:");
    for word in ["BAKE", "BAKER", "BAKES", "CAKE", "LAKE", "MAKE"] {
        println!("  {word}: {}", if wordlist.is_word(word) { "yes" } else { "no" });
    }

    // Prefix checking
    println!("\nPrefix checking:");
    for prefix in ["BA", "CAK", "MA", "FAK"] {
        println!("  {prefix}*: {}", if wordlist.has_prefix(prefix) { "yes" } else { "no" });
    }

    // Words starting at each position of a text
    let text = "XBAKERCAKED";
    println!("\nWords in {text}:");
    for start in 0..text.len() {
        for word in wordlist.words_at(text, start) {
            println!("  {start}: {word}");
        }
    }

    // List all words
    println!("\nAll words: {:?}", wordlist.all_words());
    println!("Array size: {} bytes", wordlist.trie.total_size());
}
