// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use regex::RegexBuilder;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lower-cases `text`, decomposes it canonically and drops the combining
/// marks, so `Café` and `cafe` compare equal.
pub fn normalise(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Number of whitespace-delimited, non-empty segments.
pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// True when `text` contains `target` or any alias as a whole word, ignoring
/// case and diacritics. Empty forms never match.
pub fn leaks<S: AsRef<str>>(text: &str, target: &str, aliases: &[S]) -> bool {
    let haystack = normalise(text);
    std::iter::once(target)
        .chain(aliases.iter().map(AsRef::as_ref))
        .map(normalise)
        .filter(|form| !form.is_empty())
        .any(|form| contains_word(&haystack, &form))
}

fn contains_word(haystack: &str, word: &str) -> bool {
    // Boundaries are consumed rather than asserted so forms that start or end
    // with punctuation ("c++") still need a non-word neighbour.
    let pattern = format!(r"(?:^|\W){}(?:\W|$)", regex::escape(word));
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re.is_match(haystack),
        Err(e) => {
            tracing::warn!(error = %e, word, "leak pattern failed to compile, comparing word by word");
            contains_word_sequence(haystack, word)
        }
    }
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Whole-word match without a regex: the words of `word` must appear
/// consecutively among the words of `haystack`.
fn contains_word_sequence(haystack: &str, word: &str) -> bool {
    let needle = words(word);
    if needle.is_empty() {
        return false;
    }
    words(haystack)
        .windows(needle.len())
        .any(|window| window == needle.as_slice())
}
