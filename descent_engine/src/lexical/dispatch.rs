//! First-character dispatch table

use super::first_chars::{leading_chars, CharSet};
use crate::tokens::{CategoryId, TokenModel};

const NON_ASCII_BUCKET: usize = 128;

/// Maps a leading character to the ordered candidate categories that can match there
#[derive(Debug, Clone)]
pub struct DispatchTable {
    buckets: Vec<Vec<CategoryId>>,
}

/// Result of trying to build a dispatch table
#[derive(Debug)]
pub enum DispatchBuild {
    Ready(DispatchTable),
    /// Names of categories whose leading characters could not be derived
    Unavailable(Vec<String>),
}

impl DispatchTable {
    /// Build from the model's concrete categories, keeping registration order per bucket
    pub fn build(model: &TokenModel) -> DispatchBuild {
        let mut buckets = vec![Vec::new(); NON_ASCII_BUCKET + 1];
        let mut underivable = Vec::new();

        for category in model.concrete_categories() {
            let Some(set) = leading_chars(category) else {
                underivable.push(category.name().to_string());
                continue;
            };
            Self::fill(&mut buckets, category.id(), &set);
        }

        if underivable.is_empty() {
            DispatchBuild::Ready(Self { buckets })
        } else {
            DispatchBuild::Unavailable(underivable)
        }
    }

    fn fill(buckets: &mut [Vec<CategoryId>], id: CategoryId, set: &CharSet) {
        for ch in set.ascii_chars() {
            buckets[ch as usize].push(id);
        }
        if set.has_non_ascii() {
            buckets[NON_ASCII_BUCKET].push(id);
        }
    }

    /// Candidate categories for input starting with `ch`
    pub fn candidates(&self, ch: char) -> &[CategoryId] {
        let bucket = if ch.is_ascii() {
            ch as usize
        } else {
            NON_ASCII_BUCKET
        };
        &self.buckets[bucket]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{Group, TokenPattern};

    #[test]
    fn test_buckets_keep_registration_order() {
        let mut model = TokenModel::new();
        let ident = model
            .define_category("Identifier", None, TokenPattern::regex("[a-z]+"), Group::Normal)
            .unwrap();
        let keyword = model
            .define_category("Let", None, TokenPattern::literal("let"), Group::Normal)
            .unwrap();
        let number = model
            .define_category("Number", None, TokenPattern::regex("[0-9]+"), Group::Normal)
            .unwrap();

        let DispatchBuild::Ready(table) = DispatchTable::build(&model) else {
            panic!("table should build");
        };

        assert_eq!(table.candidates('l'), &[ident, keyword]);
        assert_eq!(table.candidates('q'), &[ident]);
        assert_eq!(table.candidates('7'), &[number]);
        assert!(table.candidates('#').is_empty());
        assert!(table.candidates('λ').is_empty());
    }

    #[test]
    fn test_custom_pattern_without_hint_is_unavailable() {
        let mut model = TokenModel::new();
        model
            .define_category(
                "Anything",
                None,
                TokenPattern::custom(|rest: &str| rest.chars().next().map(char::len_utf8)),
                Group::Normal,
            )
            .unwrap();

        match DispatchTable::build(&model) {
            DispatchBuild::Unavailable(names) => assert_eq!(names, vec!["Anything"]),
            DispatchBuild::Ready(_) => panic!("custom matcher has no leading characters"),
        }
    }

    #[test]
    fn test_explicit_leading_chars_enable_dispatch() {
        let mut model = TokenModel::new();
        let custom = model
            .define_category(
                "Hash",
                None,
                TokenPattern::custom(|rest: &str| rest.starts_with('#').then_some(1)),
                Group::Normal,
            )
            .unwrap();
        model.set_leading_chars(custom, &['#']).unwrap();

        let DispatchBuild::Ready(table) = DispatchTable::build(&model) else {
            panic!("explicit leading characters should make the table buildable");
        };
        assert_eq!(table.candidates('#'), &[custom]);
    }
}
