//! `InvertedIndex` (spec.md §4.5.c): tokenizes attribute text through a
//! [`TokenizationPipeline`], storing `token -> Set<Key>` postings and
//! `key -> {tokens, documentLength}`. Retrieval cost 50.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::attribute::Attribute;
use crate::predicate::{Op, Operand};
use crate::result_set::ResultSet;
use crate::value::{Stringify, Value};

use super::tokenize::TokenizationPipeline;
use super::{Index, IndexKind, IndexStats};

const RETRIEVAL_COST: u32 = 50;

struct DocumentEntry {
    tokens: Vec<String>,
    document_length: usize,
}

/// Text index supporting `contains`, `containsAll`, `containsAny`, `has`.
pub struct InvertedIndex {
    attribute: Box<dyn Attribute>,
    pipeline: TokenizationPipeline,
    postings: BTreeMap<String, BTreeSet<String>>,
    documents: HashMap<String, DocumentEntry>,
}

impl InvertedIndex {
    #[must_use]
    pub fn new(attribute: Box<dyn Attribute>, pipeline: TokenizationPipeline) -> Self {
        Self { attribute, pipeline, postings: BTreeMap::new(), documents: HashMap::new() }
    }

    /// The number of documents (keys) indexed under `token`, for external
    /// BM25 scoring (spec.md §4.5.c, §9).
    #[must_use]
    pub fn token_document_count(&self, token: &str) -> usize {
        self.postings.get(token).map_or(0, BTreeSet::len)
    }

    fn text_of(&self, record: &Value) -> String {
        self.attribute
            .extract_many(record)
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.stringify(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn index_document(&mut self, key: &str, tokens: Vec<String>) {
        if tokens.is_empty() {
            return;
        }
        let document_length = tokens.len();
        for token in &tokens {
            self.postings.entry(token.clone()).or_default().insert(key.to_string());
        }
        self.documents.insert(key.to_string(), DocumentEntry { tokens, document_length });
    }

    fn deindex_document(&mut self, key: &str) {
        if let Some(entry) = self.documents.remove(key) {
            for token in &entry.tokens {
                if let Some(postings) = self.postings.get_mut(token) {
                    postings.remove(key);
                    if postings.is_empty() {
                        self.postings.remove(token);
                    }
                }
            }
        }
    }

    /// Intersects posting lists for each query token, walking from the
    /// rarest token first to minimize work (spec.md §4.5.c).
    fn and_intersect(&self, tokens: &[String]) -> BTreeSet<String> {
        let mut lists: Vec<&BTreeSet<String>> =
            tokens.iter().filter_map(|t| self.postings.get(t)).collect();
        if lists.len() != tokens.len() {
            // A query token with no postings makes AND intersection empty.
            return BTreeSet::new();
        }
        lists.sort_by_key(|l| l.len());
        let Some((first, rest)) = lists.split_first() else { return BTreeSet::new() };
        let mut acc: BTreeSet<String> = (*first).clone();
        for list in rest {
            acc = acc.intersection(list).cloned().collect();
            if acc.is_empty() {
                break;
            }
        }
        acc
    }
}

impl Index for InvertedIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Inverted
    }

    fn attribute(&self) -> &str {
        self.attribute.name()
    }

    fn supports_query(&self, op: Op) -> bool {
        matches!(op, Op::Contains | Op::ContainsAll | Op::ContainsAny | Op::Has)
    }

    fn retrieval_cost(&self) -> u32 {
        RETRIEVAL_COST
    }

    fn add(&mut self, key: &str, record: &Value) {
        let text = self.text_of(record);
        if text.is_empty() {
            return;
        }
        let tokens = self.pipeline.run(&text);
        self.index_document(key, tokens);
    }

    fn update(&mut self, key: &str, old: &Value, new: &Value) {
        let old_text = self.text_of(old);
        let new_text = self.text_of(new);
        if old_text == new_text {
            return;
        }
        self.deindex_document(key);
        self.add(key, new);
    }

    fn remove(&mut self, key: &str, _record: &Value) {
        self.deindex_document(key);
    }

    fn clear(&mut self) {
        self.postings.clear();
        self.documents.clear();
    }

    fn retrieve(&self, op: Op, operand: &Operand) -> ResultSet {
        match (op, operand) {
            (Op::Contains, Operand::Text(query)) => {
                let tokens = self.pipeline.run(query);
                ResultSet::materialized(self.and_intersect(&tokens))
            }
            (Op::ContainsAll, Operand::Values(values)) => {
                let tokens: Vec<String> =
                    values.iter().map(|v| if let Value::String(s) = v { s.clone() } else { v.stringify() }).collect();
                ResultSet::materialized(self.and_intersect(&tokens))
            }
            (Op::ContainsAny, Operand::Values(values)) => {
                let mut out = BTreeSet::new();
                for v in values {
                    let token = if let Value::String(s) = v { s.clone() } else { v.stringify() };
                    if let Some(postings) = self.postings.get(&token) {
                        out.extend(postings.iter().cloned());
                    }
                }
                ResultSet::materialized(out)
            }
            (Op::Has, _) => ResultSet::materialized(self.documents.keys().cloned().collect()),
            _ => ResultSet::empty(),
        }
    }

    fn stats(&self) -> IndexStats {
        let total_entries: usize = self.postings.values().map(BTreeSet::len).sum();
        IndexStats::compute(self.postings.len(), total_entries)
    }
}
