//! Structural merge of one container into another.

use json_joy_json_text::{DuplicatePropertyHandling, KeyComparison, Primitive};
use tracing::debug;

use crate::document::Document;
use crate::error::{TreeError, TreeResult};
use crate::node::{NodeData, NodeId, NodeKind};

/// How source array elements combine with the target's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeArrayHandling {
    /// Append every source element.
    #[default]
    Concat,
    /// Append source elements not already present (by deep equality).
    Union,
    /// Swap the target's elements for the source's.
    Replace,
    /// Merge element-wise by position, appending any surplus.
    Merge,
}

/// Whether a null source value overwrites the target's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeNullValueHandling {
    #[default]
    Ignore,
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeSettings {
    pub array_handling: MergeArrayHandling,
    pub null_handling: MergeNullValueHandling,
    /// Comparison used to match source property names against the target.
    pub property_name_comparison: KeyComparison,
}

fn is_null(doc: &Document, id: NodeId) -> bool {
    matches!(doc.value(id), Some(Primitive::Null | Primitive::Undefined))
}

impl Document {
    /// Merge `source` into `target`. Both must be containers of the same
    /// kind. `source` is copied first, so merging a node with itself or
    /// with one of its own descendants is safe.
    pub fn merge(
        &mut self,
        target: NodeId,
        source: NodeId,
        settings: &MergeSettings,
    ) -> TreeResult<()> {
        self.check_mergeable(target, self.kind(source)?)?;
        let snapshot = self.clone_node(source)?;
        self.merge_snapshot(target, snapshot, settings)
    }

    /// Merge a container owned by another document into `target`.
    pub fn merge_from(
        &mut self,
        target: NodeId,
        other: &Document,
        source: NodeId,
        settings: &MergeSettings,
    ) -> TreeResult<()> {
        self.check_mergeable(target, other.kind(source)?)?;
        let snapshot = self.import(other, source)?;
        self.merge_snapshot(target, snapshot, settings)
    }

    fn check_mergeable(&self, target: NodeId, source_kind: NodeKind) -> TreeResult<()> {
        let target_kind = self.kind(target)?;
        if !target_kind.is_container() || target_kind != source_kind {
            return Err(TreeError::MergeKindMismatch {
                target_kind,
                source_kind,
            });
        }
        Ok(())
    }

    fn merge_snapshot(
        &mut self,
        target: NodeId,
        snapshot: NodeId,
        settings: &MergeSettings,
    ) -> TreeResult<()> {
        let result = self.merge_nodes(target, snapshot, settings);
        self.delete(snapshot)?;
        debug!(
            target = %target,
            arrays = ?settings.array_handling,
            nulls = ?settings.null_handling,
            ok = result.is_ok(),
            "merged"
        );
        result
    }

    fn merge_nodes(
        &mut self,
        target: NodeId,
        source: NodeId,
        settings: &MergeSettings,
    ) -> TreeResult<()> {
        match self.kind(target)? {
            NodeKind::Object => self.merge_objects(target, source, settings),
            NodeKind::Constructor => {
                if let Some(name) = self.name(source).map(str::to_owned) {
                    if let NodeData::Constructor(current) = &mut self.node_mut(target)?.data {
                        *current = name;
                    }
                }
                self.merge_sequences(target, source, settings)
            }
            _ => self.merge_sequences(target, source, settings),
        }
    }

    /// Recurse when both sides are the same container kind.
    fn merge_or_replace(
        &mut self,
        existing: NodeId,
        incoming: NodeId,
        settings: &MergeSettings,
    ) -> TreeResult<()> {
        let existing_kind = self.kind(existing)?;
        if existing_kind.is_container() && existing_kind == self.kind(incoming)? {
            return self.merge_nodes(existing, incoming, settings);
        }
        if !is_null(self, incoming) || settings.null_handling == MergeNullValueHandling::Merge {
            self.replace(existing, incoming)?;
        }
        Ok(())
    }

    fn merge_objects(
        &mut self,
        target: NodeId,
        source: NodeId,
        settings: &MergeSettings,
    ) -> TreeResult<()> {
        let incoming: Vec<(String, NodeId)> = self
            .properties(source)
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value))
            .collect();
        let comparison = settings.property_name_comparison;
        for (name, value) in incoming {
            let existing = if self.comparison(target) == Some(comparison) {
                self.property(target, &name)
            } else {
                self.children(target)
                    .iter()
                    .copied()
                    .find(|&p| self.name(p).is_some_and(|n| comparison.eq(n, &name)))
            };
            match existing.and_then(|p| self.property_value(p)) {
                Some(current) => self.merge_or_replace(current, value, settings)?,
                None => {
                    let property = self.new_property(name, value)?;
                    let len = self.len(target);
                    self.insert_with(target, len, property, Some(DuplicatePropertyHandling::Replace))?;
                }
            }
        }
        Ok(())
    }

    fn merge_sequences(
        &mut self,
        target: NodeId,
        source: NodeId,
        settings: &MergeSettings,
    ) -> TreeResult<()> {
        let incoming = self.children(source).to_vec();
        match settings.array_handling {
            MergeArrayHandling::Concat => {
                for item in incoming {
                    self.add(target, item)?;
                }
            }
            MergeArrayHandling::Union => {
                for item in incoming {
                    let present = self
                        .children(target)
                        .iter()
                        .any(|&existing| self.deep_equals(existing, item));
                    if !present {
                        self.add(target, item)?;
                    }
                }
            }
            MergeArrayHandling::Replace => {
                self.clear(target)?;
                for item in incoming {
                    self.add(target, item)?;
                }
            }
            MergeArrayHandling::Merge => {
                for (index, item) in incoming.into_iter().enumerate() {
                    match self.children(target).get(index).copied() {
                        Some(existing) => self.merge_or_replace(existing, item, settings)?,
                        None => {
                            self.add(target, item)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
