//! Derivation and affects bookkeeping.
//!
//! A derivation marks a row, column or cell as derived and declares the
//! elements it reads. The table records forward edges (target -> reads) and
//! reverse edges (source -> dependents), rejects cycles at registration,
//! and recalculation traverses the reverse edges breadth-first, firing
//! `OnRecalculate` for every affected derived element. Expressions are
//! never evaluated here; the bookkeeping is the whole contract.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use tabulon_engine::{Derivation, ElementRef, ElementType, EventType};

use crate::error::{Result, TableError};

use super::Table;

impl Table {
    /// Register a derivation for `target`, declaring the elements its
    /// calculation reads. Replaces (and returns) any previous derivation on
    /// the target. Fails when the target cannot be derived, when any
    /// element does not belong to this table, or when the declared reads
    /// would create a dependency cycle.
    pub fn set_derivation(
        &mut self,
        target: ElementRef,
        derivation: Derivation,
        reads: &[ElementRef],
    ) -> Result<Option<Derivation>> {
        self.vet()?;
        if !target.is_derivable() {
            return Err(TableError::unsupported(
                target.element_type(),
                "element cannot be derived",
            ));
        }
        self.vet_element_ref(target)?;
        for read in reads {
            self.vet_element_ref(*read)?;
        }
        if self.creates_cycle(target, reads) {
            return Err(TableError::CircularDependency);
        }

        // Re-registration drops the old edges first.
        let previous = self.remove_derivation_edges(target);

        self.derivation_reads.insert(target, reads.to_vec());
        for read in reads {
            self.affects.entry(*read).or_default().insert(target);
        }
        self.mark_derived(target, true)?;
        debug!(table = self.ident, %target, reads = reads.len(), "derivation registered");
        let old = self.derivations.insert(target, derivation);
        Ok(previous.or(old))
    }

    /// Remove the derivation on `target`, if any, together with its edges.
    pub fn clear_derivation(&mut self, target: ElementRef) -> Option<Derivation> {
        let removed = self.remove_derivation_edges(target);
        if removed.is_some() {
            let _ = self.mark_derived(target, false);
            debug!(table = self.ident, %target, "derivation cleared");
        }
        removed
    }

    pub fn derivation(&self, target: ElementRef) -> Option<&Derivation> {
        self.derivations.get(&target)
    }

    /// All derived elements, in stable order.
    pub fn derived_elements(&self) -> Vec<ElementRef> {
        let mut targets: Vec<ElementRef> = self.derivations.keys().copied().collect();
        targets.sort_by_key(|e| sort_key(*e));
        targets
    }

    /// Elements whose derivations read `elem`, directly or (for cells)
    /// through the cell's row or column. Never contains `elem` itself.
    pub fn affects(&self, elem: ElementRef) -> Vec<ElementRef> {
        let mut out: HashSet<ElementRef> = self
            .affects
            .get(&elem)
            .map(|deps| deps.iter().copied().collect())
            .unwrap_or_default();

        if let ElementRef::Cell { column, offset } = elem {
            if let Some(deps) = self.affects.get(&ElementRef::Column(column)) {
                out.extend(deps.iter().copied());
            }
            if let Some(row) = self.row_ident_by_offset(offset)
                && let Some(deps) = self.affects.get(&ElementRef::Row(row))
            {
                out.extend(deps.iter().copied());
            }
        }

        out.remove(&elem);
        let mut out: Vec<ElementRef> = out.into_iter().collect();
        out.sort_by_key(|e| sort_key(*e));
        out
    }

    /// Walk the affects graph breadth-first from `changed`, firing
    /// `OnRecalculate` for every affected derived element in dependency
    /// order. Cycle-safe by construction (registration rejects cycles) and
    /// by a visited set.
    pub fn recalculate_affected(&mut self, changed: ElementRef) {
        let mut visited: HashSet<ElementRef> = HashSet::new();
        let mut order: Vec<ElementRef> = Vec::new();
        let mut queue: VecDeque<ElementRef> = self.affects(changed).into();

        while let Some(elem) = queue.pop_front() {
            if !visited.insert(elem) {
                continue;
            }
            order.push(elem);
            for next in self.affects(elem) {
                if !visited.contains(&next) {
                    queue.push_back(next);
                }
            }
        }

        if !order.is_empty() {
            debug!(table = self.ident, %changed, affected = order.len(), "recalculating");
        }
        for elem in order {
            self.fire_notification(EventType::OnRecalculate, elem, None);
        }
    }

    /// Fire `OnRecalculate` for every derived element of the table.
    pub fn recalculate(&mut self) {
        for elem in self.derived_elements() {
            self.fire_notification(EventType::OnRecalculate, elem, None);
        }
    }

    /// Drop every trace of an element from the derivation bookkeeping:
    /// its own derivation, and its appearances as a read source.
    pub(crate) fn forget_element(&mut self, elem: ElementRef) {
        self.remove_derivation_edges(elem);
        if let Some(dependents) = self.affects.remove(&elem) {
            for dependent in dependents {
                if let Some(reads) = self.derivation_reads.get_mut(&dependent) {
                    reads.retain(|r| *r != elem);
                }
            }
        }
    }

    fn remove_derivation_edges(&mut self, target: ElementRef) -> Option<Derivation> {
        if let Some(reads) = self.derivation_reads.remove(&target) {
            for read in reads {
                if let Some(deps) = self.affects.get_mut(&read) {
                    deps.remove(&target);
                    if deps.is_empty() {
                        self.affects.remove(&read);
                    }
                }
            }
        }
        self.derivations.remove(&target)
    }

    fn creates_cycle(&self, target: ElementRef, reads: &[ElementRef]) -> bool {
        let mut stack: Vec<ElementRef> = reads.to_vec();
        let mut visited: HashSet<ElementRef> = HashSet::new();
        while let Some(elem) = stack.pop() {
            if elem == target {
                return true;
            }
            if !visited.insert(elem) {
                continue;
            }
            if let Some(next) = self.derivation_reads.get(&elem) {
                stack.extend(next.iter().copied());
            }
        }
        false
    }

    fn mark_derived(&mut self, target: ElementRef, on: bool) -> Result<()> {
        match target {
            ElementRef::Row(id) => self.row_mut(id)?.set_derived(on),
            ElementRef::Column(id) => self.column_mut(id)?.set_derived(on),
            ElementRef::Cell { column, offset } => {
                self.column_mut(column)?.materialize_cell(offset).set_derived(on);
            }
            _ => {
                return Err(TableError::unsupported(
                    target.element_type(),
                    "element cannot be derived",
                ));
            }
        }
        Ok(())
    }

    /// Check an element reference points into this table.
    pub(crate) fn vet_element_ref(&self, elem: ElementRef) -> Result<()> {
        let ok = match elem {
            ElementRef::Table(id) => id == self.ident(),
            ElementRef::Row(id) => self.row_pos(id).is_some(),
            ElementRef::Column(id) => self.col_pos(id).is_some(),
            ElementRef::Group(id) => self.groups.iter().any(|g| g.ident() == id),
            ElementRef::Cell { column, offset } => {
                self.col_pos(column).is_some() && self.row_ident_by_offset(offset).is_some()
            }
        };
        if ok {
            Ok(())
        } else {
            Err(TableError::InvalidParent {
                parent: ElementType::Table,
                child: elem.element_type(),
            })
        }
    }
}

fn sort_key(elem: ElementRef) -> (u8, u64, usize) {
    match elem {
        ElementRef::Table(id) => (0, id, 0),
        ElementRef::Row(id) => (1, id, 0),
        ElementRef::Column(id) => (2, id, 0),
        ElementRef::Cell { column, offset } => (3, column, offset),
        ElementRef::Group(id) => (4, id, 0),
    }
}
