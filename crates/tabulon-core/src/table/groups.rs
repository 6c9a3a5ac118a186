//! Group membership and group queries.

use std::collections::HashSet;

use tracing::debug;

use tabulon_engine::{Access, ElementRef, ElementType, EventType, Tag, next_element_ident};

use crate::error::{Result, TableError};
use crate::group::Group;

use super::{Table, group_key};

impl Table {
    /// Create an empty group; returns its ident.
    pub fn add_group(&mut self) -> Result<u64> {
        self.vet()?;
        let ident = next_element_ident();
        self.fire_vetoable(EventType::OnBeforeCreate, ElementRef::Group(ident))?;
        self.groups.push(Group::new(ident));
        debug!(table = self.ident, group = ident, "group added");
        self.fire_notification(EventType::OnCreate, ElementRef::Group(ident), None);
        Ok(ident)
    }

    fn group_pos(&self, ident: u64) -> Option<usize> {
        self.groups.iter().position(|g| g.ident() == ident)
    }

    pub fn group(&self, ident: u64) -> Result<&Group> {
        self.group_pos(ident)
            .map(|p| &self.groups[p])
            .ok_or(TableError::DeletedElement(ElementType::Group))
    }

    pub fn group_mut(&mut self, ident: u64) -> Result<&mut Group> {
        let pos = self
            .group_pos(ident)
            .ok_or(TableError::DeletedElement(ElementType::Group))?;
        Ok(&mut self.groups[pos])
    }

    pub fn group_idents(&self) -> Vec<u64> {
        self.groups.iter().map(|g| g.ident()).collect()
    }

    /// Resolve a group by a lookup access mode.
    pub fn get_group(&self, access: &Access) -> Result<Option<u64>> {
        self.vet()?;
        let found = match access {
            Access::ByLabel(label) => {
                if self.is_group_labels_indexed() {
                    let key = label.trim().to_lowercase();
                    self.group_label_index.get(&key).copied()
                } else {
                    self.find_group(|g| g.label() == Some(label.as_str()))
                }
            }
            Access::ByDescription(d) => self.find_group(|g| g.description() == Some(d.as_str())),
            Access::ByIdent(id) => self.group_pos(*id).map(|p| self.groups[p].ident()),
            Access::ByUuid(u) => self.find_group(|g| g.uuid() == *u),
            Access::ByTags(tags) => {
                let query = Tag::as_tags(tags.iter().map(String::as_str));
                if query.is_empty() {
                    return Err(TableError::InvalidAccess {
                        child: ElementType::Group,
                        access: access.name(),
                        kind: "get",
                    });
                }
                self.find_group(|g| query.is_subset(g.tag_set()))
            }
            Access::ByProperty(key, value) => {
                self.find_group(|g| g.props().get(*key) == Some(value))
            }
            Access::ByUserProperty(key, value) => {
                self.find_group(|g| g.props().get_text(key) == Some(value))
            }
            _ => {
                return Err(TableError::InvalidAccess {
                    child: ElementType::Group,
                    access: access.name(),
                    kind: "get",
                });
            }
        };
        Ok(found)
    }

    fn find_group(&self, mut pred: impl FnMut(&Group) -> bool) -> Option<u64> {
        self.groups.iter().find(|g| pred(g)).map(|g| g.ident())
    }

    /// Delete a group. Members are left untouched; other groups lose it
    /// from their subgroup sets.
    pub fn delete_group(&mut self, ident: u64) -> Result<()> {
        self.vet()?;
        let pos = self
            .group_pos(ident)
            .ok_or(TableError::DeletedElement(ElementType::Group))?;
        self.fire_vetoable(EventType::OnBeforeDelete, ElementRef::Group(ident))?;

        let group = self.groups.remove(pos);
        for other in &mut self.groups {
            other.remove_group(ident);
        }
        if let Some(label) = group.label() {
            self.group_label_index.remove(&label.to_lowercase());
        }
        self.forget_element(ElementRef::Group(ident));
        debug!(table = self.ident, group = ident, "group deleted");
        self.fire_notification(EventType::OnDelete, ElementRef::Group(ident), None);
        Ok(())
    }

    /// Add an element of this table to a group. Returns whether membership
    /// actually changed. Elements of other tables are rejected; so is any
    /// addition that would make a group contain itself.
    pub fn group_add(&mut self, gid: u64, elem: ElementRef) -> Result<bool> {
        self.vet()?;
        self.group(gid)?;
        self.vet_element_ref(elem)?;

        let added = match elem {
            ElementRef::Row(id) => self.group_mut(gid)?.add_row(id),
            ElementRef::Column(id) => self.group_mut(gid)?.add_column(id),
            ElementRef::Cell { column, offset } => {
                self.group_mut(gid)?.add_cell((column, offset))
            }
            ElementRef::Group(child) => {
                if child == gid || self.group_contains_transitively(child, gid) {
                    return Err(TableError::invalid(
                        ElementType::Group,
                        "a group cannot contain itself",
                    ));
                }
                self.group_mut(gid)?.add_group(child)
            }
            ElementRef::Table(_) => {
                return Err(TableError::unsupported(
                    ElementType::Group,
                    "a table cannot be a group member",
                ));
            }
        };
        Ok(added)
    }

    /// Add several elements at once; returns whether any was new.
    pub fn group_update(&mut self, gid: u64, elems: &[ElementRef]) -> Result<bool> {
        let mut any = false;
        for elem in elems {
            any |= self.group_add(gid, *elem)?;
        }
        Ok(any)
    }

    pub fn group_remove(&mut self, gid: u64, elem: ElementRef) -> Result<bool> {
        self.vet()?;
        let group = self.group_mut(gid)?;
        let removed = match elem {
            ElementRef::Row(id) => group.remove_row(id),
            ElementRef::Column(id) => group.remove_column(id),
            ElementRef::Cell { column, offset } => group.remove_cell((column, offset)),
            ElementRef::Group(id) => group.remove_group(id),
            ElementRef::Table(_) => false,
        };
        Ok(removed)
    }

    /// Whether group `gid` contains `needle` anywhere in its subgroup tree.
    fn group_contains_transitively(&self, gid: u64, needle: u64) -> bool {
        let mut stack = vec![gid];
        let mut visited = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == needle {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(pos) = self.group_pos(current) {
                stack.extend(self.groups[pos].group_members());
            }
        }
        false
    }

    /// Rows the group covers: its explicit rows, or every table row when
    /// the group only selects columns.
    pub fn group_effective_rows(&self, gid: u64) -> Result<Vec<u64>> {
        let group = self.group(gid)?;
        if group.num_rows() > 0 {
            Ok(self
                .rows
                .iter()
                .flatten()
                .filter(|r| group.contains_row(r.ident()))
                .map(|r| r.ident())
                .collect())
        } else if group.num_columns() > 0 {
            Ok(self.rows.iter().flatten().map(|r| r.ident()).collect())
        } else {
            Ok(Vec::new())
        }
    }

    /// Columns the group covers; symmetric to
    /// [`Table::group_effective_rows`].
    pub fn group_effective_columns(&self, gid: u64) -> Result<Vec<u64>> {
        let group = self.group(gid)?;
        if group.num_columns() > 0 {
            Ok(self
                .cols
                .iter()
                .flatten()
                .filter(|c| group.contains_column(c.ident()))
                .map(|c| c.ident())
                .collect())
        } else if group.num_rows() > 0 {
            Ok(self.cols.iter().flatten().map(|c| c.ident()).collect())
        } else {
            Ok(Vec::new())
        }
    }

    fn group_num_effective_rows(&self, group: &Group) -> usize {
        if group.num_rows() > 0 {
            group.num_rows()
        } else if group.num_columns() > 0 {
            self.num_rows()
        } else {
            0
        }
    }

    fn group_num_effective_columns(&self, group: &Group) -> usize {
        if group.num_columns() > 0 {
            group.num_columns()
        } else if group.num_rows() > 0 {
            self.num_columns()
        } else {
            0
        }
    }

    /// Number of cells the group covers: effective rows x effective
    /// columns, plus subgroup cells, plus explicit cell members. Cached on
    /// the group until membership or table shape changes.
    pub fn group_num_cells(&mut self, gid: u64) -> Result<usize> {
        self.group(gid)?;
        let mut visited = HashSet::new();
        let n = self.compute_group_num_cells(gid, &mut visited);
        self.group_mut(gid)?.cache_num_cells(n);
        Ok(n)
    }

    fn compute_group_num_cells(&self, gid: u64, visited: &mut HashSet<u64>) -> usize {
        if !visited.insert(gid) {
            return 0;
        }
        let Some(pos) = self.group_pos(gid) else {
            return 0;
        };
        let group = &self.groups[pos];
        if let Some(cached) = group.cached_num_cells() {
            return cached;
        }
        let mut n = self.group_num_effective_rows(group) * self.group_num_effective_columns(group)
            + group.num_explicit_cells();
        for sub in group.group_members() {
            n += self.compute_group_num_cells(sub, visited);
        }
        n
    }

    /// Groups an element belongs to directly.
    pub fn groups_containing(&self, elem: ElementRef) -> Vec<u64> {
        self.groups
            .iter()
            .filter(|g| match elem {
                ElementRef::Row(id) => g.contains_row(id),
                ElementRef::Column(id) => g.contains_column(id),
                ElementRef::Cell { column, offset } => g.contains_cell((column, offset)),
                ElementRef::Group(id) => g.contains_group(id),
                ElementRef::Table(_) => false,
            })
            .map(|g| g.ident())
            .collect()
    }

    /// Derived members of the group: derived effective rows and columns,
    /// derived members of subgroups, and derived explicit cells.
    pub fn group_derived_elements(&self, gid: u64) -> Result<Vec<ElementRef>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut visited_groups = HashSet::new();
        self.collect_group_derived(gid, &mut out, &mut seen, &mut visited_groups)?;
        Ok(out)
    }

    fn collect_group_derived(
        &self,
        gid: u64,
        out: &mut Vec<ElementRef>,
        seen: &mut HashSet<ElementRef>,
        visited_groups: &mut HashSet<u64>,
    ) -> Result<()> {
        if !visited_groups.insert(gid) {
            return Ok(());
        }
        for row in self.group_effective_rows(gid)? {
            if self.row(row)?.is_derived() && seen.insert(ElementRef::Row(row)) {
                out.push(ElementRef::Row(row));
            }
        }
        for col in self.group_effective_columns(gid)? {
            if self.column(col)?.is_derived() && seen.insert(ElementRef::Column(col)) {
                out.push(ElementRef::Column(col));
            }
        }
        let subgroups: Vec<u64> = self.group(gid)?.group_members().collect();
        for sub in subgroups {
            self.collect_group_derived(sub, out, seen, visited_groups)?;
        }
        let cells: Vec<(u64, usize)> = self.group(gid)?.cell_members().collect();
        for key in cells {
            let (column, offset) = key;
            let derived = self
                .column(column)?
                .cell_at(offset)
                .is_some_and(|c| c.is_derived());
            if derived && seen.insert(group_key(key)) {
                out.push(group_key(key));
            }
        }
        Ok(())
    }

    /// Set a group's label, keeping the group label index consistent when
    /// group label indexing is on.
    pub fn set_group_label(&mut self, gid: u64, label: Option<&str>) -> Result<()> {
        let old = self.group(gid)?.label().map(str::to_string);
        if self.is_group_labels_indexed()
            && let Some(label) = label
        {
            let key = label.trim().to_lowercase();
            if self
                .group_label_index
                .get(&key)
                .is_some_and(|existing| *existing != gid)
            {
                return Err(TableError::LabelNotUnique(
                    ElementType::Group,
                    label.to_string(),
                ));
            }
        }
        self.group_mut(gid)?.set_label(label)?;
        if self.is_group_labels_indexed() {
            if let Some(old) = old {
                self.group_label_index.remove(&old.to_lowercase());
            }
            if let Some(label) = label {
                self.group_label_index
                    .insert(label.trim().to_lowercase(), gid);
            }
        }
        Ok(())
    }

    /// Apply canonical tags to a row, column or group through the table's
    /// tag registry.
    pub fn tag_element<'a>(
        &mut self,
        elem: ElementRef,
        labels: impl IntoIterator<Item = &'a str>,
    ) -> Result<bool> {
        self.vet_element_ref(elem)?;
        let tags: Vec<Tag> = labels
            .into_iter()
            .filter_map(|l| self.registry.canonical(l))
            .collect();
        let target = match elem {
            ElementRef::Row(id) => self.row_mut(id)?.tag_set_mut(),
            ElementRef::Column(id) => self.column_mut(id)?.tag_set_mut(),
            ElementRef::Group(id) => self.group_mut(id)?.tag_set_mut(),
            _ => {
                return Err(TableError::unsupported(
                    elem.element_type(),
                    "element cannot be tagged",
                ));
            }
        };
        let mut added = false;
        for tag in tags {
            added |= target.insert(tag);
        }
        Ok(added)
    }

    /// Remove tags from a row, column or group.
    pub fn untag_element<'a>(
        &mut self,
        elem: ElementRef,
        labels: impl IntoIterator<Item = &'a str>,
    ) -> Result<bool> {
        self.vet_element_ref(elem)?;
        let query = Tag::as_tags(labels);
        let target = match elem {
            ElementRef::Row(id) => self.row_mut(id)?.tag_set_mut(),
            ElementRef::Column(id) => self.column_mut(id)?.tag_set_mut(),
            ElementRef::Group(id) => self.group_mut(id)?.tag_set_mut(),
            _ => {
                return Err(TableError::unsupported(
                    elem.element_type(),
                    "element cannot be tagged",
                ));
            }
        };
        let before = target.len();
        for tag in &query {
            target.remove(tag);
        }
        Ok(target.len() != before)
    }
}
