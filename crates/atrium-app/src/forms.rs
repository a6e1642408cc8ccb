// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormControl {
    name: &'static str,
    label: &'static str,
    value: String,
    required: bool,
    hidden: bool,
    touched: bool,
}

impl FormControl {
    fn new(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            value: String::new(),
            required: false,
            hidden: false,
            touched: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Bookkeeping fields carried through the form but never edited.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    /// Only the empty string is missing; whitespace is a value.
    pub fn is_valid(&self) -> bool {
        !self.required || !self.value.is_empty()
    }

    /// Inline message, shown only once the control has been touched.
    pub fn error(&self) -> Option<String> {
        if self.touched && !self.is_valid() {
            Some(format!("{} is required.", self.label))
        } else {
            None
        }
    }
}

/// Ordered set of named controls bound to one entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormGroup {
    controls: Vec<FormControl>,
}

impl FormGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &'static str, label: &'static str) -> Self {
        let mut control = FormControl::new(name, label);
        control.required = true;
        self.controls.push(control);
        self
    }

    pub fn optional(mut self, name: &'static str, label: &'static str) -> Self {
        self.controls.push(FormControl::new(name, label));
        self
    }

    pub fn hidden(mut self, name: &'static str) -> Self {
        let mut control = FormControl::new(name, name);
        control.hidden = true;
        self.controls.push(control);
        self
    }

    pub fn controls(&self) -> &[FormControl] {
        &self.controls
    }

    pub fn control(&self, name: &str) -> Option<&FormControl> {
        self.controls.iter().find(|control| control.name == name)
    }

    pub fn editable_controls(&self) -> impl Iterator<Item = &FormControl> {
        self.controls.iter().filter(|control| !control.hidden)
    }

    pub fn value(&self, name: &str) -> &str {
        self.control(name).map(FormControl::value).unwrap_or("")
    }

    pub fn set_value(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.controls.iter_mut().find(|control| control.name == name) {
            Some(control) => {
                control.value = value.into();
                true
            }
            None => false,
        }
    }

    /// Copies known fields in; names without a matching control are ignored.
    pub fn patch<I, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = (&'static str, V)>,
        V: Into<String>,
    {
        for (name, value) in values {
            self.set_value(name, value);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.controls.iter().all(FormControl::is_valid)
    }

    pub fn mark_all_as_touched(&mut self) {
        for control in &mut self.controls {
            control.touched = true;
        }
    }

    pub fn errors(&self) -> Vec<String> {
        self.controls.iter().filter_map(FormControl::error).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("form group {0:?} is already attached")]
    DuplicateKey(String),
}

/// Parent form hosting entity groups under caller-supplied keys so several
/// entity forms can share one dialog without colliding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogForm {
    groups: Vec<(String, FormGroup)>,
}

impl DialogForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// A form holding a single group, so no key can collide.
    pub fn with_group(key: &str, group: FormGroup) -> Self {
        Self {
            groups: vec![(key.to_owned(), group)],
        }
    }

    pub fn attach(&mut self, key: &str, group: FormGroup) -> Result<(), FormError> {
        if self.group(key).is_some() {
            return Err(FormError::DuplicateKey(key.to_owned()));
        }
        self.groups.push((key.to_owned(), group));
        Ok(())
    }

    pub fn detach(&mut self, key: &str) -> Option<FormGroup> {
        let index = self.groups.iter().position(|(name, _)| name == key)?;
        Some(self.groups.remove(index).1)
    }

    pub fn group(&self, key: &str) -> Option<&FormGroup> {
        self.groups
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, group)| group)
    }

    pub fn group_mut(&mut self, key: &str) -> Option<&mut FormGroup> {
        self.groups
            .iter_mut()
            .find(|(name, _)| name == key)
            .map(|(_, group)| group)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_valid(&self) -> bool {
        self.groups.iter().all(|(_, group)| group.is_valid())
    }

    pub fn mark_all_as_touched(&mut self) {
        for (_, group) in &mut self.groups {
            group.mark_all_as_touched();
        }
    }

    pub fn raw_value(&self, key: &str) -> Option<&FormGroup> {
        self.group(key)
    }
}
