// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::VecDeque;
use tracing::{info, warn};

pub trait Notifier {
    fn success(&mut self, text: &str);
    fn error(&mut self, text: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub text: String,
}

const MAX_TOASTS: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToastQueue {
    toasts: VecDeque<Toast>,
}

impl ToastQueue {
    pub fn latest(&self) -> Option<&Toast> {
        self.toasts.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    pub fn dismiss(&mut self) -> Option<Toast> {
        self.toasts.pop_front()
    }

    fn push(&mut self, level: ToastLevel, text: &str) {
        if self.toasts.len() == MAX_TOASTS {
            self.toasts.pop_front();
        }
        self.toasts.push_back(Toast {
            level,
            text: text.to_owned(),
        });
    }
}

impl Notifier for ToastQueue {
    fn success(&mut self, text: &str) {
        info!(toast = text, "success");
        self.push(ToastLevel::Success, text);
    }

    fn error(&mut self, text: &str) {
        warn!(toast = text, "error");
        self.push(ToastLevel::Error, text);
    }
}

#[cfg(test)]
mod tests {
    use super::{Notifier, ToastLevel, ToastQueue};

    #[test]
    fn queue_keeps_latest_toasts() {
        let mut queue = ToastQueue::default();
        for index in 0..10 {
            queue.success(&format!("toast {index}"));
        }
        queue.error("boom");

        assert_eq!(queue.len(), 8);
        let latest = queue.latest().expect("latest toast");
        assert_eq!(latest.level, ToastLevel::Error);
        assert_eq!(latest.text, "boom");
        assert_eq!(
            queue.dismiss().map(|toast| toast.text),
            Some("toast 3".to_owned())
        );
    }
}
