use std::{fmt, sync::Arc};

use parking_lot::RwLock;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ModalKind {
    #[default]
    OneButton,
    TwoButton,
    Snackbar,
}

pub type ConfirmAction = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Default)]
pub struct Modal {
    pub kind: ModalKind,
    pub title: Option<String>,
    pub description: String,
    pub button_text: Option<String>,
    pub on_confirm: Option<ConfirmAction>,
}

impl Modal {
    pub fn snackbar(description: impl Into<String>) -> Modal {
        Modal {
            kind: ModalKind::Snackbar,
            description: description.into(),
            ..Modal::default()
        }
    }

    pub fn alert(title: impl Into<String>, description: impl Into<String>) -> Modal {
        Modal {
            kind: ModalKind::OneButton,
            title: Some(title.into()),
            description: description.into(),
            ..Modal::default()
        }
    }

    pub fn confirm(
        title: impl Into<String>,
        description: impl Into<String>,
        on_confirm: impl Fn() + Send + Sync + 'static,
    ) -> Modal {
        Modal {
            kind: ModalKind::TwoButton,
            title: Some(title.into()),
            description: description.into(),
            button_text: None,
            on_confirm: Some(Arc::new(on_confirm)),
        }
    }
}

impl fmt::Debug for Modal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Modal")
            .field("kind", &self.kind)
            .field("title", &self.title)
            .field("description", &self.description)
            .field("button_text", &self.button_text)
            .field("on_confirm", &self.on_confirm.is_some())
            .finish()
    }
}

/// At most one visible modal or snackbar; showing a new one replaces it
#[derive(Clone, Debug, Default)]
pub struct ModalStore(Arc<RwLock<Option<Modal>>>);

impl ModalStore {
    pub fn new() -> ModalStore {
        ModalStore::default()
    }

    pub fn show(&self, modal: Modal) {
        tracing::debug!(kind = ?modal.kind, description = %modal.description, "showing modal");
        *self.0.write() = Some(modal);
    }

    pub fn snackbar(&self, description: impl Into<String>) {
        self.show(Modal::snackbar(description))
    }

    pub fn hide(&self) {
        *self.0.write() = None;
    }

    pub fn is_visible(&self) -> bool {
        self.0.read().is_some()
    }

    pub fn current(&self) -> Option<Modal> {
        self.0.read().clone()
    }

    /// Hides the modal and returns it, for front ends that render once
    pub fn take(&self) -> Option<Modal> {
        self.0.write().take()
    }

    /// Runs the confirm action, if any, then hides
    pub fn confirm(&self) {
        let action = self.0.write().take().and_then(|m| m.on_confirm);
        if let Some(action) = action {
            action();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn replace_and_hide() {
        let store = ModalStore::new();
        assert!(!store.is_visible());
        store.snackbar("게시글이 등록되었습니다.");
        store.show(Modal::alert("알림", "두 번째"));
        let m = store.current().unwrap();
        assert_eq!(m.kind, ModalKind::OneButton);
        assert_eq!(m.description, "두 번째");
        store.hide();
        assert!(store.current().is_none());
    }

    #[test]
    fn confirm_runs_action_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let store = ModalStore::new();
        let h = hits.clone();
        store.show(Modal::confirm("삭제", "삭제하시겠습니까?", move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        store.confirm();
        store.confirm();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!store.is_visible());
    }
}
