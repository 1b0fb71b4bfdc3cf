//! Interfaces to the collaborators that own labels, images and projects.
//!
//! The annotation core only holds weak references (ids) into these registries.

/// A label as seen by the annotation core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub id: String,
    pub name: String,
}

impl Label {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Natural pixel size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Owner of labels and the current label selection.
pub trait LabelRegistry {
    /// Label currently chosen for new annotations.
    fn current_label(&self) -> Option<Label>;

    /// Check whether a label id still exists.
    fn label_exists(&self, label_id: &str) -> bool;
}

/// Owner of images and their annotation status columns.
pub trait ImageRegistry {
    /// Dimensions of an image, if it is known.
    fn image_dimensions(&self, image_id: &str) -> Option<ImageDimensions>;

    /// Store the derived annotation status for an image.
    fn set_annotation_status(&self, image_id: &str, is_annotated: bool, count: usize);
}

/// Owner of projects; only used to scope queries.
pub trait ProjectRegistry {
    fn project_exists(&self, project_id: &str) -> bool;
}

/// In-memory registries for tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    /// Records every status write so tests can inspect the latest one.
    #[derive(Debug, Default)]
    pub(crate) struct FakeRegistry {
        pub current: RefCell<Option<Label>>,
        pub labels: RefCell<Vec<String>>,
        pub images: RefCell<HashMap<String, ImageDimensions>>,
        pub status: RefCell<HashMap<String, (bool, usize)>>,
        pub projects: RefCell<Vec<String>>,
    }

    impl FakeRegistry {
        pub(crate) fn with_label(label: Label) -> Self {
            let registry = Self::default();
            registry.labels.borrow_mut().push(label.id.clone());
            *registry.current.borrow_mut() = Some(label);
            registry.projects.borrow_mut().push("project-1".to_string());
            registry.images.borrow_mut().insert(
                "image-1".to_string(),
                ImageDimensions {
                    width: 640,
                    height: 480,
                },
            );
            registry
        }

        pub(crate) fn status_of(&self, image_id: &str) -> Option<(bool, usize)> {
            self.status.borrow().get(image_id).copied()
        }
    }

    impl LabelRegistry for FakeRegistry {
        fn current_label(&self) -> Option<Label> {
            self.current.borrow().clone()
        }

        fn label_exists(&self, label_id: &str) -> bool {
            self.labels.borrow().iter().any(|l| l == label_id)
        }
    }

    impl ImageRegistry for FakeRegistry {
        fn image_dimensions(&self, image_id: &str) -> Option<ImageDimensions> {
            self.images.borrow().get(image_id).copied()
        }

        fn set_annotation_status(&self, image_id: &str, is_annotated: bool, count: usize) {
            self.status
                .borrow_mut()
                .insert(image_id.to_string(), (is_annotated, count));
        }
    }

    impl ProjectRegistry for FakeRegistry {
        fn project_exists(&self, project_id: &str) -> bool {
            self.projects.borrow().iter().any(|p| p == project_id)
        }
    }
}
