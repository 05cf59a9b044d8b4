//! Async driver connecting an [`Editor`] to an [`AnnotationBackend`].
//!
//! The editor never performs I/O. The session owns the backend and the list
//! of images in the project, runs loads and saves, and turns navigation keys
//! into "save the current image, then open the next one".

use web_time::Instant;

use crate::config::AppConfig;
use crate::editor::{Editor, KeyResponse, Navigation};
use crate::keybindings::KeyEvent;
use crate::model::ProjectConfig;
use crate::persistence::{AnnotationBackend, BackendResult, HttpBackend, SaveJob, SaveStatus};

pub struct EditorSession<B: AnnotationBackend> {
    editor: Editor,
    backend: B,
    images: Vec<String>,
    index: Option<usize>,
}

impl EditorSession<HttpBackend> {
    /// Build a session against the HTTP backend named in the configuration.
    pub fn from_config(config: &AppConfig, images: Vec<String>) -> BackendResult<Self> {
        let editor = Editor::new(config.editor.clone()).with_keybindings(config.keybindings.clone());
        Ok(Self::new(editor, config.http_backend()?, images))
    }
}

impl<B: AnnotationBackend> EditorSession<B> {
    pub fn new(editor: Editor, backend: B, images: Vec<String>) -> Self {
        log::debug!("Session created with {} images", images.len());
        Self {
            editor,
            backend,
            images,
            index: None,
        }
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// Mutable access for input handling and inline edits.
    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    /// Index of the open image.
    pub fn current_index(&self) -> Option<usize> {
        self.index
    }

    pub fn current_image(&self) -> Option<&str> {
        self.index.and_then(|i| self.images.get(i)).map(String::as_str)
    }

    // ========================================================================
    // Project configuration
    // ========================================================================

    /// Fetch the class mapping. On failure the editor keeps its current one.
    pub async fn load_project_config(&mut self) -> BackendResult<()> {
        match self.backend.load_config().await {
            Ok(config) => {
                log::info!("Loaded project config with {} classes", config.classes().len());
                self.editor.set_project_config(config);
                Ok(())
            }
            Err(e) => {
                log::warn!("Failed to load project config: {}", e);
                Err(e)
            }
        }
    }

    /// Store a new class mapping and use it for future boxes.
    pub async fn save_project_config(&mut self, config: ProjectConfig) -> BackendResult<()> {
        self.backend.save_config(&config).await?;
        log::info!("Saved project config with {} classes", config.classes().len());
        self.editor.set_project_config(config);
        Ok(())
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Open the image at `index` and load its annotations.
    ///
    /// Returns `false` if the index is out of range or the load result
    /// arrived for an image that is no longer current.
    pub async fn open(&mut self, index: usize) -> bool {
        let Some(image) = self.images.get(index).cloned() else {
            log::warn!("No image at index {} ({} images)", index, self.images.len());
            return false;
        };
        self.index = Some(index);
        let ticket = self.editor.open_image(image.as_str());
        let result = self.backend.load_annotations(&image).await;
        self.editor.finish_load(&ticket, result)
    }

    /// Save the current image, then open its neighbor. Does nothing at the
    /// ends of the list.
    pub async fn navigate(&mut self, direction: Navigation) -> bool {
        let Some(current) = self.index else {
            return false;
        };
        let target = match direction {
            Navigation::Next => current.checked_add(1).filter(|i| *i < self.images.len()),
            Navigation::Previous => current.checked_sub(1),
        };
        let Some(target) = target else {
            log::debug!("No image {:?} of index {}", direction, current);
            return false;
        };
        self.flush_now().await;
        self.open(target).await
    }

    pub async fn next_image(&mut self) -> bool {
        self.navigate(Navigation::Next).await
    }

    pub async fn previous_image(&mut self) -> bool {
        self.navigate(Navigation::Previous).await
    }

    /// Feed a key press to the editor and perform any navigation it asks for.
    pub async fn handle_key(&mut self, event: KeyEvent) -> KeyResponse {
        let response = self.editor.handle_key(event);
        if let Some(direction) = response.navigate {
            self.navigate(direction).await;
        }
        response
    }

    // ========================================================================
    // Saving
    // ========================================================================

    /// Run the auto-save if it is due at `now`.
    pub async fn flush_due(&mut self, now: Instant) -> Option<SaveStatus> {
        let job = self.editor.poll_save(now)?;
        Some(self.run_save(job).await)
    }

    /// Save unsaved changes of the current image right away, ignoring the
    /// debounce. Returns `None` when there is nothing to save.
    pub async fn flush_now(&mut self) -> Option<SaveStatus> {
        let job = self.editor.flush_save(Instant::now())?;
        Some(self.run_save(job).await)
    }

    /// Sleep until the pending auto-save is due, then run it. Returns `None`
    /// right away when nothing is pending.
    pub async fn wait_and_flush(&mut self) -> Option<SaveStatus> {
        let now = Instant::now();
        let delay = self.editor.time_until_save(now)?;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.flush_due((now + delay).max(Instant::now())).await
    }

    /// Flush and deactivate the editor.
    pub async fn close(&mut self) {
        self.flush_now().await;
        self.editor.teardown();
        log::debug!("Session closed");
    }

    async fn run_save(&mut self, job: SaveJob) -> SaveStatus {
        let result = self
            .backend
            .save_annotations(&job.image, &job.annotations)
            .await;
        self.editor.finish_save(job.ticket, result);
        self.editor.save_status()
    }
}
