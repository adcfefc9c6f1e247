//! The single slot holding the currently displayed floor model.
//!
//! Loading is split in two halves so that the decode can run off the render
//! thread:
//!
//! 1. [`ModelSlot::request`] disposes whatever is attached and hands out a
//!    [`LoadTicket`] carrying a new generation.
//! 2. When the decode finishes, [`ModelSlot::resolve`] (or
//!    [`ModelSlot::resolve_with`] when the GPU upload still has to happen)
//!    attaches the result only if the ticket is still the latest one. Results
//!    of superseded tickets are disposed or dropped.
//!
//! The old and the new model are therefore never resident together, and the
//! newest request wins no matter in which order decodes complete.

/// Something that can be attached to the slot.
pub trait SceneAsset {
    /// Mark every mesh as shadow caster and receiver.
    fn enable_shadows(&mut self);

    /// Release all GPU resources. Called exactly once per asset.
    fn dispose(&mut self);
}

/// Identifies one `load_model` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    path: String,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The result was current and is now displayed.
    Attached,
    /// A newer request was issued meanwhile; the result was discarded.
    Stale,
    /// The current request failed; the slot stays empty.
    Failed,
}

#[derive(Debug)]
pub struct ModelSlot<M> {
    current: Option<(String, M)>,
    generation: u64,
    pending: Option<u64>,
}

impl<M> Default for ModelSlot<M> {
    fn default() -> Self {
        Self {
            current: None,
            generation: 0,
            pending: None,
        }
    }
}

impl<M: SceneAsset> ModelSlot<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detach and dispose the current model, then issue a ticket for `path`.
    pub fn request(&mut self, path: &str) -> LoadTicket {
        if let Some((old_path, mut model)) = self.current.take() {
            log::debug!("Disposing {old_path}");
            model.dispose();
        }
        self.generation += 1;
        self.pending = Some(self.generation);
        log::info!("Loading {path} (request {})", self.generation);
        LoadTicket {
            generation: self.generation,
            path: path.to_string(),
        }
    }

    /// Whether `ticket` belongs to the latest request and is still unresolved.
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.pending == Some(ticket.generation)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn current(&self) -> Option<&M> {
        self.current.as_ref().map(|(_, model)| model)
    }

    pub fn current_mut(&mut self) -> Option<&mut M> {
        self.current.as_mut().map(|(_, model)| model)
    }

    pub fn current_path(&self) -> Option<&str> {
        self.current.as_ref().map(|(path, _)| path.as_str())
    }

    /// Settle `ticket` with an already built model.
    pub fn resolve(&mut self, ticket: LoadTicket, result: anyhow::Result<M>) -> Resolution {
        if !self.is_current(&ticket) {
            log::debug!(
                "Discarding stale result for {} (request {}, latest {})",
                ticket.path,
                ticket.generation,
                self.generation
            );
            if let Ok(mut model) = result {
                model.dispose();
            }
            return Resolution::Stale;
        }
        self.attach(ticket, result)
    }

    /// Settle `ticket` with decoded data, running `build` (the GPU upload)
    /// only if the ticket is current. Stale data is dropped without upload.
    pub fn resolve_with<D, F>(
        &mut self,
        ticket: LoadTicket,
        result: anyhow::Result<D>,
        build: F,
    ) -> Resolution
    where
        F: FnOnce(D) -> anyhow::Result<M>,
    {
        if !self.is_current(&ticket) {
            log::debug!(
                "Dropping stale decode of {} (request {}, latest {})",
                ticket.path,
                ticket.generation,
                self.generation
            );
            return Resolution::Stale;
        }
        let result = result.and_then(build);
        self.attach(ticket, result)
    }

    fn attach(&mut self, ticket: LoadTicket, result: anyhow::Result<M>) -> Resolution {
        self.pending = None;
        match result {
            Ok(mut model) => {
                model.enable_shadows();
                if let Some((old_path, mut old)) = self.current.replace((ticket.path.clone(), model)) {
                    old.dispose();
                    log::warn!("{old_path} was still attached when {} resolved", ticket.path);
                }
                log::info!("Attached {}", ticket.path);
                Resolution::Attached
            }
            Err(e) => {
                log::error!("Failed to load {}: {e:#}", ticket.path);
                Resolution::Failed
            }
        }
    }
}
