use nanoid::nanoid;

/// Source of opaque, unique record identifiers.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NanoIds;

impl IdGenerator for NanoIds {
    fn new_id(&self) -> String {
        nanoid!()
    }
}
