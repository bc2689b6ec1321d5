use crate::config::{CategoryRegistry, SeatLayoutConfig};

/// Everything the codec and the score engine need to know about the
/// surrounding application.
///
/// It is passed explicitly to every call instead of being read from shared
/// state.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SessionContext {
    pub categories: CategoryRegistry,
    /// The current global layout. It provides the dimensions of an export that
    /// carries no seat snapshot.
    pub layout: SeatLayoutConfig,
    /// Today's date, ISO formatted. Used when an export carries no attendance.
    pub today: String,
    /// Above this number of characters, the text share code is replaced by the
    /// binary one.
    pub text_budget: usize,
}

impl SessionContext {
    pub const DEFAULT_TEXT_BUDGET: usize = 2800;

    pub fn new(today: &str) -> SessionContext {
        SessionContext {
            categories: CategoryRegistry::reference(),
            layout: SeatLayoutConfig::DEFAULT_LAYOUT,
            today: today.to_string(),
            text_budget: SessionContext::DEFAULT_TEXT_BUDGET,
        }
    }

    pub fn with_layout(self, layout: SeatLayoutConfig) -> SessionContext {
        SessionContext { layout, ..self }
    }

    pub fn with_text_budget(self, text_budget: usize) -> SessionContext {
        SessionContext {
            text_budget,
            ..self
        }
    }

    pub fn with_categories(self, categories: CategoryRegistry) -> SessionContext {
        SessionContext { categories, ..self }
    }
}
