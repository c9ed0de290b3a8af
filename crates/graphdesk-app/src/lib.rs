pub mod actions;
pub mod debounce;
pub mod detail_panel;
pub mod error;
pub mod session;
pub mod settings;
pub mod undo_redo;

pub use actions::{
    ACTION_ADD, ACTION_HIDE, ACTION_MOVE, ACTION_REMOVE, ACTION_SELECT, ACTION_SHOW,
    ACTION_THICKEN_BORDER, ACTION_THIN_BORDER, Canvas, GraphArgs, register_builtin_actions,
};
pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use detail_panel::{DetailPanel, LinkIntent, PanelLink, PanelView};
pub use error::ActionError;
pub use session::GraphSession;
pub use settings::Settings;
pub use undo_redo::{ActionContext, ActionFn, ActionRecord, UndoRedo, UndoRedoOptions};
