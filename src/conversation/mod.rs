//! 会话层：(channel, author) -> 待确认动作，以及驱动确认流程的状态机

mod machine;
mod state;

pub use machine::{
    ConversationMachine, Transition, CANCELLED_TEXT, HELP_TEXT, HERE_WE_GO_TEXT, HINT_TEXT,
    NEXT_STEP_TEXT, NOTHING_PENDING_TEXT, WAITING_TEXT,
};
pub use state::{ConversationKey, ConversationStore, MemoryConversationStore, PendingAction, PendingSlot};
