//! Input widgets drawn along the bottom of the chat view.
mod context_window_input;
mod popup_consts;
mod scroll_state;
mod selection_popup_common;
mod suggestion_list;
mod template_args;
mod textarea;
mod value_editor;
mod variable_modal;

pub(crate) use context_window_input::ContextWindowInput;
pub(crate) use context_window_input::InputState;
pub(crate) use textarea::TextArea;
pub(crate) use textarea::TextAreaState;
